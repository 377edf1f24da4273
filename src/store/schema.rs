//! Relational schema.
//!
//! Installed idempotently on open. `PRAGMA user_version` records the schema
//! version so an older binary refuses to touch a newer database.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::store::StoreResult;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    deleted_at    TEXT
);

CREATE TABLE IF NOT EXISTS daily_logs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(id),
    log_date     TEXT NOT NULL,
    energy_level TEXT NOT NULL CHECK (energy_level IN ('low', 'medium', 'high')),
    created_at   TEXT NOT NULL,
    UNIQUE (user_id, log_date)
);

CREATE TABLE IF NOT EXISTS anchor_tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    task_name   TEXT NOT NULL,
    description TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS anchor_tasks_user ON anchor_tasks(user_id, is_active);

CREATE TABLE IF NOT EXISTS daily_anchor_task_status (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    daily_log_id   INTEGER NOT NULL REFERENCES daily_logs(id),
    anchor_task_id INTEGER NOT NULL REFERENCES anchor_tasks(id),
    is_completed   INTEGER NOT NULL DEFAULT 0,
    UNIQUE (daily_log_id, anchor_task_id)
);

CREATE TABLE IF NOT EXISTS noodles_logs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    log_date         TEXT NOT NULL,
    activity_type    TEXT NOT NULL,
    duration_minutes INTEGER,
    notes            TEXT,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS noodles_logs_date ON noodles_logs(log_date);

CREATE TABLE IF NOT EXISTS playbook_items (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type             TEXT NOT NULL
        CHECK (item_type IN ('meal', 'comfort_media', 'comfort_activity', 'sensory_aid')),
    name                  TEXT NOT NULL,
    description           TEXT,
    energy_level_required INTEGER,
    UNIQUE (item_type, name)
);

CREATE TABLE IF NOT EXISTS future_goals (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    title              TEXT NOT NULL,
    description        TEXT,
    status             TEXT NOT NULL DEFAULT 'active',
    next_physical_step TEXT,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seed_runs (
    id         TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Create tables and stamp the schema version.
pub(crate) fn install(conn: &Connection) -> StoreResult<()> {
    let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    conn.execute_batch(SCHEMA_V1)?;
    if found < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::debug!(from = found, to = SCHEMA_VERSION, "schema installed");
    }
    Ok(())
}
