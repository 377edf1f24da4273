//! SQLite-backed relational store.
//!
//! One [`Store`] owns a single connection behind a mutex. Queries are short,
//! so handlers call straight into it. Every multi-statement write runs inside
//! one transaction.
//!
//! Operations are grouped by table family:
//!
//! - [`users`]: accounts
//! - [`daily`]: daily logs and the per-day anchor task checklist
//! - [`anchors`]: the anchor task master list
//! - [`reference`]: playbook items, future goals, dog-care logs

pub mod anchors;
pub mod daily;
pub mod reference;
pub mod schema;
pub mod users;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, ToSql, params};

use crate::error::StoreError;
use crate::model::{EnergyLevel, GoalStatus, PlaybookItemType};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let store = Self::init(conn, Some(path))?;
        tracing::info!(path = ?store.path, "opened database");
        Ok(store)
    }

    /// Private in-memory database. Used by tests and `--memory` runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::install(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Whether a seed pack has already been applied.
    pub fn is_seed_applied(&self, seed_id: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM seed_runs WHERE id = ?1",
                params![seed_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Record a seed pack as applied. Returns `false` if it already was.
    pub fn mark_seed_applied(&self, seed_id: &str, now: NaiveDateTime) -> StoreResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO seed_runs (id, applied_at) VALUES (?1, ?2)",
            params![seed_id, now],
        )?;
        Ok(inserted == 1)
    }

    /// Row counts per table, for `anchor info` and `/health`.
    pub fn table_counts(&self) -> StoreResult<Vec<(&'static str, i64)>> {
        const TABLES: [&str; 7] = [
            "users",
            "daily_logs",
            "anchor_tasks",
            "daily_anchor_task_status",
            "noodles_logs",
            "playbook_items",
            "future_goals",
        ];
        let conn = self.lock()?;
        let mut out = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            out.push((table, count));
        }
        Ok(out)
    }
}

/// Map a UNIQUE violation to [`StoreError::Conflict`], anything else through.
pub(crate) fn map_conflict(err: rusqlite::Error, entity: &'static str, key: &str) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::Conflict {
            entity,
            key: key.to_string(),
        },
        _ => StoreError::from(err),
    }
}

/// Merge a patched nullable text column: `None` keeps `current`, a blank
/// string clears it to NULL.
pub(crate) fn patch_text(patch: Option<&String>, current: Option<String>) -> Option<String> {
    match patch {
        None => current,
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value.clone()),
    }
}

// ── Enum column codecs ───────────────────────────────────────────────────

fn from_text<T: FromStr>(value: ValueRef<'_>) -> FromSqlResult<T> {
    let text = value.as_str()?;
    text.parse()
        .map_err(|_| FromSqlError::Other(format!("unexpected value {text:?}").into()))
}

impl ToSql for EnergyLevel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EnergyLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        from_text(value)
    }
}

impl ToSql for PlaybookItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PlaybookItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        from_text(value)
    }
}

impl ToSql for GoalStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GoalStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        from_text(value)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_runs_are_tracked_once() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.is_seed_applied("playbook").unwrap());
        assert!(store.mark_seed_applied("playbook", test_support::now()).unwrap());
        assert!(!store.mark_seed_applied("playbook", test_support::now()).unwrap());
        assert!(store.is_seed_applied("playbook").unwrap());
    }

    #[test]
    fn reopening_a_file_keeps_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("anchor.db");
        {
            let store = Store::open(&path).unwrap();
            test_support::user(&store, "a@b.co");
        }
        let store = Store::open(&path).unwrap();
        let counts = store.table_counts().unwrap();
        assert!(counts.contains(&("users", 1)));
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn corrupt_enum_column_surfaces_as_error() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let parsed: rusqlite::Result<EnergyLevel> =
            conn.query_row("SELECT 'sideways'", [], |row| row.get(0));
        assert!(parsed.is_err());
    }
}
