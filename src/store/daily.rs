//! Daily logs and the per-day anchor task checklist.
//!
//! The upsert is the one real state transition in the system: it guarantees a
//! single log per (user, date), and snapshots the user's active anchor tasks
//! into status rows only when the log is first created.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

use crate::error::StoreError;
use crate::model::{
    DailyAnchorTaskStatus, DailyLog, DailyLogWithTasks, EnergyLevel, TaskStatusView,
    UpsertOutcome, UserId,
};
use crate::store::{Store, StoreResult};

const LOG_COLUMNS: &str = "id, user_id, log_date, energy_level, created_at";

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<DailyLog> {
    Ok(DailyLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        log_date: row.get(2)?,
        energy_level: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn task_view_from_row(row: &Row<'_>) -> rusqlite::Result<TaskStatusView> {
    Ok(TaskStatusView {
        status_id: row.get(0)?,
        anchor_task_id: row.get(1)?,
        task_name: row.get(2)?,
        description: row.get(3)?,
        is_completed: row.get(4)?,
    })
}

const TASK_VIEW_SQL: &str = "SELECT s.id, s.anchor_task_id, t.task_name, t.description, s.is_completed \
     FROM daily_anchor_task_status s \
     JOIN anchor_tasks t ON t.id = s.anchor_task_id";

impl Store {
    /// Find-or-create the log for (`user_id`, `date`) with `level`.
    ///
    /// An existing log only has its energy level replaced. A new log gets one
    /// incomplete status row per currently active anchor task of the user.
    /// Runs in a single immediate transaction.
    pub fn upsert_daily_log(
        &self,
        user_id: UserId,
        date: NaiveDate,
        level: EnergyLevel,
        now: NaiveDateTime,
    ) -> StoreResult<UpsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM daily_logs WHERE user_id = ?1 AND log_date = ?2"),
                params![user_id, date],
                log_from_row,
            )
            .optional()?;

        let outcome = match existing {
            Some(log) => {
                tx.execute(
                    "UPDATE daily_logs SET energy_level = ?2 WHERE id = ?1",
                    params![log.id, level],
                )?;
                UpsertOutcome {
                    log: DailyLog {
                        energy_level: level,
                        ..log
                    },
                    created: false,
                    statuses_created: 0,
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO daily_logs (user_id, log_date, energy_level, created_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, date, level, now],
                )?;
                let log_id = tx.last_insert_rowid();
                let statuses_created = tx.execute(
                    "INSERT INTO daily_anchor_task_status (daily_log_id, anchor_task_id, is_completed) \
                     SELECT ?1, id, 0 FROM anchor_tasks \
                     WHERE user_id = ?2 AND is_active = 1 \
                     ORDER BY id",
                    params![log_id, user_id],
                )?;
                UpsertOutcome {
                    log: DailyLog {
                        id: log_id,
                        user_id,
                        log_date: date,
                        energy_level: level,
                        created_at: now,
                    },
                    created: true,
                    statuses_created,
                }
            }
        };

        tx.commit()?;
        tracing::debug!(
            user_id,
            %date,
            level = %level,
            created = outcome.created,
            statuses = outcome.statuses_created,
            "daily log upserted"
        );
        Ok(outcome)
    }

    /// The log for (`user_id`, `date`), if any.
    pub fn daily_log(&self, user_id: UserId, date: NaiveDate) -> StoreResult<Option<DailyLog>> {
        let conn = self.lock()?;
        let log = conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM daily_logs WHERE user_id = ?1 AND log_date = ?2"),
                params![user_id, date],
                log_from_row,
            )
            .optional()?;
        Ok(log)
    }

    /// The log for (`user_id`, `date`) with its checklist joined to task names.
    pub fn daily_log_with_tasks(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyLogWithTasks>> {
        let conn = self.lock()?;
        let Some(log) = conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM daily_logs WHERE user_id = ?1 AND log_date = ?2"),
                params![user_id, date],
                log_from_row,
            )
            .optional()?
        else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(&format!("{TASK_VIEW_SQL} WHERE s.daily_log_id = ?1 ORDER BY s.id"))?;
        let tasks = stmt
            .query_map(params![log.id], task_view_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(DailyLogWithTasks { log, tasks }))
    }

    /// Raw status rows of one log.
    pub fn task_statuses(&self, daily_log_id: i64) -> StoreResult<Vec<DailyAnchorTaskStatus>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, daily_log_id, anchor_task_id, is_completed \
             FROM daily_anchor_task_status WHERE daily_log_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![daily_log_id], |row| {
                Ok(DailyAnchorTaskStatus {
                    id: row.get(0)?,
                    daily_log_id: row.get(1)?,
                    anchor_task_id: row.get(2)?,
                    is_completed: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Flip a checklist item. Only status rows on the user's own logs match.
    pub fn set_task_completion(
        &self,
        user_id: UserId,
        status_id: i64,
        completed: bool,
    ) -> StoreResult<TaskStatusView> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE daily_anchor_task_status SET is_completed = ?3 \
             WHERE id = ?1 AND daily_log_id IN (SELECT id FROM daily_logs WHERE user_id = ?2)",
            params![status_id, user_id, completed],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "task status",
                key: status_id.to_string(),
            });
        }
        let view = conn.query_row(
            &format!("{TASK_VIEW_SQL} WHERE s.id = ?1"),
            params![status_id],
            task_view_from_row,
        )?;
        Ok(view)
    }

    /// Most recent logs first, for the history view.
    pub fn recent_daily_logs(&self, user_id: UserId, limit: usize) -> StoreResult<Vec<DailyLog>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM daily_logs WHERE user_id = ?1 \
             ORDER BY log_date DESC LIMIT ?2"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let logs = stmt
            .query_map(params![user_id, limit], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}
