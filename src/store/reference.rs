//! Reference tables: playbook items, future goals, dog-care logs.
//!
//! These are shared household content rather than per-user rows.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::error::StoreError;
use crate::model::{
    FutureGoal, GoalPatch, GoalStatus, NewGoal, NewNoodlesLog, NewPlaybookItem, NoodlesLog,
    PlaybookFilter, PlaybookItem,
};
use crate::store::{Store, StoreResult, patch_text};

fn playbook_from_row(row: &Row<'_>) -> rusqlite::Result<PlaybookItem> {
    Ok(PlaybookItem {
        id: row.get(0)?,
        item_type: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        energy_level_required: row.get(4)?,
    })
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<FutureGoal> {
    Ok(FutureGoal {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        next_physical_step: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn noodles_from_row(row: &Row<'_>) -> rusqlite::Result<NoodlesLog> {
    Ok(NoodlesLog {
        id: row.get(0)?,
        log_date: row.get(1)?,
        activity_type: row.get(2)?,
        duration_minutes: row.get(3)?,
        notes: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const GOAL_COLUMNS: &str = "id, title, description, status, next_physical_step, created_at";

impl Store {
    // ── Playbook ─────────────────────────────────────────────────────────

    /// Insert a playbook item, or refresh description and energy of the item
    /// with the same (type, name). Returns `true` when a new row was inserted.
    pub fn upsert_playbook_item(&self, item: &NewPlaybookItem) -> StoreResult<(PlaybookItem, bool)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM playbook_items WHERE item_type = ?1 AND name = ?2",
                params![item.item_type, item.name],
                |row| row.get(0),
            )
            .optional()?;

        let (id, inserted) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE playbook_items SET description = ?2, energy_level_required = ?3 \
                     WHERE id = ?1",
                    params![id, item.description, item.energy_level_required],
                )?;
                (id, false)
            }
            None => {
                tx.execute(
                    "INSERT INTO playbook_items (item_type, name, description, energy_level_required) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        item.item_type,
                        item.name,
                        item.description,
                        item.energy_level_required
                    ],
                )?;
                (tx.last_insert_rowid(), true)
            }
        };
        tx.commit()?;

        Ok((
            PlaybookItem {
                id,
                item_type: item.item_type,
                name: item.name.clone(),
                description: item.description.clone(),
                energy_level_required: item.energy_level_required,
            },
            inserted,
        ))
    }

    /// Playbook items matching `filter`, easiest first then by name.
    pub fn list_playbook_items(&self, filter: &PlaybookFilter) -> StoreResult<Vec<PlaybookItem>> {
        let mut sql = String::from(
            "SELECT id, item_type, name, description, energy_level_required \
             FROM playbook_items WHERE 1 = 1",
        );
        let mut args: Vec<Value> = Vec::new();

        if !filter.types.is_empty() {
            let placeholders = vec!["?"; filter.types.len()].join(", ");
            sql.push_str(&format!(" AND item_type IN ({placeholders})"));
            args.extend(
                filter
                    .types
                    .iter()
                    .map(|t| Value::Text(t.as_str().to_string())),
            );
        }
        if let Some(max) = filter.max_energy {
            sql.push_str(" AND (energy_level_required IS NULL OR energy_level_required <= ?)");
            args.push(Value::Integer(max));
        }
        sql.push_str(" ORDER BY COALESCE(energy_level_required, 0), name");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), playbook_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    // ── Future goals ─────────────────────────────────────────────────────

    pub fn create_goal(&self, goal: &NewGoal, now: NaiveDateTime) -> StoreResult<FutureGoal> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO future_goals (title, description, status, next_physical_step, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                goal.title,
                goal.description,
                GoalStatus::Active,
                goal.next_physical_step,
                now
            ],
        )?;
        Ok(FutureGoal {
            id: conn.last_insert_rowid(),
            title: goal.title.clone(),
            description: goal.description.clone(),
            status: GoalStatus::Active,
            next_physical_step: goal.next_physical_step.clone(),
            created_at: now,
        })
    }

    /// Goals in creation order, optionally restricted to one status.
    pub fn list_goals(&self, status: Option<GoalStatus>) -> StoreResult<Vec<FutureGoal>> {
        let conn = self.lock()?;
        let goals = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {GOAL_COLUMNS} FROM future_goals WHERE status = ?1 ORDER BY id"
                ))?;
                let goals = stmt
                    .query_map(params![status], goal_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                goals
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {GOAL_COLUMNS} FROM future_goals ORDER BY id"))?;
                let goals = stmt
                    .query_map([], goal_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                goals
            }
        };
        Ok(goals)
    }

    pub fn update_goal(&self, id: i64, patch: &GoalPatch) -> StoreResult<FutureGoal> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                &format!("SELECT {GOAL_COLUMNS} FROM future_goals WHERE id = ?1"),
                params![id],
                goal_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                entity: "goal",
                key: id.to_string(),
            })?;

        let updated = FutureGoal {
            title: patch.title.clone().unwrap_or(current.title),
            description: patch_text(patch.description.as_ref(), current.description),
            status: patch.status.unwrap_or(current.status),
            next_physical_step: patch_text(
                patch.next_physical_step.as_ref(),
                current.next_physical_step,
            ),
            ..current
        };
        tx.execute(
            "UPDATE future_goals SET title = ?2, description = ?3, status = ?4, \
             next_physical_step = ?5 WHERE id = ?1",
            params![
                updated.id,
                updated.title,
                updated.description,
                updated.status,
                updated.next_physical_step
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }

    // ── Dog-care logs ────────────────────────────────────────────────────

    pub fn insert_noodles_log(
        &self,
        entry: &NewNoodlesLog,
        now: NaiveDateTime,
    ) -> StoreResult<NoodlesLog> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO noodles_logs (log_date, activity_type, duration_minutes, notes, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.log_date,
                entry.activity_type,
                entry.duration_minutes,
                entry.notes,
                now
            ],
        )?;
        Ok(NoodlesLog {
            id: conn.last_insert_rowid(),
            log_date: entry.log_date,
            activity_type: entry.activity_type.clone(),
            duration_minutes: entry.duration_minutes,
            notes: entry.notes.clone(),
            created_at: now,
        })
    }

    /// Entries with `from <= log_date <= to`, newest first.
    pub fn list_noodles_logs(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<NoodlesLog>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, log_date, activity_type, duration_minutes, notes, created_at \
             FROM noodles_logs WHERE log_date BETWEEN ?1 AND ?2 \
             ORDER BY log_date DESC, id DESC",
        )?;
        let entries = stmt
            .query_map(params![from, to], noodles_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaybookItemType;
    use crate::store::test_support::now;

    fn item(ty: PlaybookItemType, name: &str, energy: Option<i64>) -> NewPlaybookItem {
        NewPlaybookItem {
            item_type: ty,
            name: name.into(),
            description: None,
            energy_level_required: energy,
        }
    }

    #[test]
    fn playbook_upsert_is_keyed_by_type_and_name() {
        let store = Store::open_in_memory().unwrap();
        let (first, inserted) = store
            .upsert_playbook_item(&item(PlaybookItemType::Meal, "Takeout", Some(0)))
            .unwrap();
        assert!(inserted);
        let (second, inserted) = store
            .upsert_playbook_item(&NewPlaybookItem {
                description: Some("Order from the usual place".into()),
                ..item(PlaybookItemType::Meal, "Takeout", Some(0))
            })
            .unwrap();
        assert!(!inserted);
        assert_eq!(first.id, second.id);

        let all = store.list_playbook_items(&PlaybookFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description.as_deref(), Some("Order from the usual place"));
    }

    #[test]
    fn playbook_filters_by_type_and_energy() {
        let store = Store::open_in_memory().unwrap();
        for it in [
            item(PlaybookItemType::Meal, "Sheet-pan dinner", Some(2)),
            item(PlaybookItemType::Meal, "Takeout", Some(0)),
            item(PlaybookItemType::Meal, "Wrap assembly", Some(1)),
            item(PlaybookItemType::ComfortMedia, "Favourite show", None),
            item(PlaybookItemType::SensoryAid, "Weighted blanket", None),
        ] {
            store.upsert_playbook_item(&it).unwrap();
        }

        let easy_meals = store
            .list_playbook_items(&PlaybookFilter {
                types: vec![PlaybookItemType::Meal],
                max_energy: Some(1),
            })
            .unwrap();
        let names: Vec<&str> = easy_meals.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Takeout", "Wrap assembly"]);

        let effortless = store
            .list_playbook_items(&PlaybookFilter {
                types: Vec::new(),
                max_energy: Some(0),
            })
            .unwrap();
        let names: Vec<&str> = effortless.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Favourite show", "Takeout", "Weighted blanket"]);

        let menu = store
            .list_playbook_items(&PlaybookFilter {
                types: PlaybookItemType::DOPAMINE_MENU.to_vec(),
                max_energy: None,
            })
            .unwrap();
        assert_eq!(menu.len(), 2);
        assert!(menu.iter().all(|i| i.item_type != PlaybookItemType::Meal));
    }

    #[test]
    fn goals_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let goal = store
            .create_goal(
                &NewGoal {
                    title: "Learn pottery".into(),
                    description: None,
                    next_physical_step: Some("Look up a local studio".into()),
                },
                now(),
            )
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Active);

        let done = store
            .update_goal(
                goal.id,
                &GoalPatch {
                    status: Some(GoalStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(done.status, GoalStatus::Completed);
        assert_eq!(done.next_physical_step.as_deref(), Some("Look up a local studio"));

        assert!(store.list_goals(Some(GoalStatus::Active)).unwrap().is_empty());
        assert_eq!(store.list_goals(None).unwrap(), vec![done]);

        let cleared = store
            .update_goal(
                goal.id,
                &GoalPatch {
                    next_physical_step: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.next_physical_step, None);
        assert_eq!(cleared.status, GoalStatus::Completed);
        assert!(matches!(
            store.update_goal(999, &GoalPatch::default()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn noodles_logs_by_date_range() {
        let store = Store::open_in_memory().unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        for (day, kind) in [(1, "Walk"), (2, "Training"), (5, "BCS Check")] {
            store
                .insert_noodles_log(
                    &NewNoodlesLog {
                        log_date: d(day),
                        activity_type: kind.into(),
                        duration_minutes: Some(15),
                        notes: None,
                    },
                    now(),
                )
                .unwrap();
        }
        let week = store.list_noodles_logs(d(1), d(3)).unwrap();
        let kinds: Vec<&str> = week.iter().map(|e| e.activity_type.as_str()).collect();
        assert_eq!(kinds, ["Training", "Walk"]);
    }
}
