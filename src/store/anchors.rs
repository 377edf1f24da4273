//! Anchor task master list.

use rusqlite::{OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::model::{AnchorTask, AnchorTaskPatch, UserId};
use crate::store::{Store, StoreResult, patch_text};

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<AnchorTask> {
    Ok(AnchorTask {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_name: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get(4)?,
    })
}

impl Store {
    pub fn create_anchor_task(
        &self,
        user_id: UserId,
        task_name: &str,
        description: Option<&str>,
    ) -> StoreResult<AnchorTask> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO anchor_tasks (user_id, task_name, description, is_active) \
             VALUES (?1, ?2, ?3, 1)",
            params![user_id, task_name, description],
        )?;
        Ok(AnchorTask {
            id: conn.last_insert_rowid(),
            user_id,
            task_name: task_name.to_string(),
            description: description.map(str::to_string),
            is_active: true,
        })
    }

    /// A user's anchor tasks in creation order.
    pub fn list_anchor_tasks(
        &self,
        user_id: UserId,
        include_inactive: bool,
    ) -> StoreResult<Vec<AnchorTask>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, task_name, description, is_active FROM anchor_tasks \
             WHERE user_id = ?1 AND (?2 OR is_active = 1) \
             ORDER BY id",
        )?;
        let tasks = stmt
            .query_map(params![user_id, include_inactive], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// One of the user's anchor tasks.
    pub fn anchor_task(&self, user_id: UserId, id: i64) -> StoreResult<AnchorTask> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, user_id, task_name, description, is_active FROM anchor_tasks \
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            task_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            entity: "anchor task",
            key: id.to_string(),
        })
    }

    /// Apply a partial update. Existing daily status rows are left alone.
    pub fn update_anchor_task(
        &self,
        user_id: UserId,
        id: i64,
        patch: &AnchorTaskPatch,
    ) -> StoreResult<AnchorTask> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT id, user_id, task_name, description, is_active FROM anchor_tasks \
                 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                task_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                entity: "anchor task",
                key: id.to_string(),
            })?;

        let updated = AnchorTask {
            task_name: patch
                .task_name
                .clone()
                .unwrap_or(current.task_name),
            description: patch_text(patch.description.as_ref(), current.description),
            is_active: patch.is_active.unwrap_or(current.is_active),
            ..current
        };
        tx.execute(
            "UPDATE anchor_tasks SET task_name = ?2, description = ?3, is_active = ?4 \
             WHERE id = ?1",
            params![
                updated.id,
                updated.task_name,
                updated.description,
                updated.is_active
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::user;

    #[test]
    fn create_and_list_in_order() {
        let store = Store::open_in_memory().unwrap();
        let u = user(&store, "a@test.com");
        store.create_anchor_task(u.id, "Take meds", None).unwrap();
        store
            .create_anchor_task(u.id, "Walk Noodles", Some("20 minutes"))
            .unwrap();

        let names: Vec<String> = store
            .list_anchor_tasks(u.id, false)
            .unwrap()
            .into_iter()
            .map(|t| t.task_name)
            .collect();
        assert_eq!(names, ["Take meds", "Walk Noodles"]);
    }

    #[test]
    fn inactive_tasks_filtered_unless_requested() {
        let store = Store::open_in_memory().unwrap();
        let u = user(&store, "a@test.com");
        let t = store.create_anchor_task(u.id, "Journal", None).unwrap();
        store
            .update_anchor_task(
                u.id,
                t.id,
                &AnchorTaskPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(store.list_anchor_tasks(u.id, false).unwrap().is_empty());
        let all = store.list_anchor_tasks(u.id, true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);
        assert_eq!(all[0].task_name, "Journal");
    }

    #[test]
    fn tasks_are_private_to_their_owner() {
        let store = Store::open_in_memory().unwrap();
        let alice = user(&store, "alice@test.com");
        let bob = user(&store, "bob@test.com");
        let t = store.create_anchor_task(alice.id, "Stretch", None).unwrap();

        assert!(store.list_anchor_tasks(bob.id, true).unwrap().is_empty());
        assert!(matches!(
            store.anchor_task(bob.id, t.id),
            Err(StoreError::NotFound { .. })
        ));
        assert!(store
            .update_anchor_task(bob.id, t.id, &AnchorTaskPatch::default())
            .is_err());
    }

    #[test]
    fn rename_keeps_other_fields() {
        let store = Store::open_in_memory().unwrap();
        let u = user(&store, "a@test.com");
        let t = store
            .create_anchor_task(u.id, "Water", Some("2 litres"))
            .unwrap();
        let renamed = store
            .update_anchor_task(
                u.id,
                t.id,
                &AnchorTaskPatch {
                    task_name: Some("Drink water".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.task_name, "Drink water");
        assert_eq!(renamed.description.as_deref(), Some("2 litres"));
        assert!(renamed.is_active);
        assert_eq!(store.anchor_task(u.id, t.id).unwrap(), renamed);
    }

    #[test]
    fn blank_description_clears_it() {
        let store = Store::open_in_memory().unwrap();
        let u = user(&store, "a@test.com");
        let t = store
            .create_anchor_task(u.id, "Water", Some("2 litres"))
            .unwrap();
        let cleared = store
            .update_anchor_task(
                u.id,
                t.id,
                &AnchorTaskPatch {
                    description: Some("  ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(store.anchor_task(u.id, t.id).unwrap().description, None);
    }
}
