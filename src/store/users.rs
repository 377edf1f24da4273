//! User accounts.

use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::model::{NewUser, User, UserId};
use crate::store::{Store, StoreResult, map_conflict};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, created_at, updated_at, deleted_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

impl Store {
    /// Look a user up by email, including soft-deleted accounts.
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Look a user up by id, excluding soft-deleted accounts.
    pub fn find_active_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Insert a user. A duplicate email yields [`StoreError::Conflict`].
    pub fn insert_user(&self, new: &NewUser, now: NaiveDateTime) -> StoreResult<User> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![new.name, new.email, new.password_hash, now],
        )
        .map_err(|e| map_conflict(e, "user", &new.email))?;

        let id = conn.last_insert_rowid();
        tracing::debug!(user_id = id, "user created");
        Ok(User {
            id,
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Set or clear the display name.
    pub fn set_user_name(
        &self,
        id: UserId,
        name: Option<&str>,
        now: NaiveDateTime,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET name = ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, name, now],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    /// Mark a user deleted. Their rows stay; sessions stop resolving.
    pub fn soft_delete_user(&self, id: UserId, now: NaiveDateTime) -> StoreResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE users SET deleted_at = ?2, updated_at = ?2 \
             WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                key: id.to_string(),
            });
        }
        Ok(())
    }
}
