//! User records

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::User;

impl Database {
    /// Record a provider-issued user, refreshing the email if it changed
    pub fn ensure_user(&self, user_id: &str, email: &str) -> Result<User> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO users (id, email) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                updated_at = CURRENT_TIMESTAMP
            WHERE users.email != excluded.email
            "#,
            params![user_id, email],
        )?;

        let user = conn.query_row(
            "SELECT id, email, created_at, updated_at FROM users WHERE id = ?",
            params![user_id],
            Self::row_to_user,
        )?;

        Ok(user)
    }

    /// Get a user by provider id
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, email, created_at, updated_at FROM users WHERE id = ?",
                params![user_id],
                Self::row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }
}
