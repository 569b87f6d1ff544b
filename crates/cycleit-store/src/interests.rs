//! "I'm interested" markers on listings. One per (product, user).

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Interest;
use crate::rows::ts;

impl Database {
    pub fn insert_interest(&self, interest: &Interest) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO interests (id, product_id, user_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    interest.id.to_string(),
                    interest.product_id.to_string(),
                    interest.user_id.to_string(),
                    interest.message,
                    ts(&interest.created_at),
                ],
            )
            .map_err(|e| StoreError::from_write(e, "interest already expressed"))?;
        Ok(())
    }

    pub fn has_interest(&self, product_id: Uuid, user_id: Uuid) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM interests WHERE product_id = ?1 AND user_id = ?2",
            params![product_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
