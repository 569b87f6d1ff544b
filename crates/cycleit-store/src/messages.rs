//! Direct messages between two profiles.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;
use crate::rows::{collect, opt_uuid_at, ts, ts_at, uuid_at};

const MESSAGE_COLUMNS: &str =
    "id, sender_id, recipient_id, product_id, content, created_at, is_read";

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO messages (id, sender_id, recipient_id, product_id, content,
                                       created_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id.to_string(),
                    message.sender_id.to_string(),
                    message.recipient_id.to_string(),
                    message.product_id.map(|p| p.to_string()),
                    message.content,
                    ts(&message.created_at),
                    message.is_read as i32,
                ],
            )
            .map_err(|e| StoreError::from_write(e, "unknown recipient or product"))?;
        Ok(())
    }

    /// Every message `user` sent or received, newest first.
    pub fn messages_for_user(&self, user: Uuid) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE sender_id = ?1 OR recipient_id = ?1
             ORDER BY created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user.to_string()], row_to_message)?;
        collect(rows)
    }

    /// The thread between `a` and `b`, oldest first.
    pub fn thread_between(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE (sender_id = ?1 AND recipient_id = ?2)
                OR (sender_id = ?2 AND recipient_id = ?1)
             ORDER BY created_at ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![a.to_string(), b.to_string()], row_to_message)?;
        collect(rows)
    }

    /// Mark everything `from` sent to `to` as read. Returns the number of
    /// messages that flipped.
    pub fn mark_thread_read(&self, from: Uuid, to: Uuid) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_read = 1
             WHERE sender_id = ?1 AND recipient_id = ?2 AND is_read = 0",
            params![from.to_string(), to.to_string()],
        )?;
        Ok(affected)
    }

    pub fn count_unread(&self, user: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND is_read = 0",
            params![user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let is_read: i32 = row.get(6)?;
    Ok(Message {
        id: uuid_at(row, 0)?,
        sender_id: uuid_at(row, 1)?,
        recipient_id: uuid_at(row, 2)?,
        product_id: opt_uuid_at(row, 3)?,
        content: row.get(4)?,
        created_at: ts_at(row, 5)?,
        is_read: is_read != 0,
    })
}
