//! Dashboard counters.

use rusqlite::params;
use uuid::Uuid;

use cycleit_shared::ExchangeStatus;

use crate::database::Database;
use crate::error::Result;
use crate::models::DashboardStats;

impl Database {
    pub fn dashboard_stats(&self, user: Uuid) -> Result<DashboardStats> {
        let my_listings: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM products WHERE owner_id = ?1 AND is_active = 1",
            params![user.to_string()],
            |row| row.get(0),
        )?;

        Ok(DashboardStats {
            my_listings: my_listings as u64,
            unread_messages: self.count_unread(user)?,
            active_exchanges: self
                .count_exchanges(user, &[ExchangeStatus::Pending, ExchangeStatus::Confirmed])?,
            completed_exchanges: self.count_exchanges(user, &[ExchangeStatus::Completed])?,
        })
    }
}
