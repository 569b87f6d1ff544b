//! Exchange records and their status transitions.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use cycleit_shared::ExchangeStatus;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Exchange, ExchangeDetail};
use crate::profiles::row_to_summary;
use crate::rows::{collect, opt_ts_at, parsed_at, ts, ts_at, uuid_at};

const EXCHANGE_COLUMNS: &str = "e.id, e.product_id, e.owner_id, e.counterparty_id, e.status,
     e.created_at, e.confirmed_at, e.completed_at";

const DETAIL_SELECT: &str = "
    SELECT e.id, e.product_id, e.owner_id, e.counterparty_id, e.status,
           e.created_at, e.confirmed_at, e.completed_at,
           o.id, o.username, o.full_name, o.avatar_url,
           c.id, c.username, c.full_name, c.avatar_url,
           p.title,
           (SELECT i.image_url FROM product_images i
            WHERE i.product_id = p.id
            ORDER BY i.display_order ASC LIMIT 1)
    FROM exchanges e
    JOIN profiles o ON o.id = e.owner_id
    JOIN profiles c ON c.id = e.counterparty_id
    JOIN products p ON p.id = e.product_id";

impl Database {
    /// The exchange on `product_id` between `a` and `b`, in either role.
    pub fn find_exchange_between(
        &self,
        product_id: Uuid,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Exchange>> {
        let sql = format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges e
             WHERE e.product_id = ?1
               AND ((e.owner_id = ?2 AND e.counterparty_id = ?3)
                 OR (e.owner_id = ?3 AND e.counterparty_id = ?2))"
        );
        let found = self
            .conn()
            .query_row(
                &sql,
                params![product_id.to_string(), a.to_string(), b.to_string()],
                row_to_exchange,
            )
            .optional()?;
        Ok(found)
    }

    /// Insert a new exchange. A second exchange for the same product and
    /// pair of users is a [`StoreError::Conflict`].
    pub fn create_exchange(&self, exchange: &Exchange) -> Result<()> {
        if self
            .find_exchange_between(exchange.product_id, exchange.owner_id, exchange.counterparty_id)?
            .is_some()
        {
            return Err(StoreError::Conflict("exchange already exists".into()));
        }

        self.conn()
            .execute(
                "INSERT INTO exchanges (id, product_id, owner_id, counterparty_id, status,
                                        created_at, confirmed_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    exchange.id.to_string(),
                    exchange.product_id.to_string(),
                    exchange.owner_id.to_string(),
                    exchange.counterparty_id.to_string(),
                    exchange.status.as_str(),
                    ts(&exchange.created_at),
                    exchange.confirmed_at.as_ref().map(ts),
                    exchange.completed_at.as_ref().map(ts),
                ],
            )
            .map_err(|e| StoreError::from_write(e, "exchange already exists"))?;

        tracing::debug!(id = %exchange.id, product = %exchange.product_id, "exchange created");
        Ok(())
    }

    pub fn get_exchange(&self, id: Uuid) -> Result<Exchange> {
        let sql = format!("SELECT {EXCHANGE_COLUMNS} FROM exchanges e WHERE e.id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], row_to_exchange)
            .map_err(StoreError::from_query)
    }

    pub fn get_exchange_detail(&self, id: Uuid) -> Result<ExchangeDetail> {
        let sql = format!("{DETAIL_SELECT} WHERE e.id = ?1");
        self.conn()
            .query_row(&sql, params![id.to_string()], row_to_detail)
            .map_err(StoreError::from_query)
    }

    /// Every exchange `user` takes part in, newest first.
    pub fn exchange_details_for_user(&self, user: Uuid) -> Result<Vec<ExchangeDetail>> {
        let sql = format!(
            "{DETAIL_SELECT}
             WHERE e.owner_id = ?1 OR e.counterparty_id = ?1
             ORDER BY e.created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user.to_string()], row_to_detail)?;
        collect(rows)
    }

    /// Move exchange `id` from `from` to `to` if it is still in `from`.
    ///
    /// Returns `false` when the row was missing or its status had already
    /// changed. Entering `confirmed` or `completed` stamps the matching
    /// timestamp with `at`. Edge legality is the caller's concern.
    pub fn transition_exchange(
        &self,
        id: Uuid,
        from: ExchangeStatus,
        to: ExchangeStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE exchanges
             SET status = ?3,
                 confirmed_at = CASE WHEN ?3 = 'confirmed' THEN ?4 ELSE confirmed_at END,
                 completed_at = CASE WHEN ?3 = 'completed' THEN ?4 ELSE completed_at END
             WHERE id = ?1 AND status = ?2",
            params![id.to_string(), from.as_str(), to.as_str(), ts(&at)],
        )?;
        Ok(affected > 0)
    }

    pub fn count_exchanges(&self, user: Uuid, statuses: &[ExchangeStatus]) -> Result<u64> {
        let mut total = 0u64;
        for status in statuses {
            let count: i64 = self.conn().query_row(
                "SELECT COUNT(*) FROM exchanges
                 WHERE (owner_id = ?1 OR counterparty_id = ?1) AND status = ?2",
                params![user.to_string(), status.as_str()],
                |row| row.get(0),
            )?;
            total += count as u64;
        }
        Ok(total)
    }
}

fn row_to_exchange(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
    Ok(Exchange {
        id: uuid_at(row, 0)?,
        product_id: uuid_at(row, 1)?,
        owner_id: uuid_at(row, 2)?,
        counterparty_id: uuid_at(row, 3)?,
        status: parsed_at(row, 4)?,
        created_at: ts_at(row, 5)?,
        confirmed_at: opt_ts_at(row, 6)?,
        completed_at: opt_ts_at(row, 7)?,
    })
}

fn row_to_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExchangeDetail> {
    Ok(ExchangeDetail {
        exchange: row_to_exchange(row)?,
        owner: row_to_summary(row, 8)?,
        counterparty: row_to_summary(row, 12)?,
        product_title: row.get(16)?,
        product_image: row.get(17)?,
    })
}
