//! v002 -- One exchange per unordered (owner, counterparty, product) triple.
//!
//! The application checks for an existing exchange before inserting; this
//! index makes the check hold under concurrent writers too.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_exchanges_unordered_pair
    ON exchanges(product_id, min(owner_id, counterparty_id), max(owner_id, counterparty_id));
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
