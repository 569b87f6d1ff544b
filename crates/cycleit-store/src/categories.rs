//! Category reference data.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Category;
use crate::rows::{collect, uuid_at};

impl Database {
    /// List all categories ordered by name.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_category)?;
        collect(rows)
    }

    pub fn get_category(&self, id: Uuid) -> Result<Category> {
        self.conn()
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?1",
                params![id.to_string()],
                row_to_category,
            )
            .map_err(StoreError::from_query)
    }

    pub fn insert_category(&self, category: &Category) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO categories (id, name) VALUES (?1, ?2)",
                params![category.id.to_string(), category.name],
            )
            .map_err(|e| StoreError::from_write(e, "category already exists"))?;
        Ok(())
    }
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
    })
}
