//! CRUD operations for products (listings) and the joined [`Listing`] read.

use rusqlite::params;
use uuid::Uuid;

use cycleit_shared::listing::ListingFilter;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Listing, Product};
use crate::profiles::row_to_summary;
use crate::rows::{collect, parsed_at, ts, ts_at, uuid_at};

const LISTING_SELECT: &str = "
    SELECT p.id, p.owner_id, p.title, p.description, p.category_id, p.condition,
           p.desired_exchange, p.location, p.is_active, p.created_at,
           c.name,
           pr.id, pr.username, pr.full_name, pr.avatar_url
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    JOIN profiles pr ON pr.id = p.owner_id";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn insert_product(&self, product: &Product) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO products (id, owner_id, title, description, category_id, condition,
                                       desired_exchange, location, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    product.id.to_string(),
                    product.owner_id.to_string(),
                    product.title,
                    product.description,
                    product.category_id.to_string(),
                    product.condition.as_str(),
                    product.desired_exchange,
                    product.location,
                    product.is_active as i32,
                    ts(&product.created_at),
                ],
            )
            .map_err(|e| StoreError::from_write(e, "unknown owner or category"))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_product(&self, id: Uuid) -> Result<Product> {
        self.conn()
            .query_row(
                "SELECT id, owner_id, title, description, category_id, condition,
                        desired_exchange, location, is_active, created_at
                 FROM products WHERE id = ?1",
                params![id.to_string()],
                row_to_product,
            )
            .map_err(StoreError::from_query)
    }

    /// One listing with category, owner and images, active or not.
    pub fn get_listing(&self, id: Uuid) -> Result<Listing> {
        let sql = format!("{LISTING_SELECT} WHERE p.id = ?1");
        let mut listing = self
            .conn()
            .query_row(&sql, params![id.to_string()], row_to_listing)
            .map_err(StoreError::from_query)?;
        listing.images = self.images_for_product(id)?;
        Ok(listing)
    }

    /// Active listings, newest first.
    ///
    /// Category and condition filter in SQL; the free-text search is applied
    /// to the result with [`ListingFilter::matches_search`].
    pub fn search_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let sql = format!(
            "{LISTING_SELECT}
             WHERE p.is_active = 1
               AND (?1 IS NULL OR p.category_id = ?1)
               AND (?2 IS NULL OR p.condition = ?2)
             ORDER BY p.created_at DESC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.category_id.map(|c| c.to_string()),
                filter.condition.map(|c| c.as_str()),
            ],
            row_to_listing,
        )?;

        let listings = collect(rows)?
            .into_iter()
            .filter(|l| filter.matches_search(&l.product))
            .collect();
        self.attach_images(listings)
    }

    /// Every listing of `owner` (including inactive), newest first.
    pub fn listings_for_owner(&self, owner: Uuid) -> Result<Vec<Listing>> {
        let sql = format!("{LISTING_SELECT} WHERE p.owner_id = ?1 ORDER BY p.created_at DESC");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![owner.to_string()], row_to_listing)?;
        self.attach_images(collect(rows)?)
    }

    fn attach_images(&self, mut listings: Vec<Listing>) -> Result<Vec<Listing>> {
        for listing in &mut listings {
            listing.images = self.images_for_product(listing.product.id)?;
        }
        Ok(listings)
    }

    // ------------------------------------------------------------------
    // Update / delete
    // ------------------------------------------------------------------

    /// Soft (de)activation. Inactive listings drop out of the directory.
    pub fn set_product_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE products SET is_active = ?1 WHERE id = ?2",
            params![active as i32, id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ON DELETE CASCADE: images, interests and exchanges go with it
    pub fn delete_product(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    let is_active: i32 = row.get(8)?;
    Ok(Product {
        id: uuid_at(row, 0)?,
        owner_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category_id: uuid_at(row, 4)?,
        condition: parsed_at(row, 5)?,
        desired_exchange: row.get(6)?,
        location: row.get(7)?,
        is_active: is_active != 0,
        created_at: ts_at(row, 9)?,
    })
}

fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        product: row_to_product(row)?,
        category_name: row.get(10)?,
        owner: row_to_summary(row, 11)?,
        images: Vec::new(),
    })
}
