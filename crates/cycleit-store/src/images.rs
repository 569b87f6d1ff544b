//! Product image metadata. The bytes live in the blob store under
//! `object_key`; the row keeps the key so the object can be removed with
//! its listing.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ProductImage;
use crate::rows::{collect, uuid_at};

impl Database {
    pub fn insert_product_image(&self, image: &ProductImage, object_key: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO product_images (id, product_id, object_key, image_url, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    image.id.to_string(),
                    image.product_id.to_string(),
                    object_key,
                    image.image_url,
                    image.display_order,
                ],
            )
            .map_err(|e| StoreError::from_write(e, "unknown product"))?;
        Ok(())
    }

    /// Images of a product in carousel order.
    pub fn images_for_product(&self, product_id: Uuid) -> Result<Vec<ProductImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, product_id, image_url, display_order
             FROM product_images
             WHERE product_id = ?1
             ORDER BY display_order ASC",
        )?;
        let rows = stmt.query_map(params![product_id.to_string()], |row| {
            Ok(ProductImage {
                id: uuid_at(row, 0)?,
                product_id: uuid_at(row, 1)?,
                image_url: row.get(2)?,
                display_order: row.get(3)?,
            })
        })?;
        collect(rows)
    }

    pub fn image_keys_for_product(&self, product_id: Uuid) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(
            "SELECT object_key FROM product_images WHERE product_id = ?1 ORDER BY display_order",
        )?;
        let rows = stmt.query_map(params![product_id.to_string()], |row| row.get(0))?;
        collect(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{listed, signed_up};
    use cycleit_shared::Condition;

    fn image(product_id: Uuid, order: i32) -> ProductImage {
        ProductImage {
            id: Uuid::new_v4(),
            product_id,
            image_url: format!("http://localhost/storage/product-images/{order}.jpg"),
            display_order: order,
        }
    }

    #[test]
    fn images_come_back_in_display_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = signed_up(&db, "alice");
        let bike = listed(&db, alice.id, "Road Bike", Condition::Good);

        // a gap at 1 is what a failed upload leaves behind
        db.insert_product_image(&image(bike.id, 2), "k2").unwrap();
        db.insert_product_image(&image(bike.id, 0), "k0").unwrap();

        let orders: Vec<i32> = db
            .images_for_product(bike.id)
            .unwrap()
            .iter()
            .map(|i| i.display_order)
            .collect();
        assert_eq!(orders, vec![0, 2]);
        assert_eq!(db.image_keys_for_product(bike.id).unwrap(), vec!["k0", "k2"]);
    }

    #[test]
    fn deleting_product_drops_images() {
        let db = Database::open_in_memory().unwrap();
        let alice = signed_up(&db, "alice");
        let bike = listed(&db, alice.id, "Road Bike", Condition::Good);
        db.insert_product_image(&image(bike.id, 0), "k0").unwrap();

        assert!(db.delete_product(bike.id).unwrap());
        assert!(db.images_for_product(bike.id).unwrap().is_empty());
    }

    #[test]
    fn image_for_unknown_product_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let err = db.insert_product_image(&image(Uuid::new_v4(), 0), "k").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
