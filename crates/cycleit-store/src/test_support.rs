//! Fixtures for the store's unit tests.

use chrono::Utc;
use uuid::Uuid;

use cycleit_shared::listing::ListingDraft;
use cycleit_shared::Condition;

use crate::database::Database;
use crate::models::{Account, Product, Profile};

pub(crate) fn account_and_profile(username: &str) -> (Account, Profile) {
    let id = Uuid::new_v4();
    let now = Utc::now();
    (
        Account {
            id,
            email: format!("{}@example.com", username.to_lowercase()),
            password_hash: "not-a-real-hash".into(),
            created_at: now,
        },
        Profile {
            id,
            username: username.to_string(),
            full_name: None,
            bio: None,
            location: None,
            avatar_url: None,
            created_at: now,
        },
    )
}

pub(crate) fn signed_up(db: &Database, username: &str) -> Profile {
    let (account, profile) = account_and_profile(username);
    db.create_account(&account, &profile).unwrap();
    profile
}

pub(crate) fn listed(db: &Database, owner: Uuid, title: &str, condition: Condition) -> Product {
    let category = db.list_categories().unwrap().remove(0);
    let product = ListingDraft {
        title: title.to_string(),
        description: format!("{title} in {condition} condition"),
        category_id: category.id,
        condition,
        desired_exchange: None,
        location: None,
    }
    .into_product(owner, Utc::now());
    db.insert_product(&product).unwrap();
    product
}
