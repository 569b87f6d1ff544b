//! Listing authoring and directory helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use crate::error::DomainError;
use crate::models::Product;
use crate::types::Condition;

/// Form fields of a new listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub condition: Condition,
    pub desired_exchange: Option<String>,
    pub location: Option<String>,
}

impl ListingDraft {
    /// Trim every field, drop empty optionals, and enforce required fields.
    pub fn validate(self) -> Result<Self, DomainError> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        if title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        if description.is_empty() {
            return Err(DomainError::Validation("description is required".into()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::Validation(format!(
                "title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(DomainError::Validation(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        Ok(Self {
            title,
            description,
            category_id: self.category_id,
            condition: self.condition,
            desired_exchange: non_empty(self.desired_exchange),
            location: non_empty(self.location),
        })
    }

    pub fn into_product(self, owner_id: Uuid, now: DateTime<Utc>) -> Product {
        Product {
            id: Uuid::new_v4(),
            owner_id,
            title: self.title,
            description: self.description,
            category_id: self.category_id,
            condition: self.condition,
            desired_exchange: self.desired_exchange,
            location: self.location,
            is_active: true,
            created_at: now,
        }
    }
}

/// Directory filters. Category and condition are applied by the store, the
/// free-text search on top of its result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingFilter {
    pub category_id: Option<Uuid>,
    pub condition: Option<Condition>,
    pub search: Option<String>,
}

impl ListingFilter {
    /// Case-insensitive substring match on title or description.
    pub fn matches_search(&self, product: &Product) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        product.title.to_lowercase().contains(&term)
            || product.description.to_lowercase().contains(&term)
    }
}

/// Storage key of the `index`-th image of a listing.
pub fn image_object_key(
    owner: Uuid,
    product: Uuid,
    index: usize,
    file_name: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{owner}/{product}/{}-{index}.{}",
        now.timestamp_millis(),
        file_extension(file_name)
    )
}

/// Storage key of a user's avatar. Re-uploading overwrites it.
pub fn avatar_object_key(user: Uuid, file_name: &str) -> String {
    format!("{user}/avatar.{}", file_extension(file_name))
}

/// Lower-cased alphanumeric extension of `file_name`, `bin` if none.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
