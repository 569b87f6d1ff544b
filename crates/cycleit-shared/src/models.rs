//! Domain models.
//!
//! The store maps these to and from SQLite rows, the server returns them as
//! JSON, and the client deserializes them back, so every struct derives both
//! `Serialize` and `Deserialize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::types::{Condition, ExchangeStatus};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Public profile, one per account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The subset of a profile embedded in joined reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<Profile> for ProfileSummary {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            full_name: p.full_name,
            avatar_url: p.avatar_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Product (listing)
// ---------------------------------------------------------------------------

/// An item offered for exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub condition: Condition,
    pub desired_exchange: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Image metadata; `display_order` drives carousel order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub display_order: i32,
}

/// A product joined with its category name, owner and images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub owner: ProfileSummary,
    pub images: Vec<ProductImage>,
}

// ---------------------------------------------------------------------------
// Interest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interest {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A direct message, optionally about a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub product_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// The participant that is not `me`.
    pub fn counterparty(&self, me: Uuid) -> Uuid {
        if self.sender_id == me {
            self.recipient_id
        } else {
            self.sender_id
        }
    }

    pub fn is_unread_for(&self, me: Uuid) -> bool {
        self.recipient_id == me && !self.is_read
    }
}

/// A conversation with the counterparty's profile attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationEntry {
    pub other_user: ProfileSummary,
    #[serde(flatten)]
    pub conversation: Conversation,
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// A tracked exchange between a listing owner and a counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub id: Uuid,
    pub product_id: Uuid,
    pub owner_id: Uuid,
    pub counterparty_id: Uuid,
    pub status: ExchangeStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Exchange {
    pub fn involves(&self, user: Uuid) -> bool {
        self.owner_id == user || self.counterparty_id == user
    }
}

/// An exchange joined with both profiles and a product preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExchangeDetail {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub owner: ProfileSummary,
    pub counterparty: ProfileSummary,
    pub product_title: String,
    pub product_image: Option<String>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub my_listings: u64,
    pub unread_messages: u64,
    pub active_exchanges: u64,
    pub completed_exchanges: u64,
}
