//! Row models.
//!
//! Marketplace entities are defined in `cycleit_shared::models` and
//! re-exported here; the structs below exist only on the storage side.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use cycleit_shared::models::*;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Login credentials. The profile with the same `id` is the public face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A bearer session. Only the BLAKE3 hash of the token is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
