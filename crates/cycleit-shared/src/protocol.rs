//! HTTP request and response bodies shared by the server and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Listing, ProductImage};
use crate::types::ExchangeStatus;

// ─── Auth ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// An authenticated session. `access_token` is only present when the
/// session was just issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

// ─── Listings ───

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressInterestRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestStatus {
    pub interested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetListingActiveRequest {
    pub is_active: bool,
}

/// Result of listing authoring. `failed_uploads` holds the indices of the
/// selected images that could not be stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingCreated {
    pub listing: Listing,
    pub uploaded: Vec<ProductImage>,
    pub failed_uploads: Vec<usize>,
}

// ─── Messaging ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub product_id: Option<Uuid>,
}

// ─── Exchanges ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExchangeRequest {
    pub product_id: Uuid,
    /// Required when the listing owner starts the exchange.
    #[serde(default)]
    pub counterparty_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExchangeStatusRequest {
    pub status: ExchangeStatus,
}

// ─── Profile ───

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvatarUploaded {
    pub avatar_url: String,
}

// ─── Errors ───

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
