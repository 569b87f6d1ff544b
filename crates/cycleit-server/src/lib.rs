//! # cycleit-server
//!
//! HTTP backend for the CycleIt marketplace.
//!
//! - **Accounts & sessions**: sign-up, sign-in, bearer sessions
//! - **Listings**: directory, detail, authoring with image upload, interest
//! - **Messaging**: inbox grouped by counterparty, threads, sending
//! - **Exchanges**: creation and status lifecycle
//! - **Object storage**: bucketed files served under `/storage`
//! - **Per-IP rate limiting**

pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod error;
pub mod exchanges;
pub mod listings;
pub mod messaging;
pub mod multipart;
pub mod profile;
pub mod rate_limit;

pub use api::{build_router, serve, AppState};
pub use config::ServerConfig;
pub use error::ServerError;
