//! # cycleit-client
//!
//! Typed async client for the CycleIt HTTP API.
//!
//! [`CycleItClient`] mirrors every server endpoint. It keeps the current
//! session in a [`SessionCache`] that views can [`subscribe`] to; a request
//! the server answers with 401 clears the cache and notifies subscribers.
//!
//! [`subscribe`]: SessionCache::subscribe

mod client;
mod error;
mod session;

pub use client::{CycleItClient, ImageUpload};
pub use error::ClientError;
pub use session::{Session, SessionCache, SessionSubscription};
