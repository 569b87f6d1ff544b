//! # cycleit-store
//!
//! SQLite storage for the CycleIt marketplace.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every table:
//! accounts and sessions, profiles, categories, products and their images,
//! interests, messages and exchanges.

pub mod accounts;
pub mod categories;
pub mod database;
pub mod exchanges;
pub mod images;
pub mod interests;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod products;
pub mod profiles;
pub mod stats;

mod error;
mod rows;
#[cfg(test)]
mod test_support;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
