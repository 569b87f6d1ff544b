//! # cycleit-shared
//!
//! Types shared by the CycleIt store, server and client: the row models,
//! the wire DTOs, and the few pieces of domain logic that have a shape of
//! their own (exchange lifecycle, conversation grouping, listing search).

pub mod constants;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod listing;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::DomainError;
pub use types::{Bucket, Condition, ExchangeStatus};
