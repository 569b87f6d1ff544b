use thiserror::Error;

use crate::types::ExchangeStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid exchange transition: {from} -> {to}")]
    InvalidTransition {
        from: ExchangeStatus,
        to: ExchangeStatus,
    },

    #[error("Unknown exchange status: {0}")]
    UnknownStatus(String),

    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Owner and counterparty must differ")]
    SelfExchange,
}
