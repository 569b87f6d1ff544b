//! Exchange tracker helpers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::ExchangeDetail;
use crate::types::ExchangeStatus;

/// Exchanges split into the three tracker tabs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExchangeBoard {
    pub active: Vec<ExchangeDetail>,
    pub completed: Vec<ExchangeDetail>,
    pub cancelled: Vec<ExchangeDetail>,
}

impl ExchangeBoard {
    pub fn partition(exchanges: Vec<ExchangeDetail>) -> Self {
        let mut board = Self::default();
        for ex in exchanges {
            match ex.exchange.status {
                ExchangeStatus::Pending | ExchangeStatus::Confirmed => board.active.push(ex),
                ExchangeStatus::Completed => board.completed.push(ex),
                ExchangeStatus::Cancelled => board.cancelled.push(ex),
            }
        }
        board
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len() + self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Work out the counterparty when `me` starts an exchange on a product owned
/// by `owner`, from a conversation with `other`.
///
/// The owner may start it from their side of the conversation, in which case
/// the other participant is the counterparty.
pub fn counterparty_for(owner: Uuid, me: Uuid, other: Option<Uuid>) -> Result<Uuid, DomainError> {
    let counterparty = if me == owner {
        other.ok_or_else(|| {
            DomainError::Validation("owner must name the counterparty".to_string())
        })?
    } else {
        me
    };

    if counterparty == owner {
        return Err(DomainError::SelfExchange);
    }
    Ok(counterparty)
}
