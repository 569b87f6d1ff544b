use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "like-new")]
    LikeNew,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "acceptable")]
    Acceptable,
}

impl Condition {
    pub const ALL: [Condition; 4] = [Self::New, Self::LikeNew, Self::Good, Self::Acceptable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::LikeNew => "like-new",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::UnknownCondition(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Exchange status
// ---------------------------------------------------------------------------

/// Lifecycle of an exchange.
///
/// ```text
/// pending ──> confirmed ──> completed
///    │            │
///    └────────────┴──────> cancelled
/// ```
///
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    pub const ALL: [ExchangeStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Pending and confirmed exchanges are shown under "active".
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: ExchangeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    /// Validate a move to `next`, returning the new status.
    pub fn transition(self, next: ExchangeStatus) -> Result<ExchangeStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Storage buckets
// ---------------------------------------------------------------------------

/// Object-storage buckets. Each bucket is a sub-directory of the blob root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    #[serde(rename = "product-images")]
    ProductImages,
    #[serde(rename = "avatars")]
    Avatars,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductImages => "product-images",
            Self::Avatars => "avatars",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product-images" => Ok(Self::ProductImages),
            "avatars" => Ok(Self::Avatars),
            other => Err(DomainError::UnknownBucket(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_edges_are_exactly_four() {
        let mut allowed = Vec::new();
        for from in ExchangeStatus::ALL {
            for to in ExchangeStatus::ALL {
                if from.can_transition_to(to) {
                    allowed.push((from, to));
                }
            }
        }
        assert_eq!(
            allowed,
            vec![
                (ExchangeStatus::Pending, ExchangeStatus::Confirmed),
                (ExchangeStatus::Pending, ExchangeStatus::Cancelled),
                (ExchangeStatus::Confirmed, ExchangeStatus::Completed),
                (ExchangeStatus::Confirmed, ExchangeStatus::Cancelled),
            ]
        );
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for terminal in [ExchangeStatus::Completed, ExchangeStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for to in ExchangeStatus::ALL {
                assert!(terminal.transition(to).is_err());
            }
        }
    }

    #[test]
    fn completed_back_to_pending_is_rejected() {
        let err = ExchangeStatus::Completed
            .transition(ExchangeStatus::Pending)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: ExchangeStatus::Completed,
                to: ExchangeStatus::Pending,
            }
        );
    }

    #[test]
    fn condition_strings() {
        assert_eq!("like-new".parse::<Condition>().unwrap(), Condition::LikeNew);
        assert_eq!(
            serde_json::to_string(&Condition::LikeNew).unwrap(),
            "\"like-new\""
        );
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn status_strings() {
        assert_eq!(
            serde_json::to_string(&ExchangeStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            "confirmed".parse::<ExchangeStatus>().unwrap(),
            ExchangeStatus::Confirmed
        );
    }

    #[test]
    fn bucket_round_trip() {
        for b in [Bucket::ProductImages, Bucket::Avatars] {
            assert_eq!(b.as_str().parse::<Bucket>().unwrap(), b);
        }
        assert!("secrets".parse::<Bucket>().is_err());
    }
}
