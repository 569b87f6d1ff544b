//! Client-side session state and change notifications.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::ClientError;

/// The signed-in user and the bearer token the server issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Holds the current session and broadcasts every change to subscribers.
#[derive(Debug)]
pub struct SessionCache {
    tx: watch::Sender<Option<Session>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// The current session if it is still live, `NotAuthenticated` otherwise.
    pub fn require(&self) -> Result<Session, ClientError> {
        self.current()
            .filter(|s| !s.is_expired(Utc::now()))
            .ok_or(ClientError::NotAuthenticated)
    }

    pub fn set(&self, session: Session) {
        tracing::debug!(user = %session.user_id, "session established");
        self.tx.send_replace(Some(session));
    }

    /// Forget the session. Subscribers are only notified if there was one.
    pub fn clear(&self) -> bool {
        self.tx.send_if_modified(|current| current.take().is_some())
    }

    /// Listen for session changes until the returned handle is dropped.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription to a [`SessionCache`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new value. `None` once the
    /// cache itself is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
