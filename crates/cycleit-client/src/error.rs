use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No live session. Callers should send the user to the login screen.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the user has to sign in (again).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
