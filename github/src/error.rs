use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

/// Coarse classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorKind {
    Auth,
    RateLimit,
    NotFound,
    Other,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("GitHub authentication failed: {0}")]
    Auth(String),

    #[error("GitHub rate limit exhausted: {message}")]
    RateLimit {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl HostError {
    pub fn kind(&self) -> HostErrorKind {
        match self {
            HostError::Auth(_) => HostErrorKind::Auth,
            HostError::RateLimit { .. } => HostErrorKind::RateLimit,
            HostError::NotFound(_) => HostErrorKind::NotFound,
            HostError::Other(_) => HostErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == HostErrorKind::NotFound
    }

    pub(crate) fn other(message: impl Into<String>) -> Self {
        HostError::Other(message.into())
    }
}
