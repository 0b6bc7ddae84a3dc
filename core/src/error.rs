use ossmate_github::HostError;
use ossmate_github::RefParseError;
use ossmate_state::ConfigError;
use ossmate_state::StateError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or rejected credential. Fatal.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A setting the operation requires is unset. Detected before any
    /// remote call.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// A required remote entity (the PR or issue itself) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Remote(HostError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<HostError> for CoreError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Auth(message) => CoreError::Authentication(message),
            HostError::NotFound(message) => CoreError::NotFound(message),
            other => CoreError::Remote(other),
        }
    }
}

impl From<RefParseError> for CoreError {
    fn from(err: RefParseError) -> Self {
        CoreError::InvalidInput(err.to_string())
    }
}

/// One item of a batch that could not be processed. Batches keep going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub url: String,
    pub message: String,
}

impl ItemFailure {
    pub fn new(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self {
            url: url.into(),
            message: err.to_string(),
        }
    }
}
