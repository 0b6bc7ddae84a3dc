use std::path::PathBuf;
use thiserror::Error;

/// Failures locating, reading or writing the state file. `load` never
/// surfaces these; they drive the backup-restore cascade and are logged
/// instead.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state file {path} failed validation: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("could not find the user's home directory; set OSSMATE_HOME")]
    NoHomeDir,

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

impl StateError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
