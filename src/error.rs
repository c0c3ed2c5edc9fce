use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by training, testing and optimizer persistence.
#[derive(Debug, Error)]
pub enum ModelgenError {
    /// Caller-supplied data has the wrong shape or an out-of-range value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value cannot be used to build an optimizer.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Reading or writing a persisted optimizer / model failed.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageFailure,
    },
}

/// Underlying cause of a [`ModelgenError::Storage`].
#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed file: {0}")]
    Format(#[from] serde_json::Error),

    /// The file parsed but its contents fail validation.
    #[error("rejected contents: {0}")]
    Invalid(String),
}

impl ModelgenError {
    pub fn storage(path: impl Into<PathBuf>, source: impl Into<StorageFailure>) -> Self {
        ModelgenError::Storage { path: path.into(), source: source.into() }
    }
}

pub type Result<T> = std::result::Result<T, ModelgenError>;
