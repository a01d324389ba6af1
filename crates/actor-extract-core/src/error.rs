//! Error taxonomy for extraction requests

use actor_extract_archive::ValidationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by [`crate::ActorExtractor`].
///
/// Per-entry decode failures never appear here: they are absorbed into an
/// empty result for that entry and reported through its
/// [`crate::EntryStatus`].
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Upload rejected before any entry was dispatched
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid processor configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Unanticipated failure outside entry decoding.
    ///
    /// The message is for logs only; callers should surface a generic error.
    #[error("Internal fault: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Whether this error is the caller's fault (bad upload or bad config).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Errors from submitting work to the [`crate::WorkerPool`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// Queue is full and the caller asked not to wait
    #[error("worker pool queue is full")]
    Saturated,

    /// Pool has shut down and accepts no more jobs
    #[error("worker pool is closed")]
    Closed,

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

impl From<PoolError> for ExtractError {
    fn from(err: PoolError) -> Self {
        ExtractError::Internal(err.to_string())
    }
}

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
