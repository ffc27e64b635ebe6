//! Error types for backend operations.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur during backend operations.
///
/// The facade layer replays a single initialization outcome to every
/// concurrent caller, so backend errors must be cloneable. I/O errors
/// are held behind an `Arc` for that reason.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// The on-disk store is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The backend does not support the requested operation.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(String),

    /// Another instance holds the store's exclusive lock.
    #[error("store is locked by another instance")]
    Locked,

    /// The connection has been torn down.
    #[error("store connection is closed")]
    Closed,
}

impl From<io::Error> for BackendError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl BackendError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}
