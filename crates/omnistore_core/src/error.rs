//! Error types for the storage facade.

use omnistore_backend::BackendError;
use thiserror::Error;

/// Result type for facade operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage facade.
///
/// `StoreError` is `Clone`: a store's initialization runs exactly once
/// and its outcome, success or failure, is replayed to every caller
/// that awaits it.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A driver name in `driver_order` is not in the recognized set.
    #[error("unrecognized driver name: {token:?}")]
    UnknownDriver {
        /// The offending token.
        token: String,
    },

    /// No driver in the configured order was viable in this
    /// environment. Fatal for the store instance; construct a new
    /// store with a different configuration to recover.
    #[error("no viable storage driver in the configured order")]
    NoViableDriver,

    /// A driver is already registered under this identifier.
    #[error("driver already registered: {id}")]
    AlreadyRegistered {
        /// The identifier that was registered twice.
        id: String,
    },

    /// A backend operation failed. Propagated unchanged from the
    /// active backend; the facade adds no retry or suppression.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Creates an unknown-driver error.
    pub fn unknown_driver(token: impl Into<String>) -> Self {
        Self::UnknownDriver {
            token: token.into(),
        }
    }

    /// Creates an already-registered error.
    pub fn already_registered(id: impl Into<String>) -> Self {
        Self::AlreadyRegistered { id: id.into() }
    }
}
