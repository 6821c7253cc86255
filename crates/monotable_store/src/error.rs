//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// The access layer treats these as opaque and propagates them
/// unmodified, with one exception: [`StoreError::ConditionFailed`] is
/// recognized so conditional writes can surface as typed failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional request's condition did not hold.
    #[error("conditional request failed")]
    ConditionFailed,

    /// The addressed table does not exist.
    #[error("table not found: {table}")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// A batch call exceeded the store's per-call item limit.
    #[error("batch of {size} items exceeds the per-call limit of {max}")]
    BatchTooLarge {
        /// Number of items in the rejected batch.
        size: usize,
        /// The store's per-call limit.
        max: usize,
    },

    /// The request is malformed (bad key shape, unknown index, bad expression).
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of what was malformed.
        message: String,
    },

    /// The store could not serve the request.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
