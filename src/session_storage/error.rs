//! The storage boundary error.

use std::fmt;

use thiserror::Error;

use crate::auth::SessionRecordError;

/// The storage call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    /// `store_session`
    Store,
    /// `load_session`
    Load,
    /// `delete_session`
    Delete,
    /// `delete_sessions`
    DeleteMany,
    /// `find_sessions_by_shop`
    FindByShop,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Store => "storeSession",
            Self::Load => "loadSession",
            Self::Delete => "deleteSession",
            Self::DeleteMany => "deleteSessions",
            Self::FindByShop => "findSessionsByShop",
        })
    }
}

/// A failure at the session storage boundary.
///
/// Raised when a backend call fails or returns something that is not a
/// session. Only the cause's description is kept; the backend's own error
/// type never crosses this boundary.
///
/// ```rust
/// use shopify_app_session::session_storage::{SessionStorageError, StorageOperation};
///
/// let error = SessionStorageError::new(StorageOperation::Load, "connection reset");
/// assert_eq!(error.to_string(), "Session storage loadSession failed: connection reset");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Session storage {operation} failed: {cause}")]
pub struct SessionStorageError {
    operation: StorageOperation,
    cause: String,
}

impl SessionStorageError {
    /// Creates an error for `operation` with a cause description.
    #[must_use]
    pub fn new(operation: StorageOperation, cause: impl Into<String>) -> Self {
        Self {
            operation,
            cause: cause.into(),
        }
    }

    /// Wraps a backend error, keeping its description.
    #[must_use]
    pub fn from_backend(operation: StorageOperation, error: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(operation, error.to_string())
    }

    /// A load returned a value that could not be turned into a session.
    #[must_use]
    pub fn unexpected_record(error: &SessionRecordError) -> Self {
        Self::new(
            StorageOperation::Load,
            format!("unexpected value returned from the load callback: {error}"),
        )
    }

    /// The operation that failed.
    #[must_use]
    pub const fn operation(&self) -> StorageOperation {
        self.operation
    }

    /// Description of the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &str {
        &self.cause
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionStorageError>();
};
