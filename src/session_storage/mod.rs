//! Pluggable session persistence.
//!
//! - [`SessionStorage`]: the contract every backend satisfies
//! - [`CustomSessionStorage`]: adapts user-supplied async callbacks to that contract
//! - [`MemorySessionStorage`]: an in-process backend for tests and development
//! - [`StoredSession`]: what a callback may hand back from a read
//! - [`FoundSession`]: one element of a find-by-shop result
//! - [`SessionStorageError`]: the single error kind raised at the storage boundary
//!
//! # Failure policy
//!
//! Backend faults never reach callers in their original type: they are
//! wrapped in exactly one [`SessionStorageError`] carrying the cause's
//! description. Optional capabilities that a backend does not provide
//! (bulk delete, find-by-shop) are not errors; they log a warning and
//! return `false` or an empty list.
//!
//! # Concurrency
//!
//! Every call is an independent future. Nothing is cached between calls and
//! no locking is done around the backend, so two concurrent stores for the
//! same id resolve however the backend resolves them.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::session_storage::{MemorySessionStorage, SessionStorage};
//! use shopify_app_session::{Session, ShopDomain};
//!
//! # tokio_test::block_on(async {
//! let storage = MemorySessionStorage::new();
//! let session = Session::offline(ShopDomain::new("my-store").unwrap(), "nonce");
//!
//! assert!(storage.store_session(&session).await.unwrap());
//! let loaded = storage.load_session(&session.id).await.unwrap();
//! assert_eq!(loaded, Some(session));
//! # });
//! ```

mod custom;
mod error;
mod memory;

pub use custom::CustomSessionStorage;
pub use error::{SessionStorageError, StorageOperation};
pub use memory::MemorySessionStorage;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::{Session, SessionRecordError};

/// Boxed error returned by user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A session as handed back by a storage callback.
///
/// Backends that deserialize into [`Session`] return `Session`; document
/// stores and other untyped layers may return the raw `Record` and let the
/// adapter normalize it.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredSession {
    /// A typed session.
    Session(Session),
    /// An untyped record resembling a session.
    Record(Value),
    /// Nothing was stored under the requested key.
    Absent,
}

impl From<Session> for StoredSession {
    fn from(session: Session) -> Self {
        Self::Session(session)
    }
}

impl From<Option<Session>> for StoredSession {
    fn from(session: Option<Session>) -> Self {
        session.map_or(Self::Absent, Self::Session)
    }
}

impl From<Value> for StoredSession {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            record => Self::Record(record),
        }
    }
}

/// One element of a [`SessionStorage::find_sessions_by_shop`] result.
///
/// Unlike [`SessionStorage::load_session`], a listing does not normalize
/// untyped records: they come back exactly as the backend produced them.
/// Call [`FoundSession::normalize`] to get the same treatment a load gives.
#[derive(Clone, Debug, PartialEq)]
pub enum FoundSession {
    /// A typed session.
    Session(Session),
    /// An untyped record, as returned by the backend.
    Record(Value),
}

impl FoundSession {
    /// The session id, when there is one.
    ///
    /// Records carrying a numeric `id` yield its decimal form.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Session(session) => Some(session.id.clone()),
            Self::Record(record) => match record.get("id")? {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            },
        }
    }

    /// The typed session, if the backend returned one.
    #[must_use]
    pub const fn as_session(&self) -> Option<&Session> {
        match self {
            Self::Session(session) => Some(session),
            Self::Record(_) => None,
        }
    }

    /// Turns the element into a session the way a load would.
    ///
    /// # Errors
    ///
    /// Whatever [`Session::from_record`] rejects.
    pub fn normalize(self) -> Result<Session, SessionRecordError> {
        match self {
            Self::Session(session) => Ok(session),
            Self::Record(record) => Session::from_record(record),
        }
    }
}

impl From<Session> for FoundSession {
    fn from(session: Session) -> Self {
        Self::Session(session)
    }
}

/// Persistence contract for sessions.
///
/// Implementations must be safe to share across tasks. Every method is a
/// single all-or-nothing call against the backend.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Creates or replaces the session stored under `session.id`.
    ///
    /// Returns whether the backend accepted the write.
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError>;

    /// Loads the session stored under `id`, or `None` if there is none.
    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError>;

    /// Deletes the session stored under `id`.
    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError>;

    /// Deletes every session in `ids`.
    ///
    /// Backends without bulk delete return `Ok(false)`.
    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError>;

    /// Returns every session stored for `shop`.
    ///
    /// Returns an empty list when there are none or the backend cannot search.
    async fn find_sessions_by_shop(
        &self,
        shop: &str,
    ) -> Result<Vec<FoundSession>, SessionStorageError>;
}
