//! Session storage backed by user-supplied callbacks.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::auth::Session;
use crate::session_storage::{
    BoxError, FoundSession, SessionStorage, SessionStorageError, StorageOperation, StoredSession,
};

type Callback<A, T> = Box<dyn Fn(A) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync>;

fn boxed<A, T, F, Fut, E>(callback: F) -> Callback<A, T>
where
    A: 'static,
    T: 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    Box::new(move |arg: A| {
        callback(arg)
            .map(|result| result.map_err(Into::<BoxError>::into))
            .boxed()
    })
}

/// Runs one backend call, folding every failure into a single
/// [`SessionStorageError`]. A panic inside the callback's future counts as
/// a failure.
async fn invoke<T>(
    operation: StorageOperation,
    call: BoxFuture<'static, Result<T, BoxError>>,
) -> Result<T, SessionStorageError> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            tracing::error!(%operation, error = %error, "session storage callback failed");
            Err(SessionStorageError::from_backend(operation, &*error))
        }
        Err(panic) => {
            let cause = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "callback panicked".to_string());
            tracing::error!(%operation, %cause, "session storage callback panicked");
            Err(SessionStorageError::new(operation, cause))
        }
    }
}

/// Adapts async callbacks to [`SessionStorage`].
///
/// Store, load and delete are required. Bulk delete and find-by-shop are
/// optional; without them those operations warn and return `false` or an
/// empty list.
///
/// The load callback may return an untyped record; it is rebuilt into a
/// [`Session`] through [`Session::from_record`], so backends that hand back
/// plain JSON documents still produce fully usable sessions. Find-by-shop
/// results are not rebuilt: records reach the caller as [`FoundSession::Record`].
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::{Arc, Mutex};
///
/// use shopify_app_session::session_storage::{
///     BoxError, CustomSessionStorage, SessionStorage, StoredSession,
/// };
/// use shopify_app_session::{Session, ShopDomain};
///
/// # tokio_test::block_on(async {
/// let db: Arc<Mutex<HashMap<String, serde_json::Value>>> = Arc::default();
///
/// let (w, r, d) = (db.clone(), db.clone(), db.clone());
/// let storage = CustomSessionStorage::new(
///     move |session: Session| {
///         let db = w.clone();
///         async move {
///             let record = serde_json::Value::Object(session.to_record());
///             db.lock().unwrap().insert(session.id, record);
///             Ok::<_, BoxError>(true)
///         }
///     },
///     move |id: String| {
///         let db = r.clone();
///         async move {
///             let record = db.lock().unwrap().get(&id).cloned().unwrap_or_default();
///             Ok::<_, BoxError>(StoredSession::from(record))
///         }
///     },
///     move |id: String| {
///         let db = d.clone();
///         async move { Ok::<_, BoxError>(db.lock().unwrap().remove(&id).is_some()) }
///     },
/// );
///
/// let session = Session::offline(ShopDomain::new("my-store").unwrap(), "nonce");
/// storage.store_session(&session).await.unwrap();
/// assert_eq!(storage.load_session(&session.id).await.unwrap(), Some(session));
/// # });
/// ```
pub struct CustomSessionStorage {
    store: Callback<Session, bool>,
    load: Callback<String, StoredSession>,
    delete: Callback<String, bool>,
    delete_many: Option<Callback<Vec<String>, bool>>,
    find_by_shop: Option<Callback<String, Option<Vec<StoredSession>>>>,
}

impl CustomSessionStorage {
    /// Creates a storage from the three required callbacks.
    pub fn new<S, SFut, SErr, L, LFut, LErr, D, DFut, DErr>(store: S, load: L, delete: D) -> Self
    where
        S: Fn(Session) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = Result<bool, SErr>> + Send + 'static,
        SErr: Into<BoxError> + 'static,
        L: Fn(String) -> LFut + Send + Sync + 'static,
        LFut: Future<Output = Result<StoredSession, LErr>> + Send + 'static,
        LErr: Into<BoxError> + 'static,
        D: Fn(String) -> DFut + Send + Sync + 'static,
        DFut: Future<Output = Result<bool, DErr>> + Send + 'static,
        DErr: Into<BoxError> + 'static,
    {
        Self {
            store: boxed(store),
            load: boxed(load),
            delete: boxed(delete),
            delete_many: None,
            find_by_shop: None,
        }
    }

    /// Adds a bulk delete callback.
    #[must_use]
    pub fn with_delete_sessions<F, Fut, E>(mut self, callback: F) -> Self
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.delete_many = Some(boxed(callback));
        self
    }

    /// Adds a find-by-shop callback.
    ///
    /// The callback returns `None` when its backend produced something that
    /// is not a list; that is treated as "no sessions".
    #[must_use]
    pub fn with_find_sessions_by_shop<F, Fut, E>(mut self, callback: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Vec<StoredSession>>, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.find_by_shop = Some(boxed(callback));
        self
    }
}

impl fmt::Debug for CustomSessionStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomSessionStorage")
            .field("delete_sessions", &self.delete_many.is_some())
            .field("find_sessions_by_shop", &self.find_by_shop.is_some())
            .finish_non_exhaustive()
    }
}

/// Maps a listed element without normalizing it. Only absent entries are
/// dropped.
fn listed(item: StoredSession) -> Option<FoundSession> {
    match item {
        StoredSession::Session(session) => Some(FoundSession::Session(session)),
        StoredSession::Record(record) => Some(FoundSession::Record(record)),
        StoredSession::Absent => None,
    }
}

#[async_trait]
impl SessionStorage for CustomSessionStorage {
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError> {
        tracing::debug!(id = %session.id, "storing session");
        invoke(StorageOperation::Store, (self.store)(session.clone())).await
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError> {
        tracing::debug!(id, "loading session");
        match invoke(StorageOperation::Load, (self.load)(id.to_string())).await? {
            StoredSession::Session(session) => Ok(Some(session)),
            StoredSession::Record(record) => Session::from_record(record)
                .map(Some)
                .map_err(|e| SessionStorageError::unexpected_record(&e)),
            StoredSession::Absent => Ok(None),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError> {
        tracing::debug!(id, "deleting session");
        invoke(StorageOperation::Delete, (self.delete)(id.to_string())).await
    }

    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError> {
        let Some(delete_many) = &self.delete_many else {
            tracing::warn!("CustomSessionStorage has no deleteSessions callback; nothing deleted");
            return Ok(false);
        };
        invoke(StorageOperation::DeleteMany, delete_many(ids.to_vec())).await
    }

    async fn find_sessions_by_shop(
        &self,
        shop: &str,
    ) -> Result<Vec<FoundSession>, SessionStorageError> {
        let Some(find_by_shop) = &self.find_by_shop else {
            tracing::warn!(shop, "CustomSessionStorage has no findSessionsByShop callback");
            return Ok(Vec::new());
        };
        let Some(items) = invoke(StorageOperation::FindByShop, find_by_shop(shop.to_string())).await?
        else {
            return Ok(Vec::new());
        };
        Ok(items.into_iter().filter_map(listed).collect())
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CustomSessionStorage>();
};
