//! In-process session storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::Session;
use crate::session_storage::{FoundSession, SessionStorage, SessionStorageError};

/// Keeps sessions in a map guarded by an async lock.
///
/// Contents are lost when the value is dropped. Useful in tests and local
/// development; it never fails.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn store_session(&self, session: &Session) -> Result<bool, SessionStorageError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(true)
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, SessionStorageError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> Result<bool, SessionStorageError> {
        self.sessions.write().await.remove(id);
        Ok(true)
    }

    async fn delete_sessions(&self, ids: &[String]) -> Result<bool, SessionStorageError> {
        let mut sessions = self.sessions.write().await;
        for id in ids {
            sessions.remove(id);
        }
        Ok(true)
    }

    async fn find_sessions_by_shop(
        &self,
        shop: &str,
    ) -> Result<Vec<FoundSession>, SessionStorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|session| session.shop.as_ref() == shop)
            .cloned()
            .map(FoundSession::Session)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopDomain;

    fn offline(shop: &str) -> Session {
        Session::offline(ShopDomain::new(shop).unwrap(), "state")
    }

    #[tokio::test]
    async fn test_store_overwrites_by_id() {
        let storage = MemorySessionStorage::new();
        let first = offline("shop-a");
        let second = first.clone().with_access_token("newer");

        storage.store_session(&first).await.unwrap();
        storage.store_session(&second).await.unwrap();

        assert_eq!(storage.len().await, 1);
        assert_eq!(
            storage.load_session(&first.id).await.unwrap(),
            Some(second)
        );
    }

    #[tokio::test]
    async fn test_delete_of_unknown_id_succeeds() {
        let storage = MemorySessionStorage::new();
        assert!(storage.delete_session("nope").await.unwrap());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_sessions_removes_listed_ids() {
        let storage = MemorySessionStorage::new();
        let a = offline("shop-a");
        let b = offline("shop-b");
        let c = offline("shop-c");
        for s in [&a, &b, &c] {
            storage.store_session(s).await.unwrap();
        }

        assert!(storage
            .delete_sessions(&[a.id.clone(), b.id.clone()])
            .await
            .unwrap());

        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.load_session(&c.id).await.unwrap(), Some(c));
    }

    #[tokio::test]
    async fn test_find_sessions_by_shop_filters() {
        let storage = MemorySessionStorage::new();
        let shop = ShopDomain::new("shop-a").unwrap();
        let offline_session = Session::offline(shop.clone(), "s");
        let online_session = Session::new(Session::online_id(&shop, 7), shop, "s", true);
        storage.store_session(&offline_session).await.unwrap();
        storage.store_session(&online_session).await.unwrap();
        storage.store_session(&offline("shop-b")).await.unwrap();

        let mut found = storage
            .find_sessions_by_shop("shop-a.myshopify.com")
            .await
            .unwrap();
        found.sort_by_key(FoundSession::id);

        assert_eq!(
            found,
            vec![
                FoundSession::Session(offline_session),
                FoundSession::Session(online_session)
            ]
        );
    }
}
