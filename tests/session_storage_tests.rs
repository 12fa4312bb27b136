//! Integration tests for session storage.
//!
//! A callback-backed storage over a JSON document map, the way an app would
//! wire a document database into the SDK.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use shopify_app_session::session_storage::{BoxError, StorageOperation};
use shopify_app_session::{
    AuthScopes, CustomSessionStorage, FoundSession, MemorySessionStorage, Session, SessionStorage,
    SessionStorageError, ShopDomain, StoredSession,
};

type Documents = Arc<Mutex<HashMap<String, Value>>>;

/// Stores sessions as JSON records and returns records from every read.
fn document_storage(docs: &Documents) -> CustomSessionStorage {
    let (w, r, d, dm, f) = (
        docs.clone(),
        docs.clone(),
        docs.clone(),
        docs.clone(),
        docs.clone(),
    );
    CustomSessionStorage::new(
        move |session: Session| {
            let docs = w.clone();
            async move {
                docs.lock()
                    .unwrap()
                    .insert(session.id.clone(), Value::Object(session.to_record()));
                Ok::<_, BoxError>(true)
            }
        },
        move |id: String| {
            let docs = r.clone();
            async move {
                let doc = docs.lock().unwrap().get(&id).cloned().unwrap_or_default();
                Ok::<_, BoxError>(StoredSession::from(doc))
            }
        },
        move |id: String| {
            let docs = d.clone();
            async move { Ok::<_, BoxError>(docs.lock().unwrap().remove(&id).is_some()) }
        },
    )
    .with_delete_sessions(move |ids: Vec<String>| {
        let docs = dm.clone();
        async move {
            let mut docs = docs.lock().unwrap();
            for id in &ids {
                docs.remove(id);
            }
            Ok::<_, BoxError>(true)
        }
    })
    .with_find_sessions_by_shop(move |shop: String| {
        let docs = f.clone();
        async move {
            let found = docs
                .lock()
                .unwrap()
                .values()
                .filter(|doc| doc["shop"] == shop)
                .cloned()
                .map(StoredSession::Record)
                .collect();
            Ok::<_, BoxError>(Some(found))
        }
    })
}

fn online_session() -> Session {
    let shop = ShopDomain::new("s.myshopify.io").unwrap();
    Session::new(Session::online_id(&shop, 42), shop, "st", true)
        .with_access_token("shpua_abc")
        .with_scope("write_products".parse().unwrap())
        .with_expires(Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_store_then_load_through_json_records() {
    let docs = Documents::default();
    let storage = document_storage(&docs);
    let session = online_session();

    assert!(storage.store_session(&session).await.unwrap());

    let stored = docs.lock().unwrap()[&session.id].clone();
    assert!(stored["expires"].is_string());

    let loaded = storage.load_session(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded, session);
    assert!(loaded.is_active(&"read_products".parse::<AuthScopes>().unwrap()));
}

#[tokio::test]
async fn test_record_fixture_normalizes() {
    let docs = Documents::default();
    docs.lock().unwrap().insert(
        "x".to_string(),
        json!({
            "id": "x",
            "shop": "s.myshopify.io",
            "state": "st",
            "isOnline": false,
            "expires": "2024-01-01T00:00:00Z"
        }),
    );
    let storage = document_storage(&docs);

    let session = storage.load_session("x").await.unwrap().unwrap();

    assert_eq!(session.id, "x");
    assert_eq!(session.shop.as_ref(), "s.myshopify.io");
    assert_eq!(session.state, "st");
    assert!(!session.is_online);
    assert_eq!(
        session.expires,
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
    assert!(session.expired());
}

#[tokio::test]
async fn test_record_without_id_is_storage_error() {
    let docs = Documents::default();
    docs.lock()
        .unwrap()
        .insert("x".to_string(), json!({"shop": "s.myshopify.io", "state": "st"}));
    let storage = document_storage(&docs);

    let error: SessionStorageError = storage.load_session("x").await.unwrap_err();

    assert_eq!(error.operation(), StorageOperation::Load);
}

#[tokio::test]
async fn test_find_and_bulk_delete_by_shop() {
    let docs = Documents::default();
    let storage = document_storage(&docs);
    let online = online_session();
    let offline = Session::offline(online.shop.clone(), "st");
    let other = Session::offline(ShopDomain::new("other").unwrap(), "st");
    for session in [&online, &offline, &other] {
        storage.store_session(session).await.unwrap();
    }

    let found = storage
        .find_sessions_by_shop("s.myshopify.io")
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert!(found
        .iter()
        .all(|item| matches!(item, FoundSession::Record(_))));

    let ids: Vec<String> = found.iter().filter_map(FoundSession::id).collect();
    assert!(storage.delete_sessions(&ids).await.unwrap());
    assert!(storage
        .find_sessions_by_shop("s.myshopify.io")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        storage.load_session(&other.id).await.unwrap(),
        Some(other)
    );
}

#[tokio::test]
async fn test_find_returns_documents_load_would_normalize() {
    let docs = Documents::default();
    docs.lock().unwrap().insert(
        "7".to_string(),
        json!({"id": 7, "shop": "s.myshopify.io", "state": "st", "isOnline": "true"}),
    );
    let storage = document_storage(&docs);

    let found = storage
        .find_sessions_by_shop("s.myshopify.io")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id().as_deref(), Some("7"));
    assert!(found[0].as_session().is_none());

    let loaded = storage.load_session("7").await.unwrap().unwrap();
    assert!(loaded.is_online);
    assert_eq!(found[0].clone().normalize().unwrap(), loaded);
}

#[tokio::test]
async fn test_storage_works_behind_trait_object() {
    let backends: Vec<Box<dyn SessionStorage>> = vec![
        Box::new(MemorySessionStorage::new()),
        Box::new(document_storage(&Documents::default())),
    ];
    let session = online_session();

    for storage in &backends {
        storage.store_session(&session).await.unwrap();
        assert_eq!(
            storage.load_session(&session.id).await.unwrap(),
            Some(session.clone())
        );
        storage.delete_session(&session.id).await.unwrap();
        assert_eq!(storage.load_session(&session.id).await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_concurrent_stores_for_distinct_ids() {
    let storage = Arc::new(MemorySessionStorage::new());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move {
                let shop = ShopDomain::new(format!("shop-{i}")).unwrap();
                storage
                    .store_session(&Session::offline(shop, "st"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(storage.len().await, 16);
}
