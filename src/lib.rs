//! # Shopify App Session
//!
//! Session persistence, request signing and auth completion for Shopify
//! embedded apps.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ShopifyConfig`] and [`ShopifyConfigBuilder`]
//! - The [`Session`] entity and its record format
//! - A [`SessionStorage`] contract, with a callback adapter
//!   ([`CustomSessionStorage`]) and an in-memory backend
//! - HMAC-SHA256 signing and verification of query strings and webhooks
//! - The `after_auth` hook run once a session has been stored
//!
//! ## Quick Start
//!
//! ```rust
//! use shopify_app_session::{ShopifyConfig, ApiKey, ApiSecretKey, ApiVersion};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .scopes("read_products,write_orders".parse().unwrap())
//!     .api_version(ApiVersion::latest())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Storing Sessions
//!
//! Apps plug their own database in through async callbacks. Load callbacks
//! may return either a typed [`Session`] or a raw JSON record; records are
//! normalized on the way out.
//!
//! ```rust
//! use shopify_app_session::session_storage::{BoxError, CustomSessionStorage, StoredSession};
//! use shopify_app_session::{Session, SessionStorage};
//!
//! # tokio_test::block_on(async {
//! let storage = CustomSessionStorage::new(
//!     |_session: Session| async { Ok::<_, BoxError>(true) },
//!     |id: String| async move {
//!         Ok::<_, BoxError>(StoredSession::Record(serde_json::json!({
//!             "id": id,
//!             "shop": "my-store.myshopify.com",
//!             "state": "nonce",
//!             "isOnline": false,
//!             "expires": "2030-01-01T00:00:00Z"
//!         })))
//!     },
//!     |_id: String| async { Ok::<_, BoxError>(true) },
//! );
//!
//! let session = storage.load_session("offline_my-store.myshopify.com").await.unwrap().unwrap();
//! assert!(session.expires.is_some());
//! # });
//! ```
//!
//! ## Signing Requests
//!
//! ```rust
//! use shopify_app_session::auth::hmac::{compute_signature, sign_query};
//!
//! let signed = sign_query([("shop", "a.myshopify.io"), ("timestamp", "1700000000")], "sekrit");
//! assert_eq!(
//!     signed.hmac(),
//!     compute_signature("shop=a.myshopify.io&timestamp=1700000000", "sekrit")
//! );
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration and storage are passed explicitly
//! - **Fail-fast validation**: all newtypes validate on construction
//! - **Thread-safe**: all public types are `Send + Sync`
//! - **Async-first**: storage and hooks are futures, run on Tokio

pub mod auth;
pub mod config;
pub mod error;
pub mod session_storage;
pub mod webhooks;

// Re-export public types at crate root for convenience
pub use auth::{
    complete_auth, AssociatedUser, AuthCompletionError, AuthHooks, AuthScopes, OnlineAccessInfo,
    Session, SessionRecordError,
};
pub use config::{
    ApiKey, ApiSecretKey, ApiVersion, HostUrl, ShopDomain, ShopifyConfig, ShopifyConfigBuilder,
};
pub use error::ConfigError;
pub use session_storage::{
    CustomSessionStorage, FoundSession, MemorySessionStorage, SessionStorage,
    SessionStorageError, StoredSession,
};
pub use webhooks::{verify_webhook, WebhookContext, WebhookError, WebhookRequest};
