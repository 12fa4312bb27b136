//! Sessions, scopes, request signing and the auth-completion hook.
//!
//! # Overview
//!
//! - [`Session`]: an authenticated session for a shop
//! - [`AuthScopes`]: a set of OAuth scopes with implied scope handling
//! - [`OnlineAccessInfo`] / [`AssociatedUser`]: user details on online sessions
//! - [`hmac`]: query string and webhook body signatures
//! - [`complete_auth`]: persists a new session and runs the `after_auth` hook
//!
//! # Session Types
//!
//! - **Offline sessions**: app-level tokens that don't expire. Used for
//!   background work and webhooks. Id: `offline_{shop}`.
//! - **Online sessions**: tokens tied to one staff member that expire.
//!   Id: `{shop}_{user_id}`.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::{AuthScopes, Session, ShopDomain};
//!
//! let session = Session::offline(ShopDomain::new("my-store").unwrap(), "nonce")
//!     .with_access_token("shpat_123")
//!     .with_scope("read_products".parse().unwrap());
//!
//! let needed: AuthScopes = "read_products".parse().unwrap();
//! assert!(session.is_active(&needed));
//! ```

pub mod after_auth;
mod associated_user;
pub mod hmac;
mod scopes;
pub mod session;

pub use after_auth::{
    complete_auth, AdminApiContext, AfterAuthContext, AfterAuthHook, AuthCompletionError,
    AuthHooks, Redirect, RedirectResponse,
};
pub use associated_user::{AssociatedUser, OnlineAccessInfo};
pub use hmac::{sign_query, validate_query_hmac, HmacError, SignedQuery};
pub use scopes::{AuthScopes, ScopesApi, ScopesDetail, ScopesRevokeResponse};
pub use session::{Session, SessionRecordError};
