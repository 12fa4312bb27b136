//! Webhook signing and verification.
//!
//! Shopify signs every webhook delivery with HMAC-SHA256 of the raw body,
//! keyed by the app's secret, and sends it base64-encoded in
//! [`HEADER_HMAC`]. This module reads those headers, verifies the signature
//! (including against a rotated-out secret), and can produce the same
//! headers for outgoing test deliveries.
//!
//! - [`WebhookRequest`]: raw body plus headers
//! - [`verify_webhook`]: config-level verification returning a [`WebhookContext`]
//! - [`verify_hmac`]: single-secret check
//! - [`webhook_headers`]: headers for a signed delivery
//!
//! # Error Handling
//!
//! ```rust
//! use shopify_app_session::webhooks::WebhookError;
//!
//! fn status_for(error: WebhookError) -> u16 {
//!     match error {
//!         WebhookError::MissingHeader { .. } => 400,
//!         WebhookError::InvalidHmac => 401,
//!     }
//! }
//! assert_eq!(status_for(WebhookError::InvalidHmac), 401);
//! ```

mod errors;
mod headers;
pub mod verification;

pub use errors::WebhookError;
pub use headers::{
    webhook_headers, HEADER_API_VERSION, HEADER_HMAC, HEADER_SHOP_DOMAIN, HEADER_TOPIC,
    HEADER_WEBHOOK_ID,
};
pub use verification::{verify_hmac, verify_webhook, WebhookContext, WebhookRequest};

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookError>();
    assert_send_sync::<WebhookRequest>();
    assert_send_sync::<WebhookContext>();
};
