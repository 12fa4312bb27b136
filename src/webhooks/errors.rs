//! Webhook error types.

use thiserror::Error;

/// Failures while reading or verifying an incoming webhook.
///
/// ```rust
/// use shopify_app_session::webhooks::{WebhookError, HEADER_HMAC};
///
/// let error = WebhookError::MissingHeader { header: HEADER_HMAC };
/// assert_eq!(error.to_string(), "Missing webhook header: X-Shopify-Hmac-Sha256");
/// ```
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WebhookError {
    /// A header the request cannot be verified without was absent.
    #[error("Missing webhook header: {header}")]
    MissingHeader {
        /// Canonical name of the missing header.
        header: &'static str,
    },

    /// Webhook signature verification failed.
    ///
    /// The message is generic so it leaks nothing about the expected value.
    #[error("Webhook signature verification failed")]
    InvalidHmac,
}
