//! Incoming webhook signature verification.
//!
//! - [`verify_webhook`]: checks a request against the config, with key rotation
//! - [`verify_hmac`]: checks a body against a single secret
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::webhooks::{verify_webhook, WebhookRequest};
//! use shopify_app_session::auth::hmac::compute_signature_base64;
//! use shopify_app_session::{ApiKey, ApiSecretKey, ShopifyConfig};
//!
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("secret").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let body = br#"{"id":1}"#;
//! let request = WebhookRequest::from_headers(
//!     body.to_vec(),
//!     [
//!         ("x-shopify-hmac-sha256", compute_signature_base64(body, "secret")),
//!         ("x-shopify-topic", "app/uninstalled".to_string()),
//!         ("x-shopify-shop-domain", "example.myshopify.com".to_string()),
//!     ],
//! )
//! .unwrap();
//!
//! let context = verify_webhook(&config, &request).unwrap();
//! assert_eq!(context.topic(), "app/uninstalled");
//! assert_eq!(context.shop_domain(), Some("example.myshopify.com"));
//! ```
//!
//! All comparisons are constant-time.

use crate::auth::hmac::{compute_signature_base64, constant_time_compare};
use crate::config::ShopifyConfig;
use crate::webhooks::{
    WebhookError, HEADER_API_VERSION, HEADER_HMAC, HEADER_SHOP_DOMAIN, HEADER_TOPIC,
    HEADER_WEBHOOK_ID,
};

/// An incoming webhook: the raw body plus the Shopify headers.
///
/// The body is kept as bytes so the signature is checked against exactly
/// what was received.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    body: Vec<u8>,
    hmac_header: String,
    topic: Option<String>,
    shop_domain: Option<String>,
    api_version: Option<String>,
    webhook_id: Option<String>,
}

impl WebhookRequest {
    /// Creates a request from already extracted header values.
    #[must_use]
    pub fn new(
        body: Vec<u8>,
        hmac_header: String,
        topic: Option<String>,
        shop_domain: Option<String>,
        api_version: Option<String>,
        webhook_id: Option<String>,
    ) -> Self {
        Self {
            body,
            hmac_header,
            topic,
            shop_domain,
            api_version,
            webhook_id,
        }
    }

    /// Creates a request from raw header pairs.
    ///
    /// Header names are matched case-insensitively; unrelated headers are
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`WebhookError::MissingHeader`] when the HMAC header is absent.
    pub fn from_headers<I, K, V>(body: Vec<u8>, headers: I) -> Result<Self, WebhookError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::new(body, String::new(), None, None, None, None);
        let mut hmac: Option<String> = None;

        for (name, value) in headers {
            let name = name.as_ref();
            let slot = if name.eq_ignore_ascii_case(HEADER_HMAC) {
                &mut hmac
            } else if name.eq_ignore_ascii_case(HEADER_TOPIC) {
                &mut request.topic
            } else if name.eq_ignore_ascii_case(HEADER_SHOP_DOMAIN) {
                &mut request.shop_domain
            } else if name.eq_ignore_ascii_case(HEADER_API_VERSION) {
                &mut request.api_version
            } else if name.eq_ignore_ascii_case(HEADER_WEBHOOK_ID) {
                &mut request.webhook_id
            } else {
                continue;
            };
            *slot = Some(value.into());
        }

        request.hmac_header = hmac.ok_or(WebhookError::MissingHeader {
            header: HEADER_HMAC,
        })?;
        Ok(request)
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The signature header value.
    #[must_use]
    pub fn hmac_header(&self) -> &str {
        &self.hmac_header
    }

    /// The topic header value, if present.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// The shop domain header value, if present.
    #[must_use]
    pub fn shop_domain(&self) -> Option<&str> {
        self.shop_domain.as_deref()
    }

    /// The API version header value, if present.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// The webhook id header value, if present.
    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }
}

/// Metadata of a webhook whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookContext {
    topic: String,
    shop_domain: Option<String>,
    api_version: Option<String>,
    webhook_id: Option<String>,
}

impl WebhookContext {
    /// The topic as received, or an empty string when the header was absent.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The shop domain, if present.
    #[must_use]
    pub fn shop_domain(&self) -> Option<&str> {
        self.shop_domain.as_deref()
    }

    /// The API version, if present.
    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// The webhook id, if present.
    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }
}

/// Checks a body's signature against a single secret.
///
/// ```rust
/// use shopify_app_session::webhooks::verify_hmac;
/// use shopify_app_session::auth::hmac::compute_signature_base64;
///
/// let hmac = compute_signature_base64(b"payload", "secret");
/// assert!(verify_hmac(b"payload", &hmac, "secret"));
/// assert!(!verify_hmac(b"payload", "invalid", "secret"));
/// ```
#[must_use]
pub fn verify_hmac(raw_body: &[u8], hmac_header: &str, secret: &str) -> bool {
    let computed = compute_signature_base64(raw_body, secret);
    constant_time_compare(&computed, hmac_header)
}

/// Verifies a webhook request and returns its metadata.
///
/// The primary secret is tried first, then `old_api_secret_key` if one is
/// configured.
///
/// # Errors
///
/// [`WebhookError::InvalidHmac`] when no configured secret matches.
pub fn verify_webhook(
    config: &ShopifyConfig,
    request: &WebhookRequest,
) -> Result<WebhookContext, WebhookError> {
    let verified = config
        .secrets()
        .any(|secret| verify_hmac(request.body(), request.hmac_header(), secret.as_ref()));

    if !verified {
        tracing::debug!(
            topic = request.topic().unwrap_or_default(),
            shop = request.shop_domain().unwrap_or_default(),
            "webhook signature rejected"
        );
        return Err(WebhookError::InvalidHmac);
    }

    Ok(WebhookContext {
        topic: request.topic().unwrap_or_default().to_string(),
        shop_domain: request.shop_domain().map(String::from),
        api_version: request.api_version().map(String::from),
        webhook_id: request.webhook_id().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey};

    fn config(secret: &str, old: Option<&str>) -> ShopifyConfig {
        let mut builder = ShopifyConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new(secret).unwrap());
        if let Some(old) = old {
            builder = builder.old_api_secret_key(ApiSecretKey::new(old).unwrap());
        }
        builder.build().unwrap()
    }

    fn signed(body: &[u8], secret: &str) -> WebhookRequest {
        WebhookRequest::new(
            body.to_vec(),
            compute_signature_base64(body, secret),
            Some("orders/create".to_string()),
            Some("shop.myshopify.com".to_string()),
            Some("2025-10".to_string()),
            Some("id-123".to_string()),
        )
    }

    #[test]
    fn test_from_headers_is_case_insensitive() {
        let request = WebhookRequest::from_headers(
            b"{}".to_vec(),
            [
                ("X-SHOPIFY-HMAC-SHA256", "abc"),
                ("x-shopify-topic", "orders/create"),
                ("X-Shopify-API-Version", "2025-10"),
                ("x-shopify-webhook-id", "wh-1"),
                ("content-type", "application/json"),
            ],
        )
        .unwrap();

        assert_eq!(request.hmac_header(), "abc");
        assert_eq!(request.topic(), Some("orders/create"));
        assert_eq!(request.api_version(), Some("2025-10"));
        assert_eq!(request.webhook_id(), Some("wh-1"));
        assert_eq!(request.shop_domain(), None);
    }

    #[test]
    fn test_from_headers_requires_hmac() {
        let result =
            WebhookRequest::from_headers(b"{}".to_vec(), [("X-Shopify-Topic", "orders/create")]);
        assert_eq!(
            result.unwrap_err(),
            WebhookError::MissingHeader {
                header: HEADER_HMAC
            }
        );
    }

    #[test]
    fn test_verify_hmac_fixture() {
        let expected = compute_signature_base64(b"{}", "sekrit");
        assert!(verify_hmac(b"{}", &expected, "sekrit"));
        assert!(!verify_hmac(b"{} ", &expected, "sekrit"));
        assert!(!verify_hmac(b"{}", &expected, "other"));
    }

    #[test]
    fn test_verify_webhook_returns_context() {
        let context = verify_webhook(&config("secret", None), &signed(b"body", "secret")).unwrap();

        assert_eq!(context.topic(), "orders/create");
        assert_eq!(context.shop_domain(), Some("shop.myshopify.com"));
        assert_eq!(context.api_version(), Some("2025-10"));
        assert_eq!(context.webhook_id(), Some("id-123"));
    }

    #[test]
    fn test_verify_webhook_falls_back_to_old_secret() {
        let request = signed(b"body", "retired");
        assert!(verify_webhook(&config("current", Some("retired")), &request).is_ok());
        assert_eq!(
            verify_webhook(&config("current", None), &request).unwrap_err(),
            WebhookError::InvalidHmac
        );
    }

    #[test]
    fn test_verify_webhook_rejects_tampered_body() {
        let mut request = signed(b"original", "secret");
        request.body = b"tampered".to_vec();
        assert_eq!(
            verify_webhook(&config("secret", None), &request).unwrap_err(),
            WebhookError::InvalidHmac
        );
    }

    #[test]
    fn test_missing_topic_is_empty_string() {
        let body = b"x";
        let request = WebhookRequest::new(
            body.to_vec(),
            compute_signature_base64(body, "secret"),
            None,
            None,
            None,
            None,
        );
        let context = verify_webhook(&config("secret", None), &request).unwrap();
        assert_eq!(context.topic(), "");
    }
}
