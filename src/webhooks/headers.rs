//! Webhook header names and outgoing webhook signing.

use crate::auth::hmac::compute_signature_base64;
use crate::config::{ShopDomain, ShopifyConfig};

/// Base64 HMAC-SHA256 of the raw body.
pub const HEADER_HMAC: &str = "X-Shopify-Hmac-Sha256";

/// Event topic, e.g. `orders/create`.
pub const HEADER_TOPIC: &str = "X-Shopify-Topic";

/// The shop's myshopify domain.
pub const HEADER_SHOP_DOMAIN: &str = "X-Shopify-Shop-Domain";

/// Unique id of the delivery.
pub const HEADER_WEBHOOK_ID: &str = "X-Shopify-Webhook-Id";

/// API version the payload was rendered with.
pub const HEADER_API_VERSION: &str = "X-Shopify-Api-Version";

/// Builds the headers Shopify would send with a webhook delivery.
///
/// The body is signed with the config's primary secret. Useful for driving
/// webhook handlers in tests.
///
/// ```rust
/// use shopify_app_session::webhooks::{webhook_headers, HEADER_HMAC};
/// use shopify_app_session::auth::hmac::compute_signature_base64;
/// use shopify_app_session::{ApiKey, ApiSecretKey, ShopDomain, ShopifyConfig};
///
/// let config = ShopifyConfig::builder()
///     .api_key(ApiKey::new("key").unwrap())
///     .api_secret_key(ApiSecretKey::new("sekrit").unwrap())
///     .build()
///     .unwrap();
/// let shop = ShopDomain::new("example").unwrap();
///
/// let headers = webhook_headers(&config, "app/uninstalled", &shop, b"{}", "wh-1");
/// let hmac = headers.iter().find(|(name, _)| *name == HEADER_HMAC).unwrap();
/// assert_eq!(hmac.1, compute_signature_base64(b"{}", "sekrit"));
/// ```
#[must_use]
pub fn webhook_headers(
    config: &ShopifyConfig,
    topic: &str,
    shop: &ShopDomain,
    body: &[u8],
    webhook_id: &str,
) -> Vec<(&'static str, String)> {
    vec![
        (HEADER_TOPIC, topic.to_string()),
        (HEADER_SHOP_DOMAIN, shop.to_string()),
        (
            HEADER_HMAC,
            compute_signature_base64(body, config.api_secret_key().as_ref()),
        ),
        (HEADER_WEBHOOK_ID, webhook_id.to_string()),
        (HEADER_API_VERSION, config.api_version().to_string()),
    ]
}
