//! HMAC-SHA256 signing and verification.
//!
//! Shopify authenticates two kinds of inbound calls with the app's secret:
//!
//! - **Signed query strings** (OAuth callbacks, admin launches, app proxy
//!   style requests): parameters sorted by key, joined as `key=value` with
//!   `&`, signed, and the lowercase hex digest sent as `hmac`.
//! - **Webhooks**: the raw body is signed and the base64 digest is sent in
//!   the `X-Shopify-Hmac-Sha256` header (see [`crate::webhooks`]).
//!
//! All comparisons are constant-time. Verification tries the primary secret
//! and then the old secret when one is configured, so signatures made
//! before a key rotation keep verifying.
//!
//! ```rust
//! use shopify_app_session::auth::hmac::{sign_query, compute_signature};
//!
//! let signed = sign_query([("shop", "a.myshopify.io"), ("timestamp", "1700000000")], "sekrit");
//! assert_eq!(
//!     signed.hmac(),
//!     compute_signature("shop=a.myshopify.io&timestamp=1700000000", "sekrit"),
//! );
//! ```

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::ShopifyConfig;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the hex signature.
pub const HMAC_PARAM: &str = "hmac";

/// Legacy signature parameter, excluded from the signed string.
pub const SIGNATURE_PARAM: &str = "signature";

/// Query parameter added when the caller did not supply one.
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Authentication failures from HMAC verification.
///
/// Messages are deliberately generic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HmacError {
    /// The request carried no signature.
    #[error("Request is missing an HMAC signature")]
    MissingHmac,

    /// The signature did not match any configured secret.
    #[error("HMAC signature validation failed")]
    InvalidHmac,
}

fn mac(secret: &str, message: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message);
    mac
}

/// Computes an HMAC-SHA256 signature as lowercase hex.
///
/// ```rust
/// use shopify_app_session::auth::hmac::compute_signature;
///
/// let sig = compute_signature("message", "key");
/// assert_eq!(sig, "6e9ef29b75fffc5b7abae527d58fdadb2fe42e7219011976917343065f58ed4a");
/// ```
#[must_use]
pub fn compute_signature(message: &str, secret: &str) -> String {
    hex::encode(mac(secret, message.as_bytes()).finalize().into_bytes())
}

/// Computes an HMAC-SHA256 signature over raw bytes as standard base64.
///
/// Webhook bodies are signed byte-for-byte, without any UTF-8 handling.
#[must_use]
pub fn compute_signature_base64(message: &[u8], secret: &str) -> String {
    STANDARD.encode(mac(secret, message).finalize().into_bytes())
}

/// Constant-time string comparison.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Builds the canonical string that query signatures cover.
///
/// Keys are sorted by byte order and `hmac` / `signature` are left out.
/// Keys and values are used as given, without URL encoding.
#[must_use]
pub fn signable_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != HMAC_PARAM && key.as_str() != SIGNATURE_PARAM)
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// A query string signed with [`sign_query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedQuery {
    params: BTreeMap<String, String>,
    hmac: String,
}

impl SignedQuery {
    /// The signed parameters, including `timestamp`, excluding `hmac`.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// The lowercase hex signature.
    #[must_use]
    pub fn hmac(&self) -> &str {
        &self.hmac
    }

    /// Renders the URL-encoded query string, sorted by key, with `hmac` last.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .chain(std::iter::once((HMAC_PARAM, self.hmac.as_str())))
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Returns all parameters with `hmac` included, ready for verification.
    #[must_use]
    pub fn into_params(self) -> BTreeMap<String, String> {
        let mut params = self.params;
        params.insert(HMAC_PARAM.to_string(), self.hmac);
        params
    }
}

/// Signs query parameters.
///
/// A `timestamp` (current Unix time in seconds) is added when missing. Any
/// `hmac` already present is replaced.
#[must_use]
pub fn sign_query<I, K, V>(params: I, secret: &str) -> SignedQuery
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut params: BTreeMap<String, String> = params
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    params.remove(HMAC_PARAM);
    params
        .entry(TIMESTAMP_PARAM.to_string())
        .or_insert_with(|| Utc::now().timestamp().to_string());

    let hmac = compute_signature(&signable_string(&params), secret);
    SignedQuery { params, hmac }
}

/// Parses a raw query string into decoded parameters.
///
/// A leading `?` is ignored and `+` decodes to a space. Repeated keys keep
/// the last value.
#[must_use]
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    let decode = |raw: &str| {
        let raw = raw.replace('+', " ");
        urlencoding::decode(&raw).map_or(raw.clone(), std::borrow::Cow::into_owned)
    };

    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

/// Verifies the `hmac` parameter of a signed query.
///
/// # Errors
///
/// [`HmacError::MissingHmac`] when there is no `hmac` parameter,
/// [`HmacError::InvalidHmac`] when no configured secret produces it.
pub fn validate_query_hmac(
    params: &BTreeMap<String, String>,
    config: &ShopifyConfig,
) -> Result<(), HmacError> {
    let received = params
        .get(HMAC_PARAM)
        .filter(|hmac| !hmac.is_empty())
        .ok_or(HmacError::MissingHmac)?;

    let signable = signable_string(params);
    let verified = config
        .secrets()
        .any(|secret| constant_time_compare(&compute_signature(&signable, secret.as_ref()), received));

    if verified {
        Ok(())
    } else {
        tracing::debug!("query HMAC did not match any configured secret");
        Err(HmacError::InvalidHmac)
    }
}

// Lowercase hex of a digest.
mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}
