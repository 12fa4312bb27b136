//! The canonical session entity.
//!
//! A [`Session`] is the authenticated context for a shop (offline) or a
//! shop/user pair (online). Storage backends persist it however they like;
//! [`Session::to_record`] and [`Session::from_record`] define the record
//! shape used when a backend hands back plain key/value data instead of a
//! typed session.
//!
//! # Record shape
//!
//! Records use camelCase keys (`isOnline`, `accessToken`,
//! `onlineAccessInfo`) with `expires` as an RFC 3339 string. snake_case
//! aliases are accepted on input. Keys the session does not know about are
//! kept in [`Session::extra`] and written back on the next store.

use crate::auth::{AuthScopes, OnlineAccessInfo};
use crate::config::ShopDomain;
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const ID_KEY: &str = "id";
/// Record keys consumed by the canonical constructor, with their aliases.
const CONSTRUCTOR_KEYS: [&str; 5] = ["id", "shop", "state", "isOnline", "is_online"];

/// Reasons a record could not be turned into a [`Session`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionRecordError {
    /// The value does not look like a session at all.
    #[error("expected a session record, got {shape}")]
    UnexpectedShape {
        /// Description of what was received.
        shape: String,
    },

    /// A session field was present but unusable.
    #[error("invalid session field '{field}': {reason}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// An authenticated session for a shop.
///
/// ```rust
/// use shopify_app_session::{Session, ShopDomain};
///
/// let shop = ShopDomain::new("my-store").unwrap();
/// let session = Session::new(Session::offline_id(&shop), shop, "nonce", false)
///     .with_access_token("shpat_123");
///
/// assert_eq!(session.id, "offline_my-store.myshopify.com");
/// assert!(!session.expired());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier, derived from shop, online flag and user.
    pub id: String,

    /// The shop this session is for.
    pub shop: ShopDomain,

    /// OAuth state nonce issued when the session was begun.
    #[serde(default)]
    pub state: String,

    /// Whether this is an online (user-specific) session.
    #[serde(default, alias = "is_online")]
    pub is_online: bool,

    /// When the access token expires, if it does.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "expires_format"
    )]
    pub expires: Option<DateTime<Utc>>,

    /// The access token for Admin API calls.
    #[serde(default, alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Scopes granted to the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<AuthScopes>,

    /// User details for online sessions.
    #[serde(
        default,
        alias = "online_access_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub online_access_info: Option<OnlineAccessInfo>,

    /// Backend fields this type does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Creates a session from its four mandatory fields.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        shop: ShopDomain,
        state: impl Into<String>,
        is_online: bool,
    ) -> Self {
        Self {
            id: id.into(),
            shop,
            state: state.into(),
            is_online,
            expires: None,
            access_token: None,
            scope: None,
            online_access_info: None,
            extra: Map::new(),
        }
    }

    /// Creates an offline session with its derived id.
    #[must_use]
    pub fn offline(shop: ShopDomain, state: impl Into<String>) -> Self {
        Self::new(Self::offline_id(&shop), shop, state, false)
    }

    /// Creates an online session for the user in `info`.
    ///
    /// The id is derived from the shop and user, and `expires` is computed
    /// from `info.expires_in` relative to `issued_at`. Lifetimes reaching past
    /// 9999-12-31T23:59:59Z are capped there.
    #[must_use]
    pub fn online(
        shop: ShopDomain,
        state: impl Into<String>,
        info: OnlineAccessInfo,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let id = Self::online_id(&shop, info.user_id());
        let mut session = Self::new(id, shop, state, true);
        let latest = latest_expiry();
        session.expires = Some(
            i64::try_from(info.expires_in)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                .map_or(latest, |expires| expires.min(latest)),
        );
        session.online_access_info = Some(info);
        session
    }

    /// Id of the offline session for `shop`.
    #[must_use]
    pub fn offline_id(shop: &ShopDomain) -> String {
        format!("offline_{shop}")
    }

    /// Id of the online session for `user_id` on `shop`.
    #[must_use]
    pub fn online_id(shop: &ShopDomain, user_id: u64) -> String {
        format!("{shop}_{user_id}")
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope(mut self, scope: AuthScopes) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Returns `true` if this session has expired.
    ///
    /// Sessions without an expiry never expire.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// Returns `true` if the session expires within `margin` from now.
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires
            .is_some_and(|expires| Utc::now() + margin >= expires)
    }

    /// Returns `true` if the session's scopes cover `scopes`.
    #[must_use]
    pub fn is_scope_included(&self, scopes: &AuthScopes) -> bool {
        self.scope
            .as_ref()
            .map_or_else(|| scopes.is_empty(), |granted| granted.covers(scopes))
    }

    /// Returns `true` if the session's scopes differ from `scopes`.
    #[must_use]
    pub fn is_scope_changed(&self, scopes: &AuthScopes) -> bool {
        self.scope.as_ref().map_or(!scopes.is_empty(), |granted| granted != scopes)
    }

    /// Returns `true` if the session can make API calls requiring `scopes`.
    ///
    /// A session close to expiry (within 500ms) counts as inactive.
    #[must_use]
    pub fn is_active(&self, scopes: &AuthScopes) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.is_scope_included(scopes)
            && !self.expires_within(Duration::milliseconds(500))
    }

    /// Serializes the session into its record shape.
    #[must_use]
    pub fn to_record(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Normalizes a plain record into a session.
    ///
    /// The record must be an object with an `id`. `id`, `shop`, `state` and
    /// `isOnline` go through [`Session::new`]; every other key is then laid
    /// over the result, so record values win over constructor defaults.
    /// `expires` strings are parsed into timestamps.
    ///
    /// `isOnline` may be a boolean, `0`/`1` or `"true"`/`"false"`; a missing
    /// or null flag means offline.
    ///
    /// # Errors
    ///
    /// [`SessionRecordError::UnexpectedShape`] when the value is not an
    /// object with an `id`, [`SessionRecordError::InvalidField`] when a
    /// field cannot be converted.
    pub fn from_record(record: Value) -> Result<Self, SessionRecordError> {
        let fields = match record {
            Value::Object(fields) if fields.contains_key(ID_KEY) => fields,
            other => {
                return Err(SessionRecordError::UnexpectedShape {
                    shape: describe_shape(&other).to_string(),
                })
            }
        };

        let id = match fields.get(ID_KEY) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            other => {
                return Err(SessionRecordError::InvalidField {
                    field: "id",
                    reason: format!(
                        "expected a string, got {}",
                        describe_shape(other.unwrap_or(&Value::Null))
                    ),
                })
            }
        };

        let shop = fields
            .get("shop")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionRecordError::InvalidField {
                field: "shop",
                reason: "missing or not a string".to_string(),
            })
            .and_then(|shop| {
                ShopDomain::new(shop).map_err(|e| SessionRecordError::InvalidField {
                    field: "shop",
                    reason: e.to_string(),
                })
            })?;

        let state = fields
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let is_online = fields
            .get("isOnline")
            .or_else(|| fields.get("is_online"))
            .map_or(Ok(false), online_flag)
            .map_err(|reason| SessionRecordError::InvalidField {
                field: "isOnline",
                reason,
            })?;

        let mut merged = Self::new(id, shop, state, is_online).to_record();
        for (key, value) in fields {
            if !CONSTRUCTOR_KEYS.contains(&key.as_str()) {
                merged.insert(key, value);
            }
        }

        let expires = merged
            .get("expires")
            .map(expires_from_value)
            .transpose()
            .map_err(|reason| SessionRecordError::InvalidField {
                field: "expires",
                reason,
            })?;
        match expires {
            Some(Some(expires)) => {
                merged.insert("expires".to_string(), expires_to_value(&expires));
            }
            Some(None) => {
                merged.remove("expires");
            }
            None => {}
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| {
            SessionRecordError::InvalidField {
                field: "record",
                reason: e.to_string(),
            }
        })
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

/// Parses a serialized expiry.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`) and RFC 2822 /
/// HTTP-date (`Mon, 01 Jan 2024 00:00:00 GMT`) strings.
#[must_use]
pub fn parse_expires(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Latest expiry a record can round-trip as RFC 3339.
fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(253_402_300_799, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn online_flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(*flag),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("expected 0 or 1, got {n}")),
        },
        Value::String(raw) => match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("expected \"true\" or \"false\", got '{other}'")),
        },
        other => Err(format!("expected a boolean, got {}", describe_shape(other))),
    }
}

fn expires_from_value(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => parse_expires(raw)
            .map(Some)
            .ok_or_else(|| format!("unparsable timestamp '{raw}'")),
        // Epoch milliseconds, as produced by JavaScript `Date#getTime`.
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .map(Some)
            .ok_or_else(|| format!("timestamp out of range: {n}")),
        other => Err(format!("expected a timestamp, got {}", describe_shape(other))),
    }
}

fn expires_to_value(expires: &DateTime<Utc>) -> Value {
    Value::String(expires.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

const fn describe_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "an absent value",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without an 'id' field",
    }
}

mod expires_format {
    use super::{expires_from_value, expires_to_value};
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(expires: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        expires.as_ref().map(expires_to_value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        expires_from_value(&raw).map_err(de::Error::custom)
    }
}
