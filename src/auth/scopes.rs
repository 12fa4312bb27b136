//! OAuth scopes and the scope-consent contract.
//!
//! - [`AuthScopes`]: a parsed set of scope handles with implied-scope expansion
//! - [`ScopesDetail`]: granted vs. required vs. optional scopes for a shop
//! - [`ScopesRevokeResponse`]: result of revoking optional scopes
//! - [`ScopesApi`]: the shape of the live scopes API (backed by the Admin
//!   GraphQL API, which this crate does not implement)

use crate::config::ShopifyConfig;
use crate::error::ConfigError;
use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A set of OAuth scopes.
///
/// Write scopes imply their read counterparts, so `write_products` also
/// grants `read_products`. The set serializes as a sorted, comma-separated
/// string, which is also how sessions persist their `scope` field.
///
/// ```rust
/// use shopify_app_session::AuthScopes;
///
/// let scopes: AuthScopes = "write_orders, read_products".parse().unwrap();
/// assert!(scopes.covers(&"read_orders".parse().unwrap()));
/// assert_eq!(scopes.to_string(), "read_orders,read_products,write_orders");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthScopes {
    scopes: BTreeSet<String>,
}

impl AuthScopes {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the scope set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns `true` if every scope in `other` is present in `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.scopes.is_subset(&self.scopes)
    }

    /// Returns the scopes of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            scopes: self.scopes.difference(&other.scopes).cloned().collect(),
        }
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            scopes: self.scopes.union(&other.scopes).cloned().collect(),
        }
    }

    /// Iterates the scopes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    fn with_implied(mut scopes: BTreeSet<String>) -> Self {
        let implied: Vec<String> = scopes
            .iter()
            .filter_map(|scope| Self::implied_scope(scope))
            .collect();
        scopes.extend(implied);
        Self { scopes }
    }

    fn implied_scope(scope: &str) -> Option<String> {
        scope
            .strip_prefix("unauthenticated_write_")
            .map(|rest| format!("unauthenticated_read_{rest}"))
            .or_else(|| {
                scope
                    .strip_prefix("write_")
                    .map(|rest| format!("read_{rest}"))
            })
    }
}

impl FromStr for AuthScopes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scopes = BTreeSet::new();

        for scope in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !scope.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidScopes {
                    reason: format!("Invalid characters in scope: '{scope}'"),
                });
            }
            scopes.insert(scope.to_string());
        }

        Ok(Self::with_implied(scopes))
    }
}

impl<S: Into<String>> FromIterator<S> for AuthScopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let scopes = iter
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self::with_implied(scopes)
    }
}

impl fmt::Display for AuthScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

impl Serialize for AuthScopes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuthScopes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Granted, required, and optional scopes for a shop.
///
/// `required` and `optional` come from configuration; `granted` is whatever
/// the live API reports. `required` is expected to be covered by `granted`
/// once the app is installed, but nothing here enforces it.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopesDetail {
    /// Scopes currently granted to the app on the shop.
    pub granted: AuthScopes,
    /// Scopes the app declares as mandatory.
    pub required: AuthScopes,
    /// Scopes the app may request later.
    pub optional: AuthScopes,
}

impl ScopesDetail {
    /// Combines the live `granted` scopes with the configured ones.
    #[must_use]
    pub fn from_config(config: &ShopifyConfig, granted: AuthScopes) -> Self {
        Self {
            granted,
            required: config.scopes().clone(),
            optional: config.optional_scopes().clone(),
        }
    }

    /// Returns the required scopes that are not granted.
    ///
    /// A non-empty result means the app is misconfigured or the merchant
    /// has not yet approved an update.
    #[must_use]
    pub fn missing_required(&self) -> AuthScopes {
        self.required.difference(&self.granted)
    }

    /// Returns the optional scopes that have not been granted yet.
    #[must_use]
    pub fn requestable(&self) -> AuthScopes {
        self.optional.difference(&self.granted)
    }
}

/// Response from revoking scopes.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScopesRevokeResponse {
    /// The scopes that were revoked.
    pub revoked: AuthScopes,
}

/// The live scopes API bound to one session.
///
/// Implementations call the Admin GraphQL API; they are supplied by the
/// embedding application.
#[async_trait]
pub trait ScopesApi: Send + Sync {
    /// Error type of the underlying API client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Queries the scopes granted to the app alongside the configured ones.
    async fn query(&self) -> Result<ScopesDetail, Self::Error>;

    /// Asks the merchant to grant `scopes`. Performs a redirect as a side effect.
    async fn request(&self, scopes: &AuthScopes) -> Result<(), Self::Error>;

    /// Revokes optional `scopes` from the app.
    async fn revoke(&self, scopes: &AuthScopes) -> Result<ScopesRevokeResponse, Self::Error>;
}
