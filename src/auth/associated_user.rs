//! User details attached to online sessions.
//!
//! Online access tokens belong to a specific staff member. The token
//! response carries who that is, how long the token lives, and which scopes
//! the user personally holds; [`OnlineAccessInfo`] keeps that payload on
//! the [`Session`](crate::Session).
//!
//! Field names follow Shopify's token response (`expires_in`,
//! `associated_user_scope`, `associated_user`), so records persisted by
//! other SDKs deserialize unchanged.

use crate::auth::AuthScopes;
use serde::{Deserialize, Serialize};

/// The staff member an online session belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedUser {
    /// The Shopify user ID.
    pub id: u64,

    /// The user's first name.
    #[serde(default)]
    pub first_name: String,

    /// The user's last name.
    #[serde(default)]
    pub last_name: String,

    /// The user's email address.
    #[serde(default)]
    pub email: String,

    /// Whether the user's email has been verified.
    #[serde(default)]
    pub email_verified: bool,

    /// Whether the user is the account owner.
    #[serde(default)]
    pub account_owner: bool,

    /// The user's locale preference (e.g., "en").
    #[serde(default)]
    pub locale: String,

    /// Whether the user is a collaborator.
    #[serde(default)]
    pub collaborator: bool,
}

/// Token metadata returned for online access tokens.
///
/// ```rust
/// use shopify_app_session::{AssociatedUser, OnlineAccessInfo};
///
/// let json = r#"{
///     "expires_in": 86399,
///     "associated_user_scope": "read_products",
///     "associated_user": { "id": 42, "email": "jane@example.com" }
/// }"#;
/// let info: OnlineAccessInfo = serde_json::from_str(json).unwrap();
/// assert_eq!(info.associated_user.id, 42);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineAccessInfo {
    /// Seconds until the access token expires, as issued.
    pub expires_in: u64,

    /// Scopes available to the associated user.
    #[serde(default)]
    pub associated_user_scope: AuthScopes,

    /// The user the token belongs to.
    pub associated_user: AssociatedUser,
}

impl OnlineAccessInfo {
    /// Returns the associated user's ID.
    #[must_use]
    pub const fn user_id(&self) -> u64 {
        self.associated_user.id
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AssociatedUser>();
    assert_send_sync::<OnlineAccessInfo>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_access_info_deserializes_token_response_shape() {
        let json = r#"{
            "expires_in": 86399,
            "associated_user_scope": "write_orders",
            "associated_user": {
                "id": 902541635,
                "first_name": "John",
                "last_name": "Smith",
                "email": "john@example.com",
                "email_verified": true,
                "account_owner": true,
                "locale": "en",
                "collaborator": false
            }
        }"#;

        let info: OnlineAccessInfo = serde_json::from_str(json).unwrap();

        assert_eq!(info.expires_in, 86399);
        assert_eq!(info.user_id(), 902_541_635);
        assert!(info.associated_user.account_owner);
        assert!(info.associated_user_scope.iter().any(|s| s == "read_orders"));
    }

    #[test]
    fn test_associated_user_missing_optional_fields_default() {
        let user: AssociatedUser = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(user.id, 7);
        assert!(user.email.is_empty());
        assert!(!user.collaborator);
    }

    #[test]
    fn test_online_access_info_requires_user() {
        let result = serde_json::from_str::<OnlineAccessInfo>(r#"{"expires_in": 10}"#);
        assert!(result.is_err());
    }
}
