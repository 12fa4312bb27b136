//! Auth-completion hook dispatch.
//!
//! When an authentication exchange yields a [`Session`], [`complete_auth`]
//! persists it and then runs the app's `after_auth` hook, if one is
//! registered, exactly once. The hook receives the session, an
//! [`AdminApiContext`] bound to it, and a [`Redirect`] matching how the app
//! is served (embedded in the Shopify admin or standalone).
//!
//! Hook failures are not retried and reach the caller as
//! [`AuthCompletionError::Hook`], holding the hook's own error.
//!
//! # Example
//!
//! ```rust
//! use shopify_app_session::auth::{complete_auth, AuthHooks};
//! use shopify_app_session::session_storage::{BoxError, MemorySessionStorage};
//! use shopify_app_session::{ApiKey, ApiSecretKey, Session, ShopDomain, ShopifyConfig};
//!
//! # tokio_test::block_on(async {
//! let config = ShopifyConfig::builder()
//!     .api_key(ApiKey::new("key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("secret").unwrap())
//!     .build()
//!     .unwrap();
//! let storage = MemorySessionStorage::new();
//! let hooks = AuthHooks::new().after_auth(|ctx| async move {
//!     assert_eq!(ctx.admin.graphql_url(), "https://my-store.myshopify.com/admin/api/2025-10/graphql.json");
//!     Ok::<_, BoxError>(())
//! });
//!
//! let session = Session::offline(ShopDomain::new("my-store").unwrap(), "nonce")
//!     .with_access_token("shpat_123");
//! complete_auth(&config, &storage, &hooks, session, Some("aG9zdA")).await.unwrap();
//! # });
//! ```

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::auth::Session;
use crate::config::{ApiVersion, ShopDomain, ShopifyConfig};
use crate::session_storage::{BoxError, SessionStorage, SessionStorageError};

/// Path the embedded app serves to break out of the admin iframe.
pub const EXIT_IFRAME_PATH: &str = "/auth/exit-iframe";

/// Admin API coordinates for a session.
///
/// Carries what an API client needs (shop, token, version) and the endpoint
/// URLs derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct AdminApiContext {
    session: Session,
    api_version: ApiVersion,
}

impl AdminApiContext {
    /// Binds `session` to the config's API version.
    #[must_use]
    pub fn new(session: Session, config: &ShopifyConfig) -> Self {
        Self::with_version(session, config.api_version().clone())
    }

    /// Binds `session` to an explicit API version.
    #[must_use]
    pub const fn with_version(session: Session, api_version: ApiVersion) -> Self {
        Self {
            session,
            api_version,
        }
    }

    /// The session requests are made for.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The shop requests go to.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.session.shop
    }

    /// The access token, if the session has one.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.session.access_token.as_deref()
    }

    /// The API version requests use.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// The Admin GraphQL endpoint.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql.json", self.base_url())
    }

    /// A REST endpoint, e.g. `products` or `/admin/api/2025-10/orders/1.json`.
    #[must_use]
    pub fn rest_url(&self, path: &str) -> String {
        let prefix = format!("admin/api/{}/", self.api_version);
        let path = path.trim_start_matches('/');
        let path = path.strip_prefix(&prefix).unwrap_or(path);
        let path = path.strip_suffix(".json").unwrap_or(path);
        format!("{}/{path}.json", self.base_url())
    }

    fn base_url(&self) -> String {
        format!("https://{}/admin/api/{}", self.session.shop, self.api_version)
    }
}

/// A `302 Found` response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Location` header.
    pub location: String,
}

impl RedirectResponse {
    fn found(location: String) -> Self {
        Self {
            status: 302,
            location,
        }
    }
}

/// How to redirect once auth is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redirect {
    /// The app runs inside the Shopify admin iframe.
    Embedded {
        /// Shop the app is loaded for.
        shop: ShopDomain,
        /// The admin's base64 `host` parameter.
        host: String,
        /// The app's own URL, or empty if not configured.
        app_url: String,
    },
    /// The app runs top-level.
    Standalone,
}

impl Redirect {
    /// Picks the variant for the config.
    ///
    /// Embedded apps need the admin's `host` parameter; without it the
    /// redirect falls back to standalone.
    #[must_use]
    pub fn for_config(config: &ShopifyConfig, shop: &ShopDomain, host: Option<&str>) -> Self {
        match host {
            Some(host) if config.is_embedded() => Self::Embedded {
                shop: shop.clone(),
                host: host.to_string(),
                app_url: config
                    .host()
                    .map(|url| url.as_ref().to_string())
                    .unwrap_or_default(),
            },
            None if config.is_embedded() => {
                tracing::debug!(%shop, "no host parameter; using a standalone redirect");
                Self::Standalone
            }
            _ => Self::Standalone,
        }
    }

    /// Builds a redirect to `url`.
    ///
    /// Embedded relative targets keep the `shop` and `host` parameters.
    /// Embedded absolute targets go through the exit-iframe page so the
    /// browser leaves the admin frame.
    ///
    /// ```rust
    /// use shopify_app_session::auth::Redirect;
    /// use shopify_app_session::ShopDomain;
    ///
    /// let redirect = Redirect::Embedded {
    ///     shop: ShopDomain::new("my-store").unwrap(),
    ///     host: "aG9zdA".to_string(),
    ///     app_url: "https://app.example.com".to_string(),
    /// };
    /// assert_eq!(
    ///     redirect.to("/home").location,
    ///     "/home?shop=my-store.myshopify.com&host=aG9zdA"
    /// );
    /// ```
    #[must_use]
    pub fn to(&self, url: &str) -> RedirectResponse {
        match self {
            Self::Standalone => RedirectResponse::found(url.to_string()),
            Self::Embedded {
                shop,
                host,
                app_url,
            } => {
                let params = format!(
                    "shop={}&host={}",
                    urlencoding::encode(shop.as_ref()),
                    urlencoding::encode(host)
                );
                if is_absolute(url) {
                    RedirectResponse::found(format!(
                        "{app_url}{EXIT_IFRAME_PATH}?{params}&exitIframe={}",
                        urlencoding::encode(url)
                    ))
                } else {
                    let separator = if url.contains('?') { '&' } else { '?' };
                    RedirectResponse::found(format!("{url}{separator}{params}"))
                }
            }
        }
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// What the `after_auth` hook receives.
#[derive(Clone, Debug)]
pub struct AfterAuthContext {
    /// The freshly stored session.
    pub session: Session,
    /// Admin API coordinates bound to the session.
    pub admin: AdminApiContext,
    /// Redirect builder for the response.
    pub redirect: Redirect,
}

/// A registered `after_auth` hook.
pub type AfterAuthHook =
    Box<dyn Fn(AfterAuthContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Hooks run around authentication.
#[derive(Default)]
pub struct AuthHooks {
    after_auth: Option<AfterAuthHook>,
}

impl AuthHooks {
    /// No hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook run after each completed auth flow.
    #[must_use]
    pub fn after_auth<F, Fut, E>(mut self, hook: F) -> Self
    where
        F: Fn(AfterAuthContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.after_auth = Some(Box::new(move |context: AfterAuthContext| {
            hook(context)
                .map(|result| result.map_err(Into::<BoxError>::into))
                .boxed()
        }));
        self
    }

    /// Whether an `after_auth` hook is registered.
    #[must_use]
    pub const fn has_after_auth(&self) -> bool {
        self.after_auth.is_some()
    }
}

impl fmt::Debug for AuthHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHooks")
            .field("after_auth", &self.after_auth.is_some())
            .finish()
    }
}

/// Failures while completing authentication.
#[derive(Debug, Error)]
pub enum AuthCompletionError {
    /// The session could not be stored.
    #[error(transparent)]
    Storage(#[from] SessionStorageError),

    /// The storage backend declined the session.
    #[error("Session '{id}' was not accepted by session storage")]
    NotStored {
        /// Id of the declined session.
        id: String,
    },

    /// The `after_auth` hook failed. Holds the hook's error as returned.
    #[error("{0}")]
    Hook(BoxError),
}

/// Stores `session` and runs the `after_auth` hook once.
///
/// `host` is the admin's `host` query parameter, used for embedded
/// redirects. Returns the session on success.
///
/// # Errors
///
/// - [`AuthCompletionError::Storage`] if storing fails
/// - [`AuthCompletionError::NotStored`] if the backend returns `false`
/// - [`AuthCompletionError::Hook`] if the hook fails
///
/// The hook is not run when storing did not succeed.
pub async fn complete_auth<S>(
    config: &ShopifyConfig,
    storage: &S,
    hooks: &AuthHooks,
    session: Session,
    host: Option<&str>,
) -> Result<Session, AuthCompletionError>
where
    S: SessionStorage + ?Sized,
{
    if !storage.store_session(&session).await? {
        tracing::warn!(id = %session.id, "session storage declined the session");
        return Err(AuthCompletionError::NotStored { id: session.id });
    }

    if let Some(hook) = &hooks.after_auth {
        let context = AfterAuthContext {
            admin: AdminApiContext::new(session.clone(), config),
            redirect: Redirect::for_config(config, &session.shop, host),
            session: session.clone(),
        };
        tracing::debug!(id = %session.id, "running after_auth hook");
        hook(context).await.map_err(AuthCompletionError::Hook)?;
    }

    Ok(session)
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdminApiContext>();
    assert_send_sync::<Redirect>();
    assert_send_sync::<AfterAuthContext>();
    assert_send_sync::<AuthHooks>();
    assert_send_sync::<AuthCompletionError>();
};
