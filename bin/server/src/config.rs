//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables
//! (`AUTH__MODE`, `OAUTH__PROVIDER`, `COOKIES__SECURE`, ...).

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Authorization middleware configuration.
    pub auth: AuthSettings,

    /// OAuth provider configuration. Required when the auth mode is `oauth`.
    #[serde(default)]
    pub oauth: Option<OAuthSettings>,

    /// Cookie configuration.
    #[serde(default)]
    pub cookies: CookieSettings,
}

/// Authorization middleware settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// One of `none`, `standard`, `oauth`.
    ///
    /// Kept as a raw string: an unrecognised value does not stop startup,
    /// it makes every gated request fail with 500.
    pub mode: String,
}

/// OAuth provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthSettings {
    /// `github` or `google`, case-insensitive.
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    /// Absolute URL of the `/auth/callback` route.
    pub callback_url: String,

    /// Comma-separated scopes. Empty means provider defaults.
    #[serde(default)]
    pub scopes: String,

    /// Comma-separated logins/emails granted administrator.
    #[serde(default)]
    pub admins: String,

    /// Comma-separated logins/emails granted moderator.
    #[serde(default)]
    pub moderators: String,

    /// Timeout for token exchange and user-info requests.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Token cookie lifetime when the provider does not report `expires_in`.
    #[serde(default = "default_fallback_token_lifetime_minutes")]
    pub fallback_token_lifetime_minutes: i64,
}

/// Cookie-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieSettings {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure: bool,

    /// Key material (at least 64 bytes) for signing the login state cookie.
    /// A random key is generated per process when unset.
    #[serde(default)]
    pub signing_secret: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_fallback_token_lifetime_minutes() -> i64 {
    480
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: default_secure_cookies(),
            signing_secret: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Loads configuration from an arbitrary `config` source.
    pub fn from_source<T>(source: T) -> Result<Self, config::ConfigError>
    where
        T: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
