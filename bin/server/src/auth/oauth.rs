//! OAuth 2.0 authorization-code flow for a single configured provider.
//!
//! The manager is built once at startup and shared behind `Arc`:
//! - `begin_login` produces the provider redirect plus a fresh CSRF state
//!   and PKCE verifier for the caller to keep until the callback
//! - `exchange_code` trades the authorization code for an access token
//! - `token_cookie` turns that token into the `oauth_token` cookie
//! - `resolve_identity` maps the cookie back to capability flags through
//!   the provider's user-info endpoint

use accweb_access::{AccessError, Identity, Provider, ProviderConfig, ProviderProfile, RoleMapping};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
    basic::{BasicClient, BasicErrorResponse},
    url::Url,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;
use time::Duration as TimeDuration;

/// Cookie holding the raw provider access token.
pub const TOKEN_COOKIE: &str = "oauth_token";

/// Client with authorization and token endpoints set.
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Tunables for the OAuth manager that are not part of the client registration.
#[derive(Debug, Clone)]
pub struct OAuthOptions {
    /// Principals granted moderator/administrator.
    pub roles: RoleMapping,
    /// Timeout for token exchange and user-info requests.
    pub request_timeout: Duration,
    /// Token lifetime assumed when the provider omits `expires_in`.
    pub fallback_token_lifetime: ChronoDuration,
    /// Whether cookies carry the Secure flag.
    pub secure_cookies: bool,
}

impl Default for OAuthOptions {
    fn default() -> Self {
        Self {
            roles: RoleMapping::default(),
            request_timeout: Duration::from_secs(10),
            fallback_token_lifetime: ChronoDuration::minutes(480),
            secure_cookies: true,
        }
    }
}

/// Anti-forgery material for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub csrf_token: String,
    pub pkce_verifier: String,
}

impl PendingLogin {
    /// Cookie-safe form `<state>.<verifier>`.
    ///
    /// Both halves are base64url, so neither contains `.`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}.{}", self.csrf_token, self.pkce_verifier)
    }

    /// Parses the output of [`PendingLogin::encode`].
    #[must_use]
    pub fn decode(value: &str) -> Option<Self> {
        let (csrf_token, pkce_verifier) = value.split_once('.')?;
        if csrf_token.is_empty() || pkce_verifier.is_empty() || pkce_verifier.contains('.') {
            return None;
        }
        Some(Self {
            csrf_token: csrf_token.to_string(),
            pkce_verifier: pkce_verifier.to_string(),
        })
    }

    /// Checks the `state` returned by the provider against this login.
    pub fn verify(&self, returned_state: &str) -> Result<(), AccessError> {
        if returned_state.is_empty() || returned_state != self.csrf_token {
            return Err(AccessError::StateMismatch);
        }
        Ok(())
    }
}

/// Access token obtained from the token endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    /// When the token response was received.
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Mediates the authorization-code flow for one provider.
pub struct OAuthManager {
    config: ProviderConfig,
    client: ConfiguredClient,
    userinfo_url: Url,
    http: reqwest::Client,
    options: OAuthOptions,
}

impl OAuthManager {
    /// Creates a manager for `provider` ("github" or "google", any case)
    /// with default scopes, endpoints and options.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` for any other provider name, or
    /// `Configuration` if the callback URL is invalid.
    pub fn new(
        provider: &str,
        client_id: &str,
        client_secret: &str,
        callback_url: &str,
    ) -> Result<Self, AccessError> {
        let provider: Provider = provider.parse()?;
        let config = ProviderConfig::new(
            provider,
            client_id.to_string(),
            client_secret.to_string(),
            callback_url.to_string(),
        );
        Self::from_config(config, OAuthOptions::default())
    }

    /// Creates a manager from a full provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if any URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: ProviderConfig, options: OAuthOptions) -> Result<Self, AccessError> {
        let invalid = |what: &str, e: oauth2::url::ParseError| AccessError::Configuration {
            reason: format!("invalid {what}: {e}"),
        };

        let endpoints = config.endpoints();
        let auth_url =
            AuthUrl::new(endpoints.auth_url.clone()).map_err(|e| invalid("authorization URL", e))?;
        let token_url =
            TokenUrl::new(endpoints.token_url.clone()).map_err(|e| invalid("token URL", e))?;
        let userinfo_url =
            Url::parse(&endpoints.userinfo_url).map_err(|e| invalid("user-info URL", e))?;
        let redirect_url = RedirectUrl::new(config.redirect_url().to_string())
            .map_err(|e| invalid("callback URL", e))?;

        let client = BasicClient::new(ClientId::new(config.client_id().to_string()))
            .set_client_secret(ClientSecret::new(config.client_secret().to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        // Token and user-info requests must not follow redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| AccessError::Configuration {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            client,
            userinfo_url,
            http,
            options,
        })
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.config.provider()
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.options.secure_cookies
    }

    /// Generates the provider authorization URL for a new login.
    ///
    /// The returned `PendingLogin` must be kept by the caller (bound to the
    /// browser session) and checked on callback.
    pub fn begin_login(&self) -> (String, PendingLogin) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes().iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let pending = PendingLogin {
            csrf_token: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };

        (auth_url.to_string(), pending)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `TokenExchange` with the provider's reason on any failure.
    #[tracing::instrument(skip_all, fields(provider = %self.config.provider()))]
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<IssuedToken, AccessError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AccessError::TokenExchange {
                reason: token_error_reason(&e),
            })?;

        let issued_at = Utc::now();
        let fallback = self.options.fallback_token_lifetime;
        let expires_at = token
            .expires_in()
            .and_then(|d| ChronoDuration::from_std(d).ok())
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .or_else(|| issued_at.checked_add_signed(fallback))
            .ok_or_else(|| AccessError::Configuration {
                reason: "fallback token lifetime is out of range".to_string(),
            })?;

        tracing::debug!(
            expires_in_seconds = (expires_at - issued_at).num_seconds(),
            "exchanged authorization code"
        );

        Ok(IssuedToken {
            access_token: token.access_token().secret().clone(),
            issued_at,
            expires_at,
        })
    }

    /// Builds the `oauth_token` cookie for `token`, expiring with it.
    #[must_use]
    pub fn token_cookie(&self, token: &IssuedToken, now: DateTime<Utc>) -> Cookie<'static> {
        Cookie::build((TOKEN_COOKIE, token.access_token.clone()))
            .path("/")
            .http_only(true)
            .secure(self.options.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(cookie_max_age(token.expires_at, now))
            .build()
    }

    /// Resolves capability flags from the `oauth_token` cookie.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` if the cookie is absent, or `UserInfo` if the
    /// provider does not accept the token.
    pub async fn resolve_identity(&self, jar: &CookieJar) -> Result<Identity, AccessError> {
        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .ok_or(AccessError::MissingToken)?;

        let profile = self.fetch_profile(token).await?;
        let identity = self.options.roles.identity_for(&profile);

        tracing::debug!(
            provider = %self.config.provider(),
            subject = %profile.subject,
            moderator = identity.moderator,
            administrator = identity.administrator,
            "resolved identity from OAuth token"
        );

        Ok(identity)
    }

    /// Fetches the user-info document for `access_token`.
    #[tracing::instrument(skip_all, fields(provider = %self.config.provider()))]
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, AccessError> {
        let failed = |reason: String| AccessError::UserInfo { reason };

        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("accweb/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("user-info endpoint returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| failed(format!("failed to read response: {e}")))?;

        ProviderProfile::from_userinfo(self.config.provider(), &body)
    }
}

/// Describes a failed token request using the provider's own error where possible.
///
/// Some providers (GitHub) report a rejected code with a 200 status, which
/// `oauth2` surfaces as a parse failure carrying the raw body.
fn token_error_reason<RE, T>(err: &RequestTokenError<RE, T>) -> String
where
    RE: std::error::Error + 'static,
    T: oauth2::ErrorResponse + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Parse(_, body) => {
            match serde_json::from_slice::<BasicErrorResponse>(body) {
                Ok(response) => response.to_string(),
                Err(_) => String::from_utf8_lossy(body).into_owned(),
            }
        }
        other => other.to_string(),
    }
}

/// Seconds from `now` until `expires_at`, floored at zero.
#[must_use]
pub fn cookie_max_age(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> TimeDuration {
    TimeDuration::seconds((expires_at - now).num_seconds().max(0))
}

/// A manager whose endpoints all point at `base_url` (a mock provider).
#[cfg(test)]
pub(crate) fn test_manager(base_url: &str, roles: RoleMapping) -> OAuthManager {
    use accweb_access::ProviderEndpoints;

    let config = ProviderConfig::builder(
        Provider::GitHub,
        "accweb-client".to_string(),
        "accweb-secret".to_string(),
        "https://accweb.example.com/auth/callback".to_string(),
    )
    .endpoints(ProviderEndpoints {
        auth_url: format!("{base_url}/login/oauth/authorize"),
        token_url: format!("{base_url}/login/oauth/access_token"),
        userinfo_url: format!("{base_url}/user"),
    })
    .build();

    let options = OAuthOptions {
        roles,
        ..OAuthOptions::default()
    };

    OAuthManager::from_config(config, options).expect("valid test manager")
}
