//! OAuth routes for login, callback, and logout.

use accweb_access::AccessError;
use axum::{
    Router,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use serde::Deserialize;
use std::sync::Arc;
use time::Duration as TimeDuration;

use super::oauth::{OAuthManager, PendingLogin, TOKEN_COOKIE};
use crate::error::Rejection;

/// Signed cookie carrying the pending login's state and PKCE verifier.
const STATE_COOKIE: &str = "oauth_state";

/// How long a login may take between redirect and callback.
const LOGIN_WINDOW_MINUTES: i64 = 10;

/// State shared by the OAuth routes.
#[derive(Clone)]
pub struct OAuthRoutesState {
    manager: Arc<OAuthManager>,
    key: Key,
}

impl FromRef<OAuthRoutesState> for Arc<OAuthManager> {
    fn from_ref(state: &OAuthRoutesState) -> Self {
        state.manager.clone()
    }
}

impl FromRef<OAuthRoutesState> for Key {
    fn from_ref(state: &OAuthRoutesState) -> Self {
        state.key.clone()
    }
}

/// Builds the `/auth/*` routes for `manager`.
///
/// `key` signs the login state cookie.
pub fn oauth_routes(manager: Arc<OAuthManager>, key: Key) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
        .with_state(OAuthRoutesState { manager, key })
}

/// Query parameters for the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    code: Option<String>,
    /// Set by the provider when the user declines.
    #[serde(default)]
    error: Option<String>,
}

/// Redirects to the provider's authorization page.
pub async fn login(
    State(manager): State<Arc<OAuthManager>>,
    jar: SignedCookieJar,
) -> impl IntoResponse {
    let (auth_url, pending) = manager.begin_login();

    let cookie = Cookie::build((STATE_COOKIE, pending.encode()))
        .path("/")
        .http_only(true)
        .secure(manager.secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(LOGIN_WINDOW_MINUTES));

    tracing::debug!(provider = %manager.provider(), "redirecting to OAuth provider");

    (jar.add(cookie), Redirect::temporary(&auth_url))
}

/// Completes the login: checks `state`, exchanges `code`, stores the token.
///
/// The login state cookie is consumed whatever the outcome.
pub async fn callback(
    State(manager): State<Arc<OAuthManager>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
    state_jar: SignedCookieJar,
) -> Response {
    let pending = state_jar
        .get(STATE_COOKIE)
        .and_then(|c| PendingLogin::decode(c.value()));

    let state_jar = state_jar.remove(Cookie::build((STATE_COOKIE, "")).path("/"));

    match finish_login(&manager, pending, &query).await {
        Ok(token_cookie) => {
            tracing::info!(provider = %manager.provider(), "OAuth login completed");
            (state_jar, jar.add(token_cookie), Redirect::temporary("/")).into_response()
        }
        Err(err) => (state_jar, Rejection::handler(err)).into_response(),
    }
}

async fn finish_login(
    manager: &OAuthManager,
    pending: Option<PendingLogin>,
    query: &CallbackQuery,
) -> Result<Cookie<'static>, AccessError> {
    let pending = pending.ok_or(AccessError::StateMismatch)?;
    pending.verify(query.state.as_deref().unwrap_or_default())?;

    if let Some(error) = &query.error {
        return Err(AccessError::TokenExchange {
            reason: format!("provider returned {error}"),
        });
    }

    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AccessError::TokenExchange {
            reason: "missing authorization code".to_string(),
        })?;

    let token = manager.exchange_code(code, &pending.pkce_verifier).await?;
    Ok(manager.token_cookie(&token, token.issued_at))
}

/// Drops the token cookie.
///
/// POST only; the cookie is removed with the attributes it was set with.
pub async fn logout(
    State(manager): State<Arc<OAuthManager>>,
    jar: CookieJar,
) -> impl IntoResponse {
    let token = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(manager.secure_cookies())
        .same_site(SameSite::Lax);

    tracing::debug!(provider = %manager.provider(), "logging out");

    (jar.remove(token), Redirect::to("/"))
}
