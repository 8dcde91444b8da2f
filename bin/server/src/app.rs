//! Router assembly and startup wiring.

use accweb_access::{AccessError, Identity, PrivilegeLevel, Provider, ProviderConfig, RoleMapping};
use axum::{
    Json, Router,
    extract::Request,
    middleware::from_fn_with_state,
    routing::get,
};
use axum_extra::extract::cookie::Key;
use chrono::Duration as ChronoDuration;
use rootcause::prelude::Report;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthGate, ClaimsResolver, OAuthManager, OAuthOptions, enforce, oauth_routes};
use crate::config::{CookieSettings, OAuthSettings, ServerConfig};
use crate::error::StartupError;

/// Builds the application router from configuration.
///
/// # Errors
///
/// Returns an error if the OAuth section or the cookie signing secret is invalid.
pub fn from_config(config: &ServerConfig) -> Result<Router, Report<StartupError>> {
    let oauth = match &config.oauth {
        Some(settings) => {
            let manager = build_oauth_manager(settings, &config.cookies).map_err(|e| {
                StartupError::OAuth {
                    details: e.to_string(),
                }
            })?;
            tracing::info!(provider = %manager.provider(), "OAuth login enabled");
            Some(Arc::new(manager))
        }
        None => None,
    };

    let key = signing_key(&config.cookies)?;
    let gate = AuthGate::new(&config.auth.mode, ClaimsResolver::from_extensions(), oauth.clone());

    tracing::info!(mode = %config.auth.mode, "authorization configured");

    Ok(router(gate, oauth, key))
}

/// Builds an `OAuthManager` from its configuration section.
///
/// # Errors
///
/// Returns `UnsupportedProvider` for an unknown provider, or
/// `Configuration` for a zero timeout, a non-positive or out-of-range
/// fallback lifetime, or an invalid URL.
pub fn build_oauth_manager(
    settings: &OAuthSettings,
    cookies: &CookieSettings,
) -> Result<OAuthManager, AccessError> {
    let provider: Provider = settings.provider.parse()?;

    let config = ProviderConfig::builder(
        provider,
        settings.client_id.clone(),
        settings.client_secret.clone(),
        settings.callback_url.clone(),
    )
    .scopes_csv(&settings.scopes)
    .build();

    if settings.request_timeout_seconds == 0 {
        return Err(AccessError::Configuration {
            reason: "request timeout must be at least one second".to_string(),
        });
    }

    let fallback_token_lifetime =
        ChronoDuration::try_minutes(settings.fallback_token_lifetime_minutes)
            .filter(|lifetime| *lifetime > ChronoDuration::zero())
            .ok_or_else(|| AccessError::Configuration {
                reason: format!(
                    "fallback token lifetime must be a positive number of minutes, got {}",
                    settings.fallback_token_lifetime_minutes
                ),
            })?;

    let options = OAuthOptions {
        roles: RoleMapping::from_csv(&settings.admins, &settings.moderators),
        request_timeout: Duration::from_secs(settings.request_timeout_seconds),
        fallback_token_lifetime,
        secure_cookies: cookies.secure,
    };

    OAuthManager::from_config(config, options)
}

fn signing_key(cookies: &CookieSettings) -> Result<Key, StartupError> {
    match &cookies.signing_secret {
        Some(secret) => Key::try_from(secret.as_bytes()).map_err(|e| StartupError::Config {
            details: format!("cookie signing secret: {e}"),
        }),
        None => {
            tracing::warn!(
                "no cookie signing secret configured; logins in progress will not survive a restart"
            );
            Ok(Key::generate())
        }
    }
}

/// Assembles the router: gated API routes plus the OAuth routes when configured.
pub fn router(gate: AuthGate, oauth: Option<Arc<OAuthManager>>, key: Key) -> Router {
    let moderator = Router::new()
        .route("/api/session", get(session))
        .route_layer(from_fn_with_state(
            gate.require(PrivilegeLevel::Moderator),
            enforce,
        ));

    let administrator = Router::new()
        .route("/api/admin/session", get(session))
        .route_layer(from_fn_with_state(
            gate.require(PrivilegeLevel::Administrator),
            enforce,
        ));

    let mut app = Router::new().merge(moderator).merge(administrator);
    if let Some(manager) = oauth {
        app = app.merge(oauth_routes(manager, key));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Reports the capability flags the gate resolved for this request.
async fn session(request: Request) -> Json<Value> {
    let identity = request.extensions().get::<Identity>().copied();
    Json(json!({ "identity": identity }))
}
