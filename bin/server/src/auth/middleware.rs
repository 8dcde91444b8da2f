//! Role-gated authorization middleware for Axum.
//!
//! An [`AuthGate`] is built once from the configured auth mode. Routes are
//! protected with
//!
//! ```ignore
//! router.route_layer(axum::middleware::from_fn_with_state(
//!     gate.require(PrivilegeLevel::Moderator),
//!     enforce,
//! ))
//! ```
//!
//! On success the resolved [`Identity`] (if any) is inserted into the
//! request extensions.

use accweb_access::{AccessError, AuthMode, Identity, PrivilegeLevel, authorize};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use super::oauth::OAuthManager;
use crate::error::Rejection;

/// Resolves the identity presenting a request.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns `Ok(None)` when the request carries no identity.
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AccessError>;
}

type ClaimsFn = dyn Fn(&Parts) -> Option<Identity> + Send + Sync;

/// Standard mode: identity from claims verified by an upstream subsystem.
#[derive(Clone)]
pub struct ClaimsResolver {
    extract: Arc<ClaimsFn>,
}

impl ClaimsResolver {
    /// Wraps the claims-extraction function of the upstream auth subsystem.
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&Parts) -> Option<Identity> + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
        }
    }

    /// Reads the `Identity` an upstream layer placed in request extensions.
    #[must_use]
    pub fn from_extensions() -> Self {
        Self::new(|parts| parts.extensions.get::<Identity>().copied())
    }
}

#[async_trait]
impl IdentityResolver for ClaimsResolver {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AccessError> {
        Ok((self.extract)(parts))
    }
}

/// OAuth mode: identity from the `oauth_token` cookie.
#[async_trait]
impl IdentityResolver for OAuthManager {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, AccessError> {
        let jar = CookieJar::from_headers(&parts.headers);
        self.resolve_identity(&jar).await.map(Some)
    }
}

#[derive(Clone)]
enum Strategy {
    Open,
    Claims(ClaimsResolver),
    OAuthCookie(Arc<OAuthManager>),
    Invalid { mode: String },
}

/// Authorization gate for the configured auth mode.
#[derive(Clone)]
pub struct AuthGate {
    strategy: Strategy,
}

impl AuthGate {
    /// Builds the gate for a configured mode string.
    ///
    /// An unrecognised mode, or `oauth` without an OAuth manager, yields a
    /// gate that rejects every request with 500.
    pub fn new(mode: &str, claims: ClaimsResolver, oauth: Option<Arc<OAuthManager>>) -> Self {
        let strategy = match mode.parse::<AuthMode>() {
            Ok(AuthMode::None) => Strategy::Open,
            Ok(AuthMode::Standard) => Strategy::Claims(claims),
            Ok(AuthMode::OAuth) => match oauth {
                Some(manager) => Strategy::OAuthCookie(manager),
                None => {
                    tracing::error!("auth mode is oauth but no OAuth provider is configured");
                    Strategy::Invalid {
                        mode: mode.to_string(),
                    }
                }
            },
            Err(_) => {
                tracing::error!(mode = %mode, "unrecognised auth mode; gated routes will fail");
                Strategy::Invalid {
                    mode: mode.to_string(),
                }
            }
        };

        Self { strategy }
    }

    /// A gate that allows every request.
    #[must_use]
    pub fn open() -> Self {
        Self {
            strategy: Strategy::Open,
        }
    }

    /// A gate resolving identities from upstream claims.
    #[must_use]
    pub fn standard(claims: ClaimsResolver) -> Self {
        Self {
            strategy: Strategy::Claims(claims),
        }
    }

    /// A gate resolving identities from the OAuth token cookie.
    #[must_use]
    pub fn oauth(manager: Arc<OAuthManager>) -> Self {
        Self {
            strategy: Strategy::OAuthCookie(manager),
        }
    }

    /// Returns the effective mode, or `None` if the gate is misconfigured.
    #[must_use]
    pub fn mode(&self) -> Option<AuthMode> {
        match &self.strategy {
            Strategy::Open => Some(AuthMode::None),
            Strategy::Claims(_) => Some(AuthMode::Standard),
            Strategy::OAuthCookie(_) => Some(AuthMode::OAuth),
            Strategy::Invalid { .. } => None,
        }
    }

    /// Decides whether the request described by `parts` may proceed at `level`.
    ///
    /// Returns the resolved identity, or `None` when the mode skips resolution.
    pub async fn check(
        &self,
        parts: &Parts,
        level: PrivilegeLevel,
    ) -> Result<Option<Identity>, AccessError> {
        let resolver: &dyn IdentityResolver = match &self.strategy {
            Strategy::Open => return Ok(None),
            Strategy::Claims(claims) => claims,
            Strategy::OAuthCookie(manager) => manager.as_ref(),
            Strategy::Invalid { mode } => {
                return Err(AccessError::InvalidAuthMode { mode: mode.clone() });
            }
        };

        let identity = resolver.resolve(parts).await?;
        authorize(identity.as_ref(), level)?;
        Ok(identity)
    }

    /// Middleware state requiring `level` on every request.
    #[must_use]
    pub fn require(&self, level: PrivilegeLevel) -> RequireLevel {
        RequireLevel {
            gate: self.clone(),
            level,
        }
    }
}

/// State for [`enforce`]: a gate and the level it demands.
#[derive(Clone)]
pub struct RequireLevel {
    gate: AuthGate,
    level: PrivilegeLevel,
}

/// Middleware function enforcing a [`RequireLevel`].
pub async fn enforce(State(guard): State<RequireLevel>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    match guard.gate.check(&parts, guard.level).await {
        Ok(identity) => {
            if let Some(identity) = identity {
                parts.extensions.insert(identity);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => {
            tracing::debug!(
                path = %parts.uri.path(),
                level = %guard.level,
                error = %err,
                "request rejected"
            );
            Rejection::gate(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::test_manager;
    use accweb_access::RoleMapping;
    use axum::{
        Json, Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header::COOKIE},
        middleware,
        routing::get,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    async fn whoami(request: Request) -> Json<Value> {
        Json(json!({ "identity": request.extensions().get::<Identity>() }))
    }

    fn app(gate: AuthGate) -> Router {
        let moderator = Router::new()
            .route("/moderate", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                gate.require(PrivilegeLevel::Moderator),
                enforce,
            ));
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                gate.require(PrivilegeLevel::Administrator),
                enforce,
            ));
        moderator.merge(admin)
    }

    fn request(uri: &str, identity: Option<Identity>, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let mut request = builder.body(Body::empty()).expect("request");
        if let Some(identity) = identity {
            request.extensions_mut().insert(identity);
        }
        request
    }

    async fn call(app: &Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn standard_gate() -> AuthGate {
        AuthGate::new("standard", ClaimsResolver::from_extensions(), None)
    }

    #[tokio::test]
    async fn none_mode_allows_everything() {
        let app = app(AuthGate::new("none", ClaimsResolver::from_extensions(), None));

        for uri in ["/moderate", "/admin"] {
            for identity in [None, Some(Identity::none()), Some(Identity::moderator())] {
                let (status, _) = call(&app, request(uri, identity, None)).await;
                assert_eq!(status, StatusCode::OK);
            }
        }
    }

    #[tokio::test]
    async fn administrator_passes_both_levels() {
        let app = app(standard_gate());

        for uri in ["/moderate", "/admin"] {
            let (status, body) = call(&app, request(uri, Some(Identity::administrator()), None)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["identity"]["administrator"], json!(true));
        }
    }

    #[tokio::test]
    async fn moderator_is_forbidden_from_admin_routes() {
        let app = app(standard_gate());

        let (status, _) = call(&app, request("/moderate", Some(Identity::moderator()), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, request("/admin", Some(Identity::moderator()), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "msg": "access denied" }));
    }

    #[tokio::test]
    async fn identity_without_capabilities_is_forbidden() {
        let app = app(standard_gate());

        for uri in ["/moderate", "/admin"] {
            let (status, _) = call(&app, request(uri, Some(Identity::none()), None)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn missing_claims_are_unauthorized() {
        let app = app(standard_gate());

        let (status, body) = call(&app, request("/moderate", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "msg": "unauthorized" }));
    }

    #[tokio::test]
    async fn custom_claims_function_is_used() {
        let claims = ClaimsResolver::new(|parts: &Parts| {
            parts
                .headers
                .contains_key("x-upstream-admin")
                .then(Identity::administrator)
        });
        let app = app(AuthGate::standard(claims));

        let admin_request = HttpRequest::builder()
            .uri("/admin")
            .header("x-upstream-admin", "1")
            .body(Body::empty())
            .expect("request");
        let (status, _) = call(&app, admin_request).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, request("/admin", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bogus_mode_is_a_server_error() {
        let gate = AuthGate::new("bogus", ClaimsResolver::from_extensions(), None);
        assert_eq!(gate.mode(), None);
        let app = app(gate);

        let (status, body) = call(&app, request("/moderate", Some(Identity::administrator()), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "msg": "invalid authentication mode: bogus" }));
    }

    #[tokio::test]
    async fn oauth_mode_without_manager_is_a_server_error() {
        let app = app(AuthGate::new("oauth", ClaimsResolver::from_extensions(), None));

        let (status, _) = call(&app, request("/moderate", None, Some("oauth_token=gho_token"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oauth_mode_without_cookie_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let manager = Arc::new(test_manager(&server.uri(), RoleMapping::default()));
        let app = app(AuthGate::new(
            "OAuth",
            ClaimsResolver::from_extensions(),
            Some(manager),
        ));

        let (status, body) = call(&app, request("/moderate", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "msg": "missing OAuth token" }));
    }

    #[tokio::test]
    async fn oauth_mode_maps_user_info_to_capabilities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "login": "racecontrol",
                "email": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_driver"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8,
                "login": "driver",
                "email": null
            })))
            .mount(&server)
            .await;

        let roles = RoleMapping::from_csv("racecontrol", "");
        let manager = Arc::new(test_manager(&server.uri(), roles));
        let app = app(AuthGate::oauth(manager));

        let (status, body) = call(&app, request("/admin", None, Some("oauth_token=gho_admin"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "identity": { "moderator": false, "administrator": true } })
        );

        let (status, _) = call(&app, request("/moderate", None, Some("oauth_token=gho_driver"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn oauth_mode_rejected_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let manager = Arc::new(test_manager(&server.uri(), RoleMapping::default()));
        let app = app(AuthGate::oauth(manager));

        let (status, body) = call(&app, request("/moderate", None, Some("oauth_token=revoked"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(
            body["msg"]
                .as_str()
                .expect("msg field")
                .starts_with("user-info lookup failed")
        );
    }
}
