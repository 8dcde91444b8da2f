//! HTTP rendering of access errors and startup errors.
//!
//! Handlers answer with `{"error": ...}`, the authorization middleware
//! with `{"msg": ...}`. Both use the status from [`status_for`].

use accweb_access::AccessError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Returns the HTTP status an access error is reported with.
#[must_use]
pub fn status_for(error: &AccessError) -> StatusCode {
    match error {
        AccessError::StateMismatch | AccessError::TokenExchange { .. } => StatusCode::BAD_REQUEST,
        AccessError::MissingToken | AccessError::UserInfo { .. } | AccessError::Unauthorized => {
            StatusCode::UNAUTHORIZED
        }
        AccessError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AccessError::InvalidAuthMode { .. }
        | AccessError::UnsupportedProvider { .. }
        | AccessError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An access error on its way out of a handler or the middleware.
#[derive(Debug)]
pub struct Rejection {
    error: AccessError,
    field: &'static str,
}

impl Rejection {
    /// A rejection rendered as `{"error": ...}`.
    #[must_use]
    pub fn handler(error: AccessError) -> Self {
        Self {
            error,
            field: "error",
        }
    }

    /// A rejection rendered as `{"msg": ...}`.
    #[must_use]
    pub fn gate(error: AccessError) -> Self {
        Self { error, field: "msg" }
    }

    #[must_use]
    pub fn error(&self) -> &AccessError {
        &self.error
    }
}

impl From<AccessError> for Rejection {
    fn from(error: AccessError) -> Self {
        Self::handler(error)
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);

        match &self.error {
            AccessError::TokenExchange { reason } => {
                tracing::warn!(reason = %reason, "OAuth code exchange failed");
            }
            AccessError::UserInfo { reason } => {
                tracing::warn!(reason = %reason, "OAuth user-info lookup failed");
            }
            AccessError::StateMismatch => {
                tracing::warn!("OAuth callback state mismatch");
            }
            AccessError::Forbidden { required } => {
                tracing::debug!(required = %required, "request lacks privilege");
            }
            err if status.is_server_error() => {
                tracing::error!(error = %err, "authorization misconfigured");
            }
            _ => {}
        }

        let mut body = serde_json::Map::new();
        body.insert(self.field.to_string(), json!(self.error.to_string()));
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded or is inconsistent.
    Config { details: String },
    /// The OAuth manager could not be built.
    OAuth { details: String },
    /// The listener could not be bound or the server failed.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::OAuth { details } => write!(f, "OAuth setup failed: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}
