//! Error types for the access crate.
//!
//! A single `AccessError` covers manager construction, identity
//! resolution and the authorization decision. The server crate maps each
//! variant to an HTTP status at the handler and middleware boundary.

use crate::identity::PrivilegeLevel;
use std::fmt;

/// Errors from OAuth manager construction, identity resolution and
/// privilege checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The provider name is not one of the supported providers.
    UnsupportedProvider { provider: String },
    /// A provider endpoint, callback URL or secret is unusable.
    Configuration { reason: String },
    /// The request carries no OAuth token cookie.
    MissingToken,
    /// The configured auth mode is not recognised or cannot be served.
    InvalidAuthMode { mode: String },
    /// The callback `state` does not match the pending login.
    StateMismatch,
    /// The provider rejected the authorization code.
    TokenExchange { reason: String },
    /// The provider's user-info endpoint could not map the token to a user.
    UserInfo { reason: String },
    /// No identity could be resolved for the request.
    Unauthorized,
    /// The identity lacks the required privilege.
    Forbidden { required: PrivilegeLevel },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProvider { provider } => {
                write!(f, "unsupported OAuth provider: {provider}")
            }
            Self::Configuration { reason } => {
                write!(f, "invalid OAuth configuration: {reason}")
            }
            Self::MissingToken => write!(f, "missing OAuth token"),
            Self::InvalidAuthMode { mode } => {
                write!(f, "invalid authentication mode: {mode}")
            }
            Self::StateMismatch => write!(f, "invalid oauth state"),
            Self::TokenExchange { reason } => {
                write!(f, "code exchange failed: {reason}")
            }
            Self::UserInfo { reason } => {
                write!(f, "user-info lookup failed: {reason}")
            }
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden { .. } => write!(f, "access denied"),
        }
    }
}

impl std::error::Error for AccessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_provider_names_the_provider() {
        let err = AccessError::UnsupportedProvider {
            provider: "gitlab".to_string(),
        };
        assert!(err.to_string().contains("unsupported OAuth provider"));
        assert!(err.to_string().contains("gitlab"));
    }

    #[test]
    fn token_exchange_carries_upstream_reason() {
        let err = AccessError::TokenExchange {
            reason: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "code exchange failed: invalid_grant");
    }

    #[test]
    fn invalid_auth_mode_names_the_mode() {
        let err = AccessError::InvalidAuthMode {
            mode: "bogus".to_string(),
        };
        assert!(err.to_string().contains("invalid authentication mode"));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn forbidden_does_not_leak_required_level() {
        let err = AccessError::Forbidden {
            required: PrivilegeLevel::Administrator,
        };
        assert_eq!(err.to_string(), "access denied");
    }

    #[test]
    fn missing_token_display() {
        assert_eq!(AccessError::MissingToken.to_string(), "missing OAuth token");
    }
}
