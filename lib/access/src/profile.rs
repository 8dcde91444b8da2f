//! User-info payloads returned by OAuth providers.
//!
//! Only the fields needed for role mapping are kept.

use crate::error::AccessError;
use crate::provider::Provider;
use serde::Deserialize;

/// The parts of a provider's user-info response used for role mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Stable provider-side identifier.
    pub subject: String,
    /// Account login (GitHub only).
    pub login: Option<String>,
    /// Email address, if the provider disclosed one.
    pub email: Option<String>,
    /// Whether the provider vouches for the email address.
    pub email_verified: bool,
}

#[derive(Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct GoogleUser {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

impl ProviderProfile {
    /// Parses a raw user-info response body for `provider`.
    ///
    /// GitHub only exposes a verified primary email on `/user`, so a
    /// GitHub email is treated as verified.
    pub fn from_userinfo(provider: Provider, body: &[u8]) -> Result<Self, AccessError> {
        let malformed = |e: serde_json::Error| AccessError::UserInfo {
            reason: format!("malformed {provider} user-info: {e}"),
        };

        match provider {
            Provider::GitHub => {
                let user: GitHubUser = serde_json::from_slice(body).map_err(malformed)?;
                Ok(Self {
                    subject: user.id.to_string(),
                    login: Some(user.login),
                    email_verified: user.email.is_some(),
                    email: user.email,
                })
            }
            Provider::Google => {
                let user: GoogleUser = serde_json::from_slice(body).map_err(malformed)?;
                Ok(Self {
                    subject: user.sub,
                    login: None,
                    email: user.email,
                    email_verified: user.email_verified,
                })
            }
        }
    }

    /// Returns the principals this profile can be matched by: the login
    /// and, when verified, the email.
    pub fn principals(&self) -> impl Iterator<Item = &str> {
        let email = self.email.as_deref().filter(|_| self.email_verified);
        self.login.as_deref().into_iter().chain(email)
    }
}
