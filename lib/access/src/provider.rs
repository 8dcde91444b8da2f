//! OAuth provider selection and client configuration.
//!
//! A `ProviderConfig` is built once at startup from the provider name and
//! the registered client credentials, and is read-only afterwards.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "github")]
    GitHub,
    Google,
}

impl Provider {
    /// Returns the provider name as used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
        }
    }

    /// Returns the public endpoints of this provider.
    #[must_use]
    pub fn endpoints(&self) -> ProviderEndpoints {
        match self {
            Self::GitHub => ProviderEndpoints {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
            },
            Self::Google => ProviderEndpoints {
                auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            },
        }
    }

    /// Returns the scopes requested when none are configured.
    #[must_use]
    pub fn default_scopes(&self) -> Vec<String> {
        let scopes: &[&str] = match self {
            Self::GitHub => &["read:user", "user:email"],
            Self::Google => &["openid", "email", "profile"],
        };
        scopes.iter().map(|s| (*s).to_string()).collect()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "google" => Ok(Self::Google),
            _ => Err(AccessError::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// Authorization, token and user-info URLs of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// OAuth client configuration for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    provider: Provider,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    endpoints: ProviderEndpoints,
}

impl ProviderConfig {
    /// Creates a configuration with the provider's default scopes and endpoints.
    #[must_use]
    pub fn new(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self::builder(provider, client_id, client_secret, redirect_url).build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(provider, client_id, client_secret, redirect_url)
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }
}

/// Builder for `ProviderConfig`.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    provider: Provider,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    endpoints: ProviderEndpoints,
}

impl ProviderConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        provider: Provider,
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> Self {
        Self {
            provider,
            client_id,
            client_secret,
            redirect_url,
            scopes: provider.default_scopes(),
            endpoints: provider.endpoints(),
        }
    }

    /// Replaces the requested scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Replaces the scopes from a comma-separated list.
    ///
    /// Blank entries are dropped; an all-blank list keeps the current scopes.
    #[must_use]
    pub fn scopes_csv(self, scopes: &str) -> Self {
        let parsed: Vec<String> = scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if parsed.is_empty() {
            self
        } else {
            self.scopes(parsed)
        }
    }

    /// Overrides the provider endpoints (e.g. GitHub Enterprise).
    #[must_use]
    pub fn endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn build(self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider,
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_url: self.redirect_url,
            scopes: self.scopes,
            endpoints: self.endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse_case_insensitively() {
        assert_eq!("github".parse::<Provider>(), Ok(Provider::GitHub));
        assert_eq!("GitHub".parse::<Provider>(), Ok(Provider::GitHub));
        assert_eq!("GOOGLE".parse::<Provider>(), Ok(Provider::Google));
    }

    #[test]
    fn other_provider_names_are_unsupported() {
        for name in ["gitlab", "", "git hub", "googl", "facebook", " github"] {
            assert_eq!(
                name.parse::<Provider>(),
                Err(AccessError::UnsupportedProvider {
                    provider: name.to_string()
                }),
                "{name:?} should be unsupported"
            );
        }
    }

    #[test]
    fn provider_serializes_as_its_configured_name() {
        assert_eq!(serde_json::to_string(&Provider::GitHub).ok().as_deref(), Some("\"github\""));
        assert_eq!(
            serde_json::from_str::<Provider>("\"google\"").ok(),
            Some(Provider::Google)
        );
    }

    #[test]
    fn new_config_uses_provider_defaults() {
        let config = ProviderConfig::new(
            Provider::GitHub,
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://accweb.example.com/auth/callback".to_string(),
        );

        assert_eq!(config.provider(), Provider::GitHub);
        assert_eq!(config.client_id(), "client-id");
        assert_eq!(config.client_secret(), "client-secret");
        assert_eq!(config.redirect_url(), "https://accweb.example.com/auth/callback");
        assert_eq!(config.scopes(), &["read:user", "user:email"]);
        assert_eq!(config.endpoints(), &Provider::GitHub.endpoints());
    }

    #[test]
    fn builder_overrides_scopes_and_endpoints() {
        let endpoints = ProviderEndpoints {
            auth_url: "https://ghe.example.com/login/oauth/authorize".to_string(),
            token_url: "https://ghe.example.com/login/oauth/access_token".to_string(),
            userinfo_url: "https://ghe.example.com/api/v3/user".to_string(),
        };
        let config = ProviderConfig::builder(
            Provider::GitHub,
            "id".to_string(),
            "secret".to_string(),
            "https://accweb.example.com/auth/callback".to_string(),
        )
        .scopes_csv("read:user, read:org")
        .endpoints(endpoints.clone())
        .build();

        assert_eq!(config.scopes(), &["read:user", "read:org"]);
        assert_eq!(config.endpoints(), &endpoints);
    }

    #[test]
    fn blank_scope_list_keeps_defaults() {
        let config = ProviderConfig::builder(
            Provider::Google,
            "id".to_string(),
            "secret".to_string(),
            "https://accweb.example.com/auth/callback".to_string(),
        )
        .scopes_csv(" , ")
        .build();

        assert_eq!(config.scopes(), &["openid", "email", "profile"]);
    }
}
