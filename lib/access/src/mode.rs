//! Process-wide authentication mode.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects how the middleware resolves a requesting identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Every request is allowed; no identity is resolved.
    None,
    /// Identity comes from claims verified by an upstream subsystem.
    Standard,
    /// Identity comes from the OAuth token cookie.
    #[serde(rename = "oauth")]
    OAuth,
}

impl AuthMode {
    /// Returns the mode as it appears in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::OAuth => "oauth",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "oauth" => Ok(Self::OAuth),
            _ => Err(AccessError::InvalidAuthMode {
                mode: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes_case_insensitively() {
        assert_eq!("none".parse::<AuthMode>(), Ok(AuthMode::None));
        assert_eq!("Standard".parse::<AuthMode>(), Ok(AuthMode::Standard));
        assert_eq!("OAUTH".parse::<AuthMode>(), Ok(AuthMode::OAuth));
        assert_eq!(" oauth ".parse::<AuthMode>(), Ok(AuthMode::OAuth));
    }

    #[test]
    fn unknown_mode_is_invalid() {
        assert_eq!(
            "bogus".parse::<AuthMode>(),
            Err(AccessError::InvalidAuthMode {
                mode: "bogus".to_string()
            })
        );
    }

    #[test]
    fn display_matches_config_spelling() {
        for mode in [AuthMode::None, AuthMode::Standard, AuthMode::OAuth] {
            assert_eq!(mode.to_string().parse::<AuthMode>(), Ok(mode));
        }
        let json = serde_json::to_string(&AuthMode::OAuth).expect("serialize");
        assert_eq!(json, "\"oauth\"");
    }
}
