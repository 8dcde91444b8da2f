//! Mapping provider profiles to capability flags.
//!
//! Capabilities are granted by listing principals (a GitHub login or a
//! verified email) as administrators or moderators. Matching is
//! case-insensitive. Anyone not listed resolves to an identity with no
//! capabilities.

use crate::identity::Identity;
use crate::profile::ProviderProfile;
use serde::{Deserialize, Serialize};

/// Principals granted each capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    administrators: Vec<String>,
    moderators: Vec<String>,
}

impl RoleMapping {
    /// Creates a mapping from explicit principal lists.
    #[must_use]
    pub fn new(administrators: Vec<String>, moderators: Vec<String>) -> Self {
        Self {
            administrators: normalize(administrators),
            moderators: normalize(moderators),
        }
    }

    /// Creates a mapping from comma-separated principal lists.
    #[must_use]
    pub fn from_csv(administrators: &str, moderators: &str) -> Self {
        let split = |list: &str| -> Vec<String> { list.split(',').map(str::to_string).collect() };
        Self::new(split(administrators), split(moderators))
    }

    /// Derives the capability flags for `profile`.
    #[must_use]
    pub fn identity_for(&self, profile: &ProviderProfile) -> Identity {
        let listed = |list: &[String]| {
            profile
                .principals()
                .any(|p| list.iter().any(|entry| entry.eq_ignore_ascii_case(p)))
        };

        Identity {
            moderator: listed(&self.moderators),
            administrator: listed(&self.administrators),
        }
    }

    #[must_use]
    pub fn administrators(&self) -> &[String] {
        &self.administrators
    }

    #[must_use]
    pub fn moderators(&self) -> &[String] {
        &self.moderators
    }
}

fn normalize(principals: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(principals.len());
    for principal in principals {
        let principal = principal.trim();
        if principal.is_empty() || out.iter().any(|p| p.eq_ignore_ascii_case(principal)) {
            continue;
        }
        out.push(principal.to_string());
    }
    out
}
