//! Capability flags and the privilege check.
//!
//! An `Identity` is built fresh for every request, either from upstream
//! claims or from the OAuth token cookie, and is never persisted.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capabilities presented by the requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// May perform moderator operations.
    pub moderator: bool,
    /// May perform every operation. Implies moderator access.
    pub administrator: bool,
}

impl Identity {
    /// An identity with no capabilities.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            moderator: false,
            administrator: false,
        }
    }

    /// An identity with moderator capability only.
    #[must_use]
    pub const fn moderator() -> Self {
        Self {
            moderator: true,
            administrator: false,
        }
    }

    /// An identity with administrator capability.
    #[must_use]
    pub const fn administrator() -> Self {
        Self {
            moderator: false,
            administrator: true,
        }
    }

    /// Returns true if this identity meets `level`.
    #[must_use]
    pub fn satisfies(&self, level: PrivilegeLevel) -> bool {
        match level {
            PrivilegeLevel::Moderator => self.moderator || self.administrator,
            PrivilegeLevel::Administrator => self.administrator,
        }
    }
}

/// Minimum capability a request must present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    Moderator,
    Administrator,
}

impl PrivilegeLevel {
    /// Returns the level as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderator => "moderator",
            Self::Administrator => "administrator",
        }
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a resolved identity may proceed at `required`.
///
/// An absent identity is `Unauthorized`; a present one without the
/// capability is `Forbidden`.
pub fn authorize(identity: Option<&Identity>, required: PrivilegeLevel) -> Result<(), AccessError> {
    let identity = identity.ok_or(AccessError::Unauthorized)?;

    if !identity.satisfies(required) {
        return Err(AccessError::Forbidden { required });
    }

    Ok(())
}
