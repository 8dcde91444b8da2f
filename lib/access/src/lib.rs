//! Access control primitives for ACCWeb.
//!
//! This crate provides:
//! - The capability model (`Identity`, `PrivilegeLevel`) and the
//!   authorization decision (`authorize`)
//! - Process-wide auth mode selection (`AuthMode`)
//! - OAuth provider configuration (`Provider`, `ProviderConfig`)
//! - Mapping provider user-info to capability flags (`ProviderProfile`, `RoleMapping`)
//! - Access error types
//!
//! Nothing here performs I/O. The server crate wires these types into
//! axum handlers, the OAuth token exchange and the user-info lookup.
//!
//! # Example
//!
//! ```
//! use accweb_access::{Identity, PrivilegeLevel, Provider, ProviderProfile, RoleMapping, authorize};
//!
//! let mapping = RoleMapping::new(vec!["octocat".to_string()], Vec::new());
//! let profile = ProviderProfile::from_userinfo(
//!     Provider::GitHub,
//!     br#"{"id": 1, "login": "octocat", "email": null}"#,
//! )
//! .expect("valid user-info");
//!
//! let identity = mapping.identity_for(&profile);
//! assert_eq!(identity, Identity::administrator());
//! assert!(authorize(Some(&identity), PrivilegeLevel::Moderator).is_ok());
//! ```

pub mod error;
pub mod identity;
pub mod mode;
pub mod profile;
pub mod provider;
pub mod role;

// Re-export main types at crate root
pub use error::AccessError;
pub use identity::{Identity, PrivilegeLevel, authorize};
pub use mode::AuthMode;
pub use profile::ProviderProfile;
pub use provider::{Provider, ProviderConfig, ProviderConfigBuilder, ProviderEndpoints};
pub use role::RoleMapping;
