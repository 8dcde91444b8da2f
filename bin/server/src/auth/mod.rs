//! Authentication and authorization for the ACCWeb server.
//!
//! This module provides:
//! - The OAuth authorization-code flow against GitHub or Google
//!   (`OAuthManager`, `/auth/login`, `/auth/callback`, `/auth/logout`)
//! - The role-gated authorization middleware (`AuthGate`, `enforce`)
//!
//! # Authorization Model
//!
//! Every protected route declares a minimum `PrivilegeLevel`. The gate
//! resolves the caller's capability flags according to the process-wide
//! auth mode:
//! - `none`: no resolution, everything is allowed
//! - `standard`: flags come from claims verified by an upstream layer
//! - `oauth`: flags come from the provider's user-info for the token cookie
//!
//! Administrator satisfies every moderator check.

pub mod middleware;
pub mod oauth;
pub mod routes;

pub use middleware::{AuthGate, ClaimsResolver, IdentityResolver, RequireLevel, enforce};
pub use oauth::{OAuthManager, OAuthOptions, PendingLogin, TOKEN_COOKIE};
pub use routes::{callback, login, logout, oauth_routes};
