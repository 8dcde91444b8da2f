//! ACCWeb access-control server.
//!
//! OAuth login against GitHub or Google and role-gated request
//! authorization, built on axum.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
