//! Core Service Layer
//!
//! Shared infrastructure for the blog server: authentication, tokens,
//! configuration, error taxonomy, and upload storage.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod error;
pub mod router;
pub mod token;
pub mod uploads;

// Re-exports for convenience
pub use config::{AppState, ServerConfig};
pub use ctx::Ctx;
pub use error::{Error, Result};
