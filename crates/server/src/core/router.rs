//! Core Router
//!
//! Shared infrastructure routes: auth and uploads. Split into a public
//! router and one that lib.rs places behind the auth middleware.

use crate::core::auth::handlers as auth_handlers;
use crate::core::uploads;
use crate::core::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/uploads/{hash}", get(uploads::get_asset))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/profile", put(auth_handlers::update_profile))
        .route("/uploads", post(uploads::upload_asset))
}
