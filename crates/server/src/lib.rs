//! Blog Server Library
//!
//! HTTP surface, JWT auth gate, SQLite-backed content stores, and the
//! realtime hub that fans new-comment events out to WebSocket subscribers.

pub mod blog;
pub mod comment;
pub mod core;
pub mod realtime;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::blog::BlogStore;
use crate::comment::CommentStore;
use crate::core::auth::middleware::mw_require_auth;
use crate::core::auth::UserStore;
use crate::core::token::TokenService;
use crate::core::uploads::AssetStore;
use crate::core::{AppState, ServerConfig};
use crate::realtime::RealtimeHub;

/// Construct stores, token service, and hub for the given config.
pub async fn build_state(config: ServerConfig) -> anyhow::Result<AppState> {
    config.ensure_dirs().await?;

    let users = Arc::new(UserStore::new(&config.data_dir).await?);
    let blogs = Arc::new(BlogStore::new(&config.data_dir).await?);
    let comments = Arc::new(CommentStore::new(&config.data_dir).await?);
    let assets = Arc::new(AssetStore::new(&config.data_dir).await?);
    let tokens = Arc::new(TokenService::new(&config.jwt_secret));
    let hub = Arc::new(RealtimeHub::new());

    Ok(AppState {
        config,
        users,
        blogs,
        comments,
        assets,
        tokens,
        hub,
    })
}

/// Assemble the full router: public routes, protected routes behind the
/// auth gate, the subscription socket, and the tower-http layers.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(crate::core::router::protected_router())
        .merge(crate::blog::handlers::protected_router())
        .merge(crate::comment::handlers::protected_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_auth,
        ));

    Router::new()
        .merge(crate::core::router::public_router())
        .merge(crate::blog::handlers::public_router())
        .merge(crate::comment::handlers::public_router())
        .merge(protected)
        .route("/ws", get(crate::realtime::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_size * 1024 * 1024,
        ))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Blog Server ===");
    info!("Features: Auth | Blog CRUD | Comments | Realtime broadcast");

    // Get BLOG_ROOT from environment or default
    let blog_root = std::env::var("BLOG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("blog_data"));

    let config = ServerConfig::with_base_dir(&blog_root);
    let port = config.port;

    info!("Data directory: {:?}", config.data_dir);
    info!("Uploads directory: {:?}", config.uploads_dir);

    let state = build_state(config).await?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Blog server listening on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK - Blog Server"
}
