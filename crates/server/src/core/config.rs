//! Server configuration and shared state

use std::path::PathBuf;
use std::sync::Arc;

use crate::blog::BlogStore;
use crate::comment::CommentStore;
use crate::core::auth::UserStore;
use crate::core::token::TokenService;
use crate::core::uploads::AssetStore;
use crate::realtime::RealtimeHub;

/// Configuration for the blog server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Directory holding uploaded assets
    pub uploads_dir: PathBuf,
    /// Port to bind
    pub port: u16,
    /// Base URL used when handing asset URLs back to clients
    pub public_url: String,
    /// Secret for signing identity tokens
    pub jwt_secret: String,
    /// Max upload size in MB
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);
        Self {
            data_dir: PathBuf::from("blog_data"),
            uploads_dir: PathBuf::from("blog_data").join("uploads"),
            port,
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".to_string()),
            max_upload_size: 10,
        }
    }
}

impl ServerConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        let base = base_dir.into();
        config.uploads_dir = base.join("uploads");
        config.data_dir = base;
        config
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub users: Arc<UserStore>,
    pub blogs: Arc<BlogStore>,
    pub comments: Arc<CommentStore>,
    pub assets: Arc<AssetStore>,
    pub tokens: Arc<TokenService>,
    pub hub: Arc<RealtimeHub>,
}
