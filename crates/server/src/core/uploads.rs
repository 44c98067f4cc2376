//! Upload Store
//!
//! Content-addressed storage for uploaded assets (avatars, blog images,
//! comment attachments). Bytes live on disk under the uploads directory,
//! named by sha256; metadata lives in the SQLite database. Clients upload
//! first and reference the returned URL from blog/comment/profile fields.

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{error, info};

use crate::core::config::AppState;
use crate::core::error::Error;

/// Reference to a stored asset, as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
    pub hash: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct AssetMeta {
    pub hash: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Asset metadata store
pub struct AssetStore {
    db_path: PathBuf,
}

impl AssetStore {
    pub async fn new(base_dir: &std::path::Path) -> Result<Self> {
        let db_path = base_dir.join("blog.sqlite");

        let store = Self { db_path };
        store.init_db().await?;

        info!("[Uploads] Asset store initialized");
        Ok(store)
    }

    async fn get_pool(&self) -> Result<sqlx::SqlitePool> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            self.db_path.to_string_lossy().replace('\\', "/")
        ))?
        .create_if_missing(true);
        Ok(SqlitePoolOptions::new().connect_with(options).await?)
    }

    async fn init_db(&self) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                hash TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    /// Record asset metadata. Re-uploading identical content is a no-op.
    pub async fn record(
        &self,
        hash: &str,
        filename: &str,
        content_type: &str,
        size: u64,
    ) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO assets (hash, filename, content_type, size, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(hash)
        .bind(filename)
        .bind(content_type)
        .bind(size as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    pub async fn lookup(&self, hash: &str) -> Result<Option<AssetMeta>> {
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, i64, String)> = sqlx::query_as(
            "SELECT hash, filename, content_type, size, created_at FROM assets WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        Ok(
            row.map(|(hash, filename, content_type, size, created_at)| AssetMeta {
                hash,
                filename,
                content_type,
                size: size as u64,
                created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            }),
        )
    }
}

/// POST /uploads
pub async fn upload_asset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<AssetRef>), Error> {
    info!("POST /uploads");

    let mut filename = None;
    let mut content_type = None;
    let mut data = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        Error::Validation("Malformed multipart body".to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            data = Some(field.bytes().await.map_err(|e| {
                error!("Failed to read file data: {}", e);
                Error::Validation("Malformed multipart body".to_string())
            })?);
        }
    }

    let data = data.ok_or_else(|| Error::Validation("Missing \"file\" field".to_string()))?;
    let filename = filename.unwrap_or_else(|| "unnamed".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    if data.len() > state.config.max_upload_size * 1024 * 1024 {
        return Err(Error::Validation(format!(
            "File exceeds the {}MB upload limit",
            state.config.max_upload_size
        )));
    }

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let hash = format!("{:x}", hasher.finalize());

    let path = state.config.uploads_dir.join(&hash);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| Error::Internal(format!("Failed to write asset {}: {}", hash, e)))?;

    state
        .assets
        .record(&hash, &filename, &content_type, data.len() as u64)
        .await?;

    info!("Stored asset {} ({} bytes)", hash, data.len());

    Ok((
        StatusCode::CREATED,
        Json(AssetRef {
            url: format!("{}/uploads/{}", state.config.public_url, hash),
            hash,
            filename,
            content_type,
            size: data.len() as u64,
        }),
    ))
}

/// GET /uploads/{hash}
pub async fn get_asset(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> std::result::Result<(HeaderMap, Bytes), Error> {
    // Hashes are hex; anything else (path separators included) is rejected
    // before touching the filesystem.
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Validation("Invalid asset hash".to_string()));
    }

    let meta = state
        .assets
        .lookup(&hash)
        .await?
        .ok_or(Error::NotFound("Asset"))?;

    let data = tokio::fs::read(state.config.uploads_dir.join(&hash))
        .await
        .map_err(|e| Error::Internal(format!("Failed to read asset {}: {}", hash, e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        meta.content_type
            .parse()
            .unwrap_or_else(|_| "application/octet-stream".parse().unwrap()),
    );

    Ok((headers, Bytes::from(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn record_and_lookup_asset_meta() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).await.unwrap();

        store
            .record("abc123", "cat.png", "image/png", 42)
            .await
            .unwrap();

        let meta = store.lookup("abc123").await.unwrap().unwrap();
        assert_eq!(meta.filename, "cat.png");
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(meta.size, 42);

        assert!(store.lookup("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn re_recording_identical_content_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path()).await.unwrap();

        store
            .record("abc123", "cat.png", "image/png", 42)
            .await
            .unwrap();
        store
            .record("abc123", "other-name.png", "image/png", 42)
            .await
            .unwrap();

        // First upload wins; the content address is the identity
        let meta = store.lookup("abc123").await.unwrap().unwrap();
        assert_eq!(meta.filename, "cat.png");
    }
}
