//! Comment Module
//!
//! Comments on blog posts, persisted to SQLite and announced to the blog's
//! room through the realtime hub. Persistence always completes first: a
//! failed write suppresses the broadcast entirely, so subscribers never
//! see a comment that does not exist.

pub mod handlers;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::core::auth::UserInfo;
use crate::core::config::AppState;
use crate::core::error::{Error, Result as ApiResult};
use crate::realtime::CommentEvent;

/// Comment with its author joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub blog_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub text: String,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentEvent {
    fn from(comment: &Comment) -> Self {
        CommentEvent {
            blog_id: comment.blog_id.clone(),
            comment_id: comment.id.clone(),
            author_name: comment.author_name.clone(),
            text: comment.text.clone(),
            attachment_url: comment.attachment_url.clone(),
            created_at: comment.created_at,
        }
    }
}

type CommentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
);

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.blog_id, c.author_id, u.name, u.email,
           c.text, c.attachment_url, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Content store for comments
pub struct CommentStore {
    db_path: PathBuf,
}

impl CommentStore {
    pub async fn new(base_dir: &Path) -> Result<Self> {
        let db_path = base_dir.join("blog.sqlite");

        let store = Self { db_path };
        store.init_db().await?;

        info!("[Comment] Comment store initialized");
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
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                blog_id TEXT NOT NULL,
                author_id TEXT NOT NULL,
                text TEXT NOT NULL,
                attachment_url TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (blog_id) REFERENCES blogs(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    pub async fn create(
        &self,
        author: &UserInfo,
        blog_id: &str,
        text: &str,
        attachment_url: Option<String>,
    ) -> Result<Comment> {
        let pool = self.get_pool().await?;

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            blog_id: blog_id.to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_email: author.email.clone(),
            text: text.to_string(),
            attachment_url,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO comments (id, blog_id, author_id, text, attachment_url, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&comment.id)
        .bind(&comment.blog_id)
        .bind(&comment.author_id)
        .bind(&comment.text)
        .bind(&comment.attachment_url)
        .bind(comment.created_at.to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;

        info!(
            "[Comment] Added comment {} to blog {}",
            comment.id, blog_id
        );

        Ok(comment)
    }

    /// Comments for one blog, newest first
    pub async fn list_for_blog(&self, blog_id: &str) -> Result<Vec<Comment>> {
        let pool = self.get_pool().await?;

        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "{} WHERE c.blog_id = ? ORDER BY c.created_at DESC",
            COMMENT_SELECT
        ))
        .bind(blog_id)
        .fetch_all(&pool)
        .await?;

        pool.close().await;

        Ok(rows.into_iter().map(Self::row_to_comment).collect())
    }

    fn row_to_comment(
        (id, blog_id, author_id, author_name, author_email, text, attachment_url, created_at): CommentRow,
    ) -> Comment {
        Comment {
            id,
            blog_id,
            author_id,
            author_name,
            author_email,
            text,
            attachment_url,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        }
    }
}

/// Create a comment and announce it.
///
/// The write to the content store must complete before the hub is invoked;
/// any failure on the way out of the store returns an error and no room
/// ever hears about the comment. Delivery problems inside the hub are the
/// hub's to swallow, so success here is defined by persistence alone.
pub async fn create_comment(
    state: &AppState,
    author: &UserInfo,
    blog_id: &str,
    text: &str,
    attachment_url: Option<String>,
) -> ApiResult<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("Comment text is required".to_string()));
    }
    if blog_id.trim().is_empty() {
        return Err(Error::Validation("Blog ID is required".to_string()));
    }

    if !state.blogs.exists(blog_id).await? {
        return Err(Error::NotFound("Blog"));
    }

    let comment = state
        .comments
        .create(author, blog_id, text, attachment_url)
        .await?;

    state.hub.publish(&comment.blog_id, CommentEvent::from(&comment));

    Ok(comment)
}
