//! Blog Module
//!
//! Blog post records with author references. Ownership is enforced at
//! mutation time: only the authoring identity may update or delete a post.

pub mod handlers;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::core::auth::UserInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogStatus {
    Draft,
    Published,
}

impl Default for BlogStatus {
    fn default() -> Self {
        BlogStatus::Draft
    }
}

impl BlogStatus {
    fn as_str(&self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "published" => BlogStatus::Published,
            _ => BlogStatus::Draft,
        }
    }
}

/// Blog post with its author joined in (listings always carry the author's
/// public name and email, matching what clients render).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub status: BlogStatus,
    pub author_id: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type BlogRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    String,
);

const BLOG_SELECT: &str = r#"
    SELECT b.id, b.title, b.description, b.image_url, b.status,
           b.author_id, u.name, u.email, b.created_at, b.updated_at
    FROM blogs b
    JOIN users u ON u.id = b.author_id
"#;

/// Content store for blog posts
pub struct BlogStore {
    db_path: PathBuf,
}

impl BlogStore {
    pub async fn new(base_dir: &Path) -> Result<Self> {
        let db_path = base_dir.join("blog.sqlite");

        let store = Self { db_path };
        store.init_db().await?;

        info!("[Blog] Blog store initialized");
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
            CREATE TABLE IF NOT EXISTS blogs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                image_url TEXT,
                status TEXT NOT NULL DEFAULT 'draft',
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
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
        title: String,
        description: String,
        image_url: Option<String>,
        status: BlogStatus,
    ) -> Result<Blog> {
        let pool = self.get_pool().await?;

        let now = Utc::now();
        let blog = Blog {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            image_url,
            status,
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_email: author.email.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO blogs (id, title, description, image_url, status, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&blog.id)
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(&blog.image_url)
        .bind(blog.status.as_str())
        .bind(&blog.author_id)
        .bind(blog.created_at.to_rfc3339())
        .bind(blog.updated_at.to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;

        info!("[Blog] Created blog {} by {}", blog.id, author.name);

        Ok(blog)
    }

    /// All blogs, newest first
    pub async fn list(&self) -> Result<Vec<Blog>> {
        let pool = self.get_pool().await?;

        let rows: Vec<BlogRow> =
            sqlx::query_as(&format!("{} ORDER BY b.created_at DESC", BLOG_SELECT))
                .fetch_all(&pool)
                .await?;

        pool.close().await;

        Ok(rows.into_iter().map(Self::row_to_blog).collect())
    }

    pub async fn get(&self, blog_id: &str) -> Result<Option<Blog>> {
        let pool = self.get_pool().await?;

        let row: Option<BlogRow> = sqlx::query_as(&format!("{} WHERE b.id = ?", BLOG_SELECT))
            .bind(blog_id)
            .fetch_optional(&pool)
            .await?;

        pool.close().await;

        Ok(row.map(Self::row_to_blog))
    }

    pub async fn exists(&self, blog_id: &str) -> Result<bool> {
        let pool = self.get_pool().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM blogs WHERE id = ?")
            .bind(blog_id)
            .fetch_optional(&pool)
            .await?;

        pool.close().await;

        Ok(row.is_some())
    }

    /// Partial update; `None` leaves a field untouched. The caller is
    /// responsible for existence and ownership checks.
    pub async fn update(
        &self,
        blog_id: &str,
        title: Option<String>,
        description: Option<String>,
        image_url: Option<String>,
        status: Option<BlogStatus>,
    ) -> Result<Blog> {
        let pool = self.get_pool().await?;

        if let Some(title) = title {
            sqlx::query("UPDATE blogs SET title = ? WHERE id = ?")
                .bind(title)
                .bind(blog_id)
                .execute(&pool)
                .await?;
        }
        if let Some(description) = description {
            sqlx::query("UPDATE blogs SET description = ? WHERE id = ?")
                .bind(description)
                .bind(blog_id)
                .execute(&pool)
                .await?;
        }
        if let Some(image_url) = image_url {
            sqlx::query("UPDATE blogs SET image_url = ? WHERE id = ?")
                .bind(image_url)
                .bind(blog_id)
                .execute(&pool)
                .await?;
        }
        if let Some(status) = status {
            sqlx::query("UPDATE blogs SET status = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(blog_id)
                .execute(&pool)
                .await?;
        }

        sqlx::query("UPDATE blogs SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(blog_id)
            .execute(&pool)
            .await?;

        pool.close().await;

        self.get(blog_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Blog not found"))
    }

    pub async fn delete(&self, blog_id: &str) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(blog_id)
            .execute(&pool)
            .await?;

        pool.close().await;

        info!("[Blog] Deleted blog {}", blog_id);
        Ok(())
    }

    /// Blogs by one author, newest first
    pub async fn list_by_author(&self, author_id: &str) -> Result<Vec<Blog>> {
        let pool = self.get_pool().await?;

        let rows: Vec<BlogRow> = sqlx::query_as(&format!(
            "{} WHERE b.author_id = ? ORDER BY b.created_at DESC",
            BLOG_SELECT
        ))
        .bind(author_id)
        .fetch_all(&pool)
        .await?;

        pool.close().await;

        Ok(rows.into_iter().map(Self::row_to_blog).collect())
    }

    fn row_to_blog(
        (id, title, description, image_url, status, author_id, author_name, author_email, created_at, updated_at): BlogRow,
    ) -> Blog {
        Blog {
            id,
            title,
            description,
            image_url,
            status: BlogStatus::parse(&status),
            author_id,
            author_name,
            author_email,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
        }
    }
}
