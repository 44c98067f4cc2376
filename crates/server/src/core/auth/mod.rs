//! Authentication Module
//!
//! User records and credential checks. All user data stored in the SQLite
//! database at <data_dir>/blog.sqlite; identity tokens are stateless JWTs
//! handled by [`crate::core::token::TokenService`].

pub mod handlers;
pub mod middleware;

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public user info (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Check a plaintext password against the stored bcrypt hash.
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        verify(password, &self.password_hash).context("Failed to verify password")
    }
}

/// Credential store: persists user records
pub struct UserStore {
    db_path: PathBuf,
}

impl UserStore {
    /// Create new user store
    pub async fn new(base_dir: &Path) -> Result<Self> {
        let db_path = base_dir.join("blog.sqlite");

        let store = Self { db_path };
        store.init_db().await?;

        info!("[Auth] User store initialized at {:?}", store.db_path);

        Ok(store)
    }

    /// Get database connection
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

    /// Initialize SQLite database
    async fn init_db(&self) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                avatar_url TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    /// Register a new user. The caller is expected to have checked for an
    /// existing email; the unique index still guards against races.
    pub async fn create(
        &self,
        name: String,
        email: String,
        password: String,
        avatar_url: Option<String>,
    ) -> Result<User> {
        let pool = self.get_pool().await?;

        let password_hash = hash(&password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.clone(),
            email: email.clone(),
            password_hash,
            avatar_url,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, avatar_url, created_at) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(user.created_at.to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;

        info!("[Auth] User registered: {} ({})", name, email);

        Ok(user)
    }

    /// Find a user by email (includes the password hash, for login)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, name, email, password_hash, avatar_url, created_at FROM users WHERE email = ?"
        )
        .bind(email)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        Ok(row.map(Self::row_to_user))
    }

    /// Find a user by id
    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, name, email, password_hash, avatar_url, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        Ok(row.map(Self::row_to_user))
    }

    /// Update user profile fields; `None` leaves a field untouched.
    pub async fn update_user(
        &self,
        user_id: &str,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<UserInfo> {
        let pool = self.get_pool().await?;

        if let Some(name) = name {
            sqlx::query("UPDATE users SET name = ? WHERE id = ?")
                .bind(name)
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(email) = email {
            // Check if email already exists for another user
            let existing: Option<(String,)> =
                sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
                    .bind(&email)
                    .bind(user_id)
                    .fetch_optional(&pool)
                    .await?;

            if existing.is_some() {
                warn!("[Auth] Rejected profile update to taken email for {}", user_id);
                return Err(anyhow::anyhow!("Email already in use"));
            }

            sqlx::query("UPDATE users SET email = ? WHERE id = ?")
                .bind(email)
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(password) = password {
            let password_hash = hash(&password, DEFAULT_COST).context("Failed to hash password")?;

            sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                .bind(password_hash)
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(avatar) = avatar_url {
            sqlx::query("UPDATE users SET avatar_url = ? WHERE id = ?")
                .bind(avatar)
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        pool.close().await;

        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found"))?;
        Ok(user.into())
    }

    fn row_to_user(
        (id, name, email, password_hash, avatar_url, created_at): (
            String,
            String,
            String,
            String,
            Option<String>,
            String,
        ),
    ) -> User {
        User {
            id,
            name,
            email,
            password_hash,
            avatar_url,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_and_find_user() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::new(dir.path()).await.unwrap();

        let user = store
            .create(
                "Alice".into(),
                "alice@example.com".into(),
                "password123".into(),
                None,
            )
            .await
            .unwrap();

        let by_email = store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.name, "Alice");
        assert!(by_email.verify_password("password123").unwrap());
        assert!(!by_email.verify_password("wrong").unwrap());

        let by_id = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_by_unique_index() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::new(dir.path()).await.unwrap();

        store
            .create("Alice".into(), "a@example.com".into(), "pw123456".into(), None)
            .await
            .unwrap();
        let dup = store
            .create("Bob".into(), "a@example.com".into(), "pw123456".into(), None)
            .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn update_profile_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::new(dir.path()).await.unwrap();

        let user = store
            .create("Alice".into(), "a@example.com".into(), "pw123456".into(), None)
            .await
            .unwrap();

        let updated = store
            .update_user(
                &user.id,
                Some("Alicia".into()),
                None,
                None,
                Some("/uploads/abc".into()),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.avatar_url.as_deref(), Some("/uploads/abc"));
        assert_eq!(updated.email, "a@example.com");
    }

    #[tokio::test]
    async fn update_to_taken_email_fails() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::new(dir.path()).await.unwrap();

        store
            .create("Alice".into(), "a@example.com".into(), "pw123456".into(), None)
            .await
            .unwrap();
        let bob = store
            .create("Bob".into(), "b@example.com".into(), "pw123456".into(), None)
            .await
            .unwrap();

        let result = store
            .update_user(&bob.id, None, Some("a@example.com".into()), None, None)
            .await;
        assert!(result.is_err());
    }
}
