//! Auth handlers

use crate::core::auth::UserInfo;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar_url: Option<String>,
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.contains('@') && !email.starts_with('@') && !email.ends_with('@');
    if valid {
        Ok(())
    } else {
        Err(Error::Validation("Valid email is required".to_string()))
    }
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    info!("POST /auth/register - {}", req.email);

    if req.name.trim().is_empty() {
        return Err(Error::Validation("Name is required".to_string()));
    }
    validate_email(&req.email)?;
    if req.password.len() < 6 {
        return Err(Error::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if state.users.find_by_email(&req.email).await?.is_some() {
        warn!("Registration rejected, email in use: {}", req.email);
        return Err(Error::Conflict("Email already in use".to_string()));
    }

    let user = state
        .users
        .create(req.name, req.email, req.password, req.avatar_url)
        .await?;

    // The original flow logs the user straight in: registration answers
    // with a token alongside the profile.
    let token = state
        .tokens
        .issue(&user.id)
        .map_err(|e| Error::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("POST /auth/login - {}", req.email);

    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or(Error::LoginFail)?;

    if !user.verify_password(&req.password)? {
        warn!("Failed login attempt for {}", req.email);
        return Err(Error::LoginFail);
    }

    let token = state
        .tokens
        .issue(&user.id)
        .map_err(|e| Error::Internal(e.to_string()))?;

    info!("User {} logged in", user.name);

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /auth/me
pub async fn me(ctx: Ctx) -> Result<Json<UserInfo>> {
    Ok(Json(ctx.user().clone()))
}

/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserInfo>> {
    info!("PUT /auth/profile - {}", ctx.user_id());

    if let Some(email) = &req.email {
        validate_email(email)?;
        if let Some(existing) = state.users.find_by_email(email).await? {
            if existing.id != ctx.user_id() {
                return Err(Error::Conflict("Email already in use".to_string()));
            }
        }
    }
    if let Some(password) = &req.password {
        if password.len() < 6 {
            return Err(Error::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
    }

    let user = state
        .users
        .update_user(
            ctx.user_id(),
            req.name,
            req.email,
            req.password,
            req.avatar_url,
        )
        .await?;

    Ok(Json(user))
}
