//! Comment handlers

use crate::comment::{create_comment, Comment};
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub blog_id: String,
    pub text: String,
    pub attachment_url: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/comments/{blog_id}", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/comments", post(add_comment))
}

/// POST /comments
pub async fn add_comment(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    info!("POST /comments - blog {}", req.blog_id);

    let comment = create_comment(
        &state,
        ctx.user(),
        &req.blog_id,
        &req.text,
        req.attachment_url,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /comments/{blog_id}
pub async fn list_comments(
    Path(blog_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>> {
    let comments = state.comments.list_for_blog(&blog_id).await?;
    Ok(Json(comments))
}
