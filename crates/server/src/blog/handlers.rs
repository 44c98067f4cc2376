//! Blog handlers

use crate::blog::{Blog, BlogStatus};
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: BlogStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<BlogStatus>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/{id}", get(get_blog))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/blogs", axum::routing::post(create_blog))
        .route("/blogs/user/me", get(my_blogs))
        .route(
            "/blogs/{id}",
            axum::routing::put(update_blog).delete(delete_blog),
        )
}

/// GET /blogs
pub async fn list_blogs(State(state): State<AppState>) -> Result<Json<Vec<Blog>>> {
    let blogs = state.blogs.list().await?;
    Ok(Json(blogs))
}

/// GET /blogs/{id}
pub async fn get_blog(
    Path(blog_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Blog>> {
    let blog = state
        .blogs
        .get(&blog_id)
        .await?
        .ok_or(Error::NotFound("Blog"))?;
    Ok(Json(blog))
}

/// POST /blogs
pub async fn create_blog(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<CreateBlogRequest>,
) -> Result<(StatusCode, Json<Blog>)> {
    info!("POST /blogs - {}", ctx.user().name);

    if req.title.trim().is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    if req.description.trim().is_empty() {
        return Err(Error::Validation("Description is required".to_string()));
    }

    let blog = state
        .blogs
        .create(
            ctx.user(),
            req.title,
            req.description,
            req.image_url,
            req.status,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(blog)))
}

/// PUT /blogs/{id}
pub async fn update_blog(
    Path(blog_id): Path<String>,
    State(state): State<AppState>,
    ctx: Ctx,
    Json(req): Json<UpdateBlogRequest>,
) -> Result<Json<Blog>> {
    info!("PUT /blogs/{}", blog_id);

    let blog = state
        .blogs
        .get(&blog_id)
        .await?
        .ok_or(Error::NotFound("Blog"))?;

    if blog.author_id != ctx.user_id() {
        return Err(Error::Forbidden);
    }

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(Error::Validation("Title cannot be empty".to_string()));
        }
    }
    if let Some(description) = &req.description {
        if description.trim().is_empty() {
            return Err(Error::Validation(
                "Description cannot be empty".to_string(),
            ));
        }
    }

    let blog = state
        .blogs
        .update(&blog_id, req.title, req.description, req.image_url, req.status)
        .await?;

    Ok(Json(blog))
}

/// DELETE /blogs/{id}
pub async fn delete_blog(
    Path(blog_id): Path<String>,
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<serde_json::Value>> {
    info!("DELETE /blogs/{}", blog_id);

    let blog = state
        .blogs
        .get(&blog_id)
        .await?
        .ok_or(Error::NotFound("Blog"))?;

    if blog.author_id != ctx.user_id() {
        return Err(Error::Forbidden);
    }

    state.blogs.delete(&blog_id).await?;

    Ok(Json(serde_json::json!({ "message": "Blog removed" })))
}

/// GET /blogs/user/me
pub async fn my_blogs(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Vec<Blog>>> {
    let blogs = state.blogs.list_by_author(ctx.user_id()).await?;
    Ok(Json(blogs))
}
