use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::content::{
    CommentReader, CommentSubmissionService, MenuReader, PageReader, PostReader, SettingsReader,
    StatsReader, SubmitCommentCommand, TaxonomyReader,
};
use crate::application::repos::HealthRepo;
use crate::domain::posts::ListingQuery;

use super::db_health_response;
use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct PublicState {
    pub posts: PostReader,
    pub taxonomy: TaxonomyReader,
    pub pages: PageReader,
    pub menu: MenuReader,
    pub settings: SettingsReader,
    pub comments: CommentReader,
    pub submissions: CommentSubmissionService,
    pub stats: StatsReader,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/all", get(all_posts))
        .route("/api/posts/id/{id}", get(post_by_id))
        .route("/api/posts/{slug}", get(post_by_slug))
        .route(
            "/api/posts/{slug}/comments",
            get(post_comments).post(submit_comment),
        )
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{slug}", get(category_by_slug))
        .route("/api/tags", get(list_tags))
        .route("/api/tags/{slug}", get(tag_by_slug))
        .route("/api/pages", get(list_pages))
        .route("/api/pages/{slug}", get(page_by_slug))
        .route("/api/menu", get(menu))
        .route("/api/settings", get(settings))
        .route("/api/stats", get(stats))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
struct ListingParams {
    page: Option<u32>,
    per_page: Option<u32>,
    category: Option<String>,
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    author_name: String,
    author_email: Option<String>,
    body: String,
}

async fn health(State(state): State<PublicState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn list_posts(
    State(state): State<PublicState>,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse, ApiError> {
    let per_page = match params.per_page {
        Some(per_page) => per_page,
        None => {
            let settings = state.settings.site_settings().await?;
            u32::try_from(settings.posts_per_page).unwrap_or(1)
        }
    };
    let query = ListingQuery::new(
        params.page,
        per_page,
        params.category.as_deref(),
        params.tag.as_deref(),
    );
    let page = state.posts.get_paginated(&query).await?;
    Ok(Json(page))
}

async fn all_posts(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.posts.get_all_published().await?))
}

async fn post_by_slug(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .posts
        .view_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;
    Ok(Json(view))
}

async fn post_by_id(
    State(state): State<PublicState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .posts
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;
    Ok(Json(view))
}

async fn post_comments(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .posts
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;
    Ok(Json(state.comments.approved_for_post(view.post.id).await?))
}

async fn submit_comment(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .posts
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;
    let comment = state
        .submissions
        .submit(SubmitCommentCommand {
            post_id: view.post.id,
            author_name: body.author_name,
            author_email: body.author_email,
            body: body.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_categories(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.categories().await?))
}

async fn category_by_slug(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .taxonomy
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("category not found"))?;
    Ok(Json(category))
}

async fn list_tags(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.tags().await?))
}

async fn tag_by_slug(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .taxonomy
        .tag_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("tag not found"))?;
    Ok(Json(tag))
}

async fn list_pages(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pages.published_pages().await?))
}

async fn page_by_slug(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .pages
        .page_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("page not found"))?;
    Ok(Json(page))
}

async fn menu(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menu.visible_items().await?))
}

async fn settings(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.site_settings().await?))
}

async fn stats(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.stats.home_stats().await?))
}

async fn fallback() -> ApiError {
    ApiError::not_found("route not found")
}
