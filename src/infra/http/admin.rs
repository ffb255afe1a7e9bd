//! Private JSON administration surface.
//!
//! Every mutation goes through an admin service, which writes, audits and then
//! invalidates the affected cache entries before the handler responds.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::admin::{
    audit::AdminAuditService,
    categories::{AdminCategoryService, CreateCategoryCommand, UpdateCategoryCommand},
    comments::AdminCommentService,
    menu::{AdminMenuService, MenuItemCommand},
    pages::{AdminPageService, CreatePageCommand, UpdatePageCommand},
    posts::{AdminPostService, CreatePostCommand, UpdatePostCommand},
    settings::{AdminSettingsService, UpdateSettingsCommand},
    tags::{AdminTagService, CreateTagCommand, UpdateTagCommand},
};
use crate::application::repos::HealthRepo;
use crate::application::site::SiteBackupService;
use crate::cache::CacheTrigger;
use crate::domain::types::{CommentStatus, PageStatus, PostStatus};

use super::db_health_response;
use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};

/// Audit actor recorded for requests on the private listener.
const ADMIN_ACTOR: &str = "admin";
const DEFAULT_AUDIT_LIMIT: u32 = 50;
const TOML_CONTENT_TYPE: &str = "application/toml; charset=utf-8";

#[derive(Clone)]
pub struct AdminState {
    pub posts: AdminPostService,
    pub categories: AdminCategoryService,
    pub tags: AdminTagService,
    pub pages: AdminPageService,
    pub menu: AdminMenuService,
    pub comments: AdminCommentService,
    pub settings: AdminSettingsService,
    pub audit: AdminAuditService,
    pub backup: SiteBackupService,
    pub trigger: CacheTrigger,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/api/health", get(health))
        .route("/admin/api/posts", get(list_posts).post(create_post))
        .route(
            "/admin/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/admin/api/posts/{id}/tags", put(replace_post_tags))
        .route(
            "/admin/api/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/admin/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/admin/api/tags", get(list_tags).post(create_tag))
        .route(
            "/admin/api/tags/{id}",
            get(get_tag).put(update_tag).delete(delete_tag),
        )
        .route("/admin/api/pages", get(list_pages).post(create_page))
        .route(
            "/admin/api/pages/{id}",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/admin/api/menu", get(list_menu).post(create_menu_item))
        .route(
            "/admin/api/menu/{id}",
            put(update_menu_item).delete(delete_menu_item),
        )
        .route("/admin/api/comments", get(list_comments))
        .route(
            "/admin/api/comments/{id}",
            delete(delete_comment),
        )
        .route("/admin/api/comments/{id}/status", put(set_comment_status))
        .route(
            "/admin/api/settings",
            get(get_settings).put(update_settings),
        )
        .route("/admin/api/audit", get(list_audit))
        .route("/admin/api/cache/purge", post(purge_cache))
        .route("/admin/api/backup", get(export_backup).post(import_backup))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Serialize)]
struct InvalidationBody {
    keys_removed: usize,
}

async fn health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

// Posts

#[derive(Debug, Default, Deserialize)]
struct PostListParams {
    status: Option<PostStatus>,
    search: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    title: String,
    slug: Option<String>,
    #[serde(default)]
    excerpt: String,
    body: String,
    status: PostStatus,
    category_id: Option<Uuid>,
    tag_ids: Option<Vec<Uuid>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
struct TagIdsPayload {
    tag_ids: Vec<Uuid>,
}

async fn list_posts(
    State(state): State<AdminState>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state
        .posts
        .list(params.status, params.search, params.page, params.per_page)
        .await?;
    Ok(Json(list))
}

async fn get_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("post not found"))?;
    Ok(Json(post))
}

async fn create_post(
    State(state): State<AdminState>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePostCommand {
        title: payload.title,
        slug: payload.slug,
        excerpt: payload.excerpt,
        body: payload.body,
        status: payload.status,
        category_id: payload.category_id,
        tag_ids: payload.tag_ids.unwrap_or_default(),
        published_at: payload.published_at,
    };
    let post = state.posts.create_post(ADMIN_ACTOR, command).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdatePostCommand {
        id,
        title: payload.title,
        slug: payload.slug,
        excerpt: payload.excerpt,
        body: payload.body,
        status: payload.status,
        category_id: payload.category_id,
        tag_ids: payload.tag_ids,
        published_at: payload.published_at,
    };
    let post = state.posts.update_post(ADMIN_ACTOR, command).await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.posts.delete_post(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn replace_post_tags(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagIdsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .posts
        .replace_tags(ADMIN_ACTOR, id, payload.tag_ids)
        .await?;
    Ok(Json(state.posts.list_tags(id).await?))
}

// Categories

#[derive(Debug, Deserialize)]
struct CategoryPayload {
    name: String,
    slug: Option<String>,
    description: Option<String>,
}

async fn list_categories(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.categories.list_all().await?))
}

async fn get_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("category not found"))?;
    Ok(Json(category))
}

async fn create_category(
    State(state): State<AdminState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateCategoryCommand {
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
    };
    let category = state
        .categories
        .create_category(ADMIN_ACTOR, command)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateCategoryCommand {
        id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
    };
    let category = state
        .categories
        .update_category(ADMIN_ACTOR, command)
        .await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.categories.delete_category(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Tags

#[derive(Debug, Deserialize)]
struct TagPayload {
    name: String,
    slug: Option<String>,
}

async fn list_tags(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tags.list_all().await?))
}

async fn get_tag(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .tags
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("tag not found"))?;
    Ok(Json(tag))
}

async fn create_tag(
    State(state): State<AdminState>,
    Json(payload): Json<TagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateTagCommand {
        name: payload.name,
        slug: payload.slug,
    };
    let tag = state.tags.create_tag(ADMIN_ACTOR, command).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateTagCommand {
        id,
        name: payload.name,
        slug: payload.slug,
    };
    let tag = state.tags.update_tag(ADMIN_ACTOR, command).await?;
    Ok(Json(tag))
}

async fn delete_tag(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.tags.delete_tag(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Pages

#[derive(Debug, Default, Deserialize)]
struct PageListParams {
    status: Option<PageStatus>,
}

#[derive(Debug, Deserialize)]
struct PagePayload {
    title: String,
    slug: Option<String>,
    body: String,
    status: PageStatus,
}

async fn list_pages(
    State(state): State<AdminState>,
    Query(params): Query<PageListParams>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pages.list(params.status).await?))
}

async fn get_page(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .pages
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("page not found"))?;
    Ok(Json(page))
}

async fn create_page(
    State(state): State<AdminState>,
    Json(payload): Json<PagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePageCommand {
        title: payload.title,
        slug: payload.slug,
        body: payload.body,
        status: payload.status,
    };
    let page = state.pages.create_page(ADMIN_ACTOR, command).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn update_page(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdatePageCommand {
        id,
        title: payload.title,
        slug: payload.slug,
        body: payload.body,
        status: payload.status,
    };
    let page = state.pages.update_page(ADMIN_ACTOR, command).await?;
    Ok(Json(page))
}

async fn delete_page(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.pages.delete_page(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Menu

#[derive(Debug, Deserialize)]
struct MenuItemPayload {
    label: String,
    destination: String,
    #[serde(default)]
    sort_order: i32,
    #[serde(default = "default_visible")]
    visible: bool,
}

fn default_visible() -> bool {
    true
}

impl From<MenuItemPayload> for MenuItemCommand {
    fn from(payload: MenuItemPayload) -> Self {
        Self {
            label: payload.label,
            destination: payload.destination,
            sort_order: payload.sort_order,
            visible: payload.visible,
        }
    }
}

async fn list_menu(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menu.list().await?))
}

async fn create_menu_item(
    State(state): State<AdminState>,
    Json(payload): Json<MenuItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .menu
        .create_item(ADMIN_ACTOR, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_menu_item(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MenuItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .menu
        .update_item(ADMIN_ACTOR, id, payload.into())
        .await?;
    Ok(Json(item))
}

async fn delete_menu_item(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.menu.delete_item(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Comments

#[derive(Debug, Default, Deserialize)]
struct CommentListParams {
    status: Option<CommentStatus>,
    post_id: Option<Uuid>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CommentStatusPayload {
    status: CommentStatus,
}

async fn list_comments(
    State(state): State<AdminState>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = match params.post_id {
        Some(post_id) => state.comments.list_for_post(post_id, params.status).await?,
        None => state.comments.list_recent(params.status, params.limit).await?,
    };
    Ok(Json(comments))
}

async fn set_comment_status(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .set_status(ADMIN_ACTOR, id, payload.status)
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.comments.delete_comment(ADMIN_ACTOR, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Settings

#[derive(Debug, Deserialize)]
struct SettingsPayload {
    site_title: String,
    #[serde(default)]
    site_description: String,
    posts_per_page: i32,
    timezone: Tz,
    footer_text: Option<String>,
    comments_enabled: bool,
}

async fn get_settings(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.load().await?))
}

async fn update_settings(
    State(state): State<AdminState>,
    Json(payload): Json<SettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateSettingsCommand {
        site_title: payload.site_title,
        site_description: payload.site_description,
        posts_per_page: payload.posts_per_page,
        timezone: payload.timezone,
        footer_text: payload.footer_text,
        comments_enabled: payload.comments_enabled,
    };
    Ok(Json(state.settings.update(ADMIN_ACTOR, command).await?))
}

// Audit, cache and backup

#[derive(Debug, Default, Deserialize)]
struct AuditParams {
    limit: Option<u32>,
}

async fn list_audit(
    State(state): State<AdminState>,
    Query(params): Query<AuditParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Ok(Json(state.audit.list_recent(limit).await?))
}

async fn purge_cache(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let keys_removed = state.trigger.cache().purge().await;
    info!(target: "quire::admin", keys_removed, "Cache purged");
    state
        .audit
        .record::<()>(ADMIN_ACTOR, "cache.purge", "cache", None, None)
        .await?;
    Ok(Json(InvalidationBody { keys_removed }))
}

async fn export_backup(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let encoded = state.backup.export_toml().await?;
    Ok(([(CONTENT_TYPE, TOML_CONTENT_TYPE)], encoded))
}

async fn import_backup(
    State(state): State<AdminState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.backup.import_toml(ADMIN_ACTOR, &body).await?;
    Ok(Json(InvalidationBody {
        keys_removed: report.keys_removed,
    }))
}
