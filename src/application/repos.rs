//! Repository traits describing persistence adapters.
//!
//! Reads and writes are split per entity so services only receive the
//! capabilities they use. Every method is a plain async query returning
//! records; the cache layer sits above these traits and never inside them.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::site::SiteArchive;
use crate::domain::entities::{
    AuditLogRecord, CategoryRecord, CommentRecord, MenuItemRecord, PageRecord, PostRecord,
    SiteSettingsRecord, TagRecord,
};
use crate::domain::types::{CommentStatus, PageStatus, PostStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Published posts only, newest publication first.
    Public,
    Admin { status: Option<PostStatus> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQueryFilter {
    pub scope: PostListScope,
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
    pub search: Option<String>,
}

impl PostQueryFilter {
    pub fn public() -> Self {
        Self {
            scope: PostListScope::Public,
            category_slug: None,
            tag_slug: None,
            search: None,
        }
    }
}

/// A tag attached to a post, as returned by batch relation look-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTagRecord {
    pub post_id: Uuid,
    pub tag: TagRecord,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
    pub published_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Every post matching `filter`, in listing order.
    async fn list_all_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Sum of view counters over published posts.
    async fn total_views(&self) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError>;

    /// Atomically bump the view counter and return the new value.
    async fn increment_view_count(&self, id: Uuid) -> Result<i64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;
    /// One query for any number of ids; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CategoryRecord>, RepoError>;
    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;
    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;
    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagParams {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError>;
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError>;
    /// Tags for a batch of posts in a single query.
    async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTagRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError>;
    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePageParams {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub status: PageStatus,
}

#[derive(Debug, Clone)]
pub struct UpdatePageParams {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub status: PageStatus,
}

#[async_trait]
pub trait PagesRepo: Send + Sync {
    async fn list_pages(&self, status: Option<PageStatus>) -> Result<Vec<PageRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, RepoError>;
}

#[async_trait]
pub trait PagesWriteRepo: Send + Sync {
    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError>;

    async fn update_page(&self, params: UpdatePageParams) -> Result<PageRecord, RepoError>;

    async fn delete_page(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateMenuItemParams {
    pub label: String,
    pub destination: String,
    pub sort_order: i32,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateMenuItemParams {
    pub id: Uuid,
    pub label: String,
    pub destination: String,
    pub sort_order: i32,
    pub visible: bool,
}

#[async_trait]
pub trait MenuRepo: Send + Sync {
    /// Items ordered by `sort_order`, then label.
    async fn list_items(&self, visible_only: bool) -> Result<Vec<MenuItemRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemRecord>, RepoError>;
}

#[async_trait]
pub trait MenuWriteRepo: Send + Sync {
    async fn create_item(&self, params: CreateMenuItemParams)
    -> Result<MenuItemRecord, RepoError>;

    async fn update_item(&self, params: UpdateMenuItemParams)
    -> Result<MenuItemRecord, RepoError>;

    async fn delete_item(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
    pub status: CommentStatus,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for one post, oldest first.
    async fn list_for_post(
        &self,
        post_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    /// Most recent comments across all posts.
    async fn list_recent(
        &self,
        status: Option<CommentStatus>,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    /// Approved comment counts for a batch of posts; posts without comments are omitted.
    async fn count_approved_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, RepoError>;

    async fn count_approved_for_post(&self, post_id: Uuid) -> Result<i64, RepoError>;

    async fn count_approved(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError>;
    async fn upsert_site_settings(&self, settings: SiteSettingsRecord) -> Result<(), RepoError>;
}

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError>;
}

/// Whole-site snapshot access used by backup export/import.
#[async_trait]
pub trait SiteArchiveRepo: Send + Sync {
    async fn export_archive(&self) -> Result<SiteArchive, RepoError>;

    /// Replace every content table with the archive contents atomically.
    async fn replace_with_archive(&self, archive: &SiteArchive) -> Result<(), RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
