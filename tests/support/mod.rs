//! In-memory repositories and cache fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use quire::app::{ApplicationContext, Repositories, build_application_context};
use quire::application::repos::{
    AuditRepo, CategoriesRepo, CategoriesWriteRepo, CommentsRepo, CommentsWriteRepo,
    CreateCategoryParams, CreateCommentParams, CreateMenuItemParams, CreatePageParams,
    CreatePostParams, CreateTagParams, HealthRepo, MenuRepo, MenuWriteRepo, PagesRepo,
    PagesWriteRepo, PostListScope, PostQueryFilter, PostTagRecord, PostsRepo, PostsWriteRepo,
    RepoError, SettingsRepo, SiteArchiveRepo, TagsRepo, TagsWriteRepo, UpdateCategoryParams,
    UpdateMenuItemParams, UpdatePageParams, UpdatePostParams, UpdateTagParams,
};
use quire::application::site::{
    CategorySnapshot, CommentSnapshot, MenuSnapshot, PageSnapshot, PostSnapshot, SettingsSnapshot,
    SiteArchive, TagSnapshot,
};
use quire::cache::{BackendError, CacheBackend, CacheConfig, KvCache, MemoryBackend};
use quire::domain::entities::{
    AuditLogRecord, CategoryRecord, CommentRecord, MenuItemRecord, PageRecord, PostRecord,
    SiteSettingsRecord, TagRecord,
};
use quire::domain::types::{CommentStatus, PageStatus, PostStatus};

#[derive(Default)]
struct State {
    posts: Vec<PostRecord>,
    categories: Vec<CategoryRecord>,
    tags: Vec<TagRecord>,
    post_tags: Vec<(Uuid, Uuid)>,
    pages: Vec<PageRecord>,
    menu: Vec<MenuItemRecord>,
    comments: Vec<CommentRecord>,
    settings: Option<SiteSettingsRecord>,
    audit: Vec<AuditLogRecord>,
}

/// A store with the same observable semantics as the Postgres adapter.
///
/// Every read method bumps a counter so tests can tell cache hits from store
/// round trips.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.audit.iter().map(|entry| entry.action.clone()).collect()
    }

    /// Change a post title behind the services' back, as another writer would.
    pub async fn rename_post_silently(&self, id: Uuid, title: &str) {
        let mut state = self.state.lock().await;
        if let Some(post) = state.posts.iter_mut().find(|post| post.id == id) {
            post.title = title.to_string();
        }
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn repositories(store: Arc<MemoryStore>) -> Repositories {
    Repositories {
        posts: store.clone(),
        posts_write: store.clone(),
        categories: store.clone(),
        categories_write: store.clone(),
        tags: store.clone(),
        tags_write: store.clone(),
        pages: store.clone(),
        pages_write: store.clone(),
        menu: store.clone(),
        menu_write: store.clone(),
        comments: store.clone(),
        comments_write: store.clone(),
        settings: store.clone(),
        audit: store.clone(),
        archive: store.clone(),
        health: store,
    }
}

pub fn memory_cache() -> KvCache {
    memory_cache_with(CacheConfig::default())
}

pub fn memory_cache_with(config: CacheConfig) -> KvCache {
    let capacity = NonZeroUsize::new(4096).expect("non-zero capacity");
    KvCache::new(Arc::new(MemoryBackend::new(capacity)), config)
}

/// Services over `store` with a fresh memory cache.
pub fn context(store: &Arc<MemoryStore>) -> ApplicationContext {
    build_application_context(&repositories(store.clone()), memory_cache(), true)
}

pub fn context_with_cache(store: &Arc<MemoryStore>, cache: KvCache) -> ApplicationContext {
    build_application_context(&repositories(store.clone()), cache, true)
}

/// Services over `store` and `cache` whose audit log rejects every append.
pub fn context_with_failing_audit(store: &Arc<MemoryStore>, cache: KvCache) -> ApplicationContext {
    let mut repos = repositories(store.clone());
    repos.audit = Arc::new(FailingAuditRepo);
    build_application_context(&repos, cache, true)
}

/// Audit log that times out on every call.
#[derive(Debug, Default)]
pub struct FailingAuditRepo;

#[async_trait]
impl AuditRepo for FailingAuditRepo {
    async fn append_log(&self, _record: AuditLogRecord) -> Result<(), RepoError> {
        Err(RepoError::Timeout)
    }

    async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        Err(RepoError::Timeout)
    }
}

/// Backend that fails every call.
#[derive(Debug, Default)]
pub struct FailingBackend {
    calls: AtomicUsize,
}

impl FailingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> BackendError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BackendError::connection("backend is down")
    }
}

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Err(self.fail())
    }

    async fn put(
        &self,
        _key: &str,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        Err(self.fail())
    }

    async fn delete(&self, _key: &str) -> Result<(), BackendError> {
        Err(self.fail())
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, BackendError> {
        Err(self.fail())
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn default_settings() -> SiteSettingsRecord {
    SiteSettingsRecord {
        site_title: "Quire".to_string(),
        site_description: String::new(),
        posts_per_page: 10,
        timezone: Tz::UTC,
        footer_text: None,
        comments_enabled: true,
        updated_at: now(),
    }
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl State {
    fn matches(&self, post: &PostRecord, filter: &PostQueryFilter) -> bool {
        let in_scope = match filter.scope {
            PostListScope::Public => {
                post.status == PostStatus::Published && post.published_at.is_some()
            }
            PostListScope::Admin { status } => status.is_none_or(|status| post.status == status),
        };
        if !in_scope {
            return false;
        }

        if let Some(slug) = filter.category_slug.as_deref() {
            let matches = self
                .categories
                .iter()
                .any(|category| Some(category.id) == post.category_id && category.slug == slug);
            if !matches {
                return false;
            }
        }

        if let Some(slug) = filter.tag_slug.as_deref() {
            let matches = self.post_tags.iter().any(|(post_id, tag_id)| {
                *post_id == post.id
                    && self
                        .tags
                        .iter()
                        .any(|tag| tag.id == *tag_id && tag.slug == slug)
            });
            if !matches {
                return false;
            }
        }

        if let Some(search) = filter.search.as_deref() {
            return contains_ci(&post.title, search)
                || contains_ci(&post.slug, search)
                || contains_ci(&post.excerpt, search);
        }
        true
    }

    fn filtered(&self, filter: &PostQueryFilter) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .cloned()
            .collect();
        match filter.scope {
            PostListScope::Public => posts.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            PostListScope::Admin { .. } => posts.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }
        posts
    }

    fn tags_of(&self, post_id: Uuid) -> Vec<TagRecord> {
        self.post_tags
            .iter()
            .filter(|(post, _)| *post == post_id)
            .filter_map(|(_, tag_id)| self.tags.iter().find(|tag| tag.id == *tag_id).cloned())
            .collect()
    }

    fn approved_count(&self, post_id: Uuid) -> i64 {
        self.comments
            .iter()
            .filter(|comment| comment.post_id == post_id && comment.status == CommentStatus::Approved)
            .count() as i64
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state
            .filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_all_posts(&self, filter: &PostQueryFilter) -> Result<Vec<PostRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.filtered(filter))
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.filtered(filter).len() as u64)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn total_views(&self) -> Result<i64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| post.status == PostStatus::Published)
            .map(|post| post.view_count)
            .sum())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.posts.iter().any(|post| post.slug == params.slug) {
            return Err(duplicate("posts_slug_key"));
        }
        let timestamp = now();
        let post = PostRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            excerpt: params.excerpt,
            body: params.body,
            status: params.status,
            category_id: params.category_id,
            view_count: 0,
            published_at: params.published_at,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .posts
            .iter()
            .any(|post| post.slug == params.slug && post.id != params.id)
        {
            return Err(duplicate("posts_slug_key"));
        }
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.slug = params.slug;
        post.title = params.title;
        post.excerpt = params.excerpt;
        post.body = params.body;
        post.status = params.status;
        post.category_id = params.category_id;
        post.published_at = params.published_at;
        post.updated_at = now();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.post_tags.retain(|(post_id, _)| *post_id != id);
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }

    async fn replace_post_tags(&self, post_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.post_tags.retain(|(post, _)| *post != post_id);
        state
            .post_tags
            .extend(tag_ids.iter().map(|tag_id| (post_id, *tag_id)));
        Ok(())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<i64, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.view_count += 1;
        Ok(post.view_count)
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(categories)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<CategoryRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| post.category_id == Some(id))
            .count() as u64)
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryStore {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.categories.iter().any(|c| c.slug == params.slug) {
            return Err(duplicate("categories_slug_key"));
        }
        let timestamp = now();
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            description: params.description,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .categories
            .iter()
            .any(|c| c.slug == params.slug && c.id != params.id)
        {
            return Err(duplicate("categories_slug_key"));
        }
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == params.id)
            .ok_or(RepoError::NotFound)?;
        category.slug = params.slug;
        category.name = params.name;
        category.description = params.description;
        category.updated_at = now();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        if state.categories.len() == before {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.iter_mut().filter(|post| post.category_id == Some(id)) {
            post.category_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for MemoryStore {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut tags = state.tags.clone();
        tags.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(tags)
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.tags_of(post_id))
    }

    async fn list_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<PostTagRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(post_ids
            .iter()
            .flat_map(|post_id| {
                state.tags_of(*post_id).into_iter().map(|tag| PostTagRecord {
                    post_id: *post_id,
                    tag,
                })
            })
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.tags.iter().find(|tag| tag.slug == slug).cloned())
    }

    async fn count_usage(&self, id: Uuid) -> Result<u64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.post_tags.iter().filter(|(_, tag)| *tag == id).count() as u64)
    }
}

#[async_trait]
impl TagsWriteRepo for MemoryStore {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.tags.iter().any(|tag| tag.slug == params.slug) {
            return Err(duplicate("tags_slug_key"));
        }
        let timestamp = now();
        let tag = TagRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .tags
            .iter()
            .any(|tag| tag.slug == params.slug && tag.id != params.id)
        {
            return Err(duplicate("tags_slug_key"));
        }
        let tag = state
            .tags
            .iter_mut()
            .find(|tag| tag.id == params.id)
            .ok_or(RepoError::NotFound)?;
        tag.slug = params.slug;
        tag.name = params.name;
        tag.updated_at = now();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.tags.len();
        state.tags.retain(|tag| tag.id != id);
        if state.tags.len() == before {
            return Err(RepoError::NotFound);
        }
        state.post_tags.retain(|(_, tag)| *tag != id);
        Ok(())
    }
}

#[async_trait]
impl PagesRepo for MemoryStore {
    async fn list_pages(&self, status: Option<PageStatus>) -> Result<Vec<PageRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut pages: Vec<PageRecord> = state
            .pages
            .iter()
            .filter(|page| status.is_none_or(|status| page.status == status))
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(pages)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.pages.iter().find(|page| page.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.pages.iter().find(|page| page.id == id).cloned())
    }
}

#[async_trait]
impl PagesWriteRepo for MemoryStore {
    async fn create_page(&self, params: CreatePageParams) -> Result<PageRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.pages.iter().any(|page| page.slug == params.slug) {
            return Err(duplicate("pages_slug_key"));
        }
        let timestamp = now();
        let page = PageRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            body: params.body,
            status: params.status,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.pages.push(page.clone());
        Ok(page)
    }

    async fn update_page(&self, params: UpdatePageParams) -> Result<PageRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .pages
            .iter()
            .any(|page| page.slug == params.slug && page.id != params.id)
        {
            return Err(duplicate("pages_slug_key"));
        }
        let page = state
            .pages
            .iter_mut()
            .find(|page| page.id == params.id)
            .ok_or(RepoError::NotFound)?;
        page.slug = params.slug;
        page.title = params.title;
        page.body = params.body;
        page.status = params.status;
        page.updated_at = now();
        Ok(page.clone())
    }

    async fn delete_page(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.pages.len();
        state.pages.retain(|page| page.id != id);
        if state.pages.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MenuRepo for MemoryStore {
    async fn list_items(&self, visible_only: bool) -> Result<Vec<MenuItemRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut items: Vec<MenuItemRecord> = state
            .menu
            .iter()
            .filter(|item| !visible_only || item.visible)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(items)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MenuItemRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.menu.iter().find(|item| item.id == id).cloned())
    }
}

#[async_trait]
impl MenuWriteRepo for MemoryStore {
    async fn create_item(
        &self,
        params: CreateMenuItemParams,
    ) -> Result<MenuItemRecord, RepoError> {
        let mut state = self.state.lock().await;
        let timestamp = now();
        let item = MenuItemRecord {
            id: Uuid::new_v4(),
            label: params.label,
            destination: params.destination,
            sort_order: params.sort_order,
            visible: params.visible,
            created_at: timestamp,
            updated_at: timestamp,
        };
        state.menu.push(item.clone());
        Ok(item)
    }

    async fn update_item(
        &self,
        params: UpdateMenuItemParams,
    ) -> Result<MenuItemRecord, RepoError> {
        let mut state = self.state.lock().await;
        let item = state
            .menu
            .iter_mut()
            .find(|item| item.id == params.id)
            .ok_or(RepoError::NotFound)?;
        item.label = params.label;
        item.destination = params.destination;
        item.sort_order = params.sort_order;
        item.visible = params.visible;
        item.updated_at = now();
        Ok(item.clone())
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.menu.len();
        state.menu.retain(|item| item.id != id);
        if state.menu.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(
        &self,
        post_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut comments: Vec<CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter(|comment| status.is_none_or(|status| comment.status == status))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn list_recent(
        &self,
        status: Option<CommentStatus>,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let mut comments: Vec<CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| status.is_none_or(|status| comment.status == status))
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        comments.truncate(limit as usize);
        Ok(comments)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.comments.iter().find(|comment| comment.id == id).cloned())
    }

    async fn count_approved_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(post_ids
            .iter()
            .map(|post_id| (*post_id, state.approved_count(*post_id)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn count_approved_for_post(&self, post_id: Uuid) -> Result<i64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.approved_count(post_id))
    }

    async fn count_approved(&self) -> Result<u64, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.status == CommentStatus::Approved)
            .count() as u64)
    }
}

#[async_trait]
impl CommentsWriteRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::Integrity {
                message: "comments_post_id_fkey".to_string(),
            });
        }
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_name: params.author_name,
            author_email: params.author_email,
            body: params.body,
            status: params.status,
            created_at: now(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let comment = state
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.status = status;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.comments.len();
        state.comments.retain(|comment| comment.id != id);
        if state.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsRepo for MemoryStore {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.settings.clone().unwrap_or_else(default_settings))
    }

    async fn upsert_site_settings(&self, settings: SiteSettingsRecord) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.settings = Some(settings);
        Ok(())
    }
}

#[async_trait]
impl AuditRepo for MemoryStore {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.audit.push(record);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        self.read();
        let state = self.state.lock().await;
        Ok(state.audit.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl SiteArchiveRepo for MemoryStore {
    async fn export_archive(&self) -> Result<SiteArchive, RepoError> {
        self.read();
        let state = self.state.lock().await;
        let settings = state.settings.clone().unwrap_or_else(default_settings);
        let category_slugs: HashMap<Uuid, String> = state
            .categories
            .iter()
            .map(|c| (c.id, c.slug.clone()))
            .collect();
        let post_slugs: HashMap<Uuid, String> = state
            .posts
            .iter()
            .map(|post| (post.id, post.slug.clone()))
            .collect();

        Ok(SiteArchive {
            settings: SettingsSnapshot {
                site_title: settings.site_title,
                site_description: settings.site_description,
                posts_per_page: settings.posts_per_page,
                timezone: settings.timezone,
                footer_text: settings.footer_text,
                comments_enabled: settings.comments_enabled,
            },
            categories: state
                .categories
                .iter()
                .map(|c| CategorySnapshot {
                    slug: c.slug.clone(),
                    name: c.name.clone(),
                    description: c.description.clone(),
                })
                .collect(),
            tags: state
                .tags
                .iter()
                .map(|tag| TagSnapshot {
                    slug: tag.slug.clone(),
                    name: tag.name.clone(),
                })
                .collect(),
            posts: state
                .posts
                .iter()
                .map(|post| PostSnapshot {
                    slug: post.slug.clone(),
                    title: post.title.clone(),
                    excerpt: post.excerpt.clone(),
                    body: post.body.clone(),
                    status: post.status,
                    category_slug: post
                        .category_id
                        .and_then(|id| category_slugs.get(&id).cloned()),
                    tag_slugs: state.tags_of(post.id).into_iter().map(|tag| tag.slug).collect(),
                    view_count: post.view_count,
                    published_at: post.published_at,
                })
                .collect(),
            pages: state
                .pages
                .iter()
                .map(|page| PageSnapshot {
                    slug: page.slug.clone(),
                    title: page.title.clone(),
                    body: page.body.clone(),
                    status: page.status,
                })
                .collect(),
            menu: state
                .menu
                .iter()
                .map(|item| MenuSnapshot {
                    label: item.label.clone(),
                    destination: item.destination.clone(),
                    sort_order: item.sort_order,
                    visible: item.visible,
                })
                .collect(),
            comments: state
                .comments
                .iter()
                .filter_map(|comment| {
                    Some(CommentSnapshot {
                        post_slug: post_slugs.get(&comment.post_id)?.clone(),
                        author_name: comment.author_name.clone(),
                        author_email: comment.author_email.clone(),
                        body: comment.body.clone(),
                        status: comment.status,
                        created_at: comment.created_at,
                    })
                })
                .collect(),
        })
    }

    async fn replace_with_archive(&self, archive: &SiteArchive) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let timestamp = now();
        let audit = std::mem::take(&mut state.audit);
        *state = State {
            audit,
            ..State::default()
        };

        let mut category_ids = HashMap::new();
        for snapshot in &archive.categories {
            let id = Uuid::new_v4();
            category_ids.insert(snapshot.slug.clone(), id);
            state.categories.push(CategoryRecord {
                id,
                slug: snapshot.slug.clone(),
                name: snapshot.name.clone(),
                description: snapshot.description.clone(),
                created_at: timestamp,
                updated_at: timestamp,
            });
        }

        let mut tag_ids = HashMap::new();
        for snapshot in &archive.tags {
            let id = Uuid::new_v4();
            tag_ids.insert(snapshot.slug.clone(), id);
            state.tags.push(TagRecord {
                id,
                slug: snapshot.slug.clone(),
                name: snapshot.name.clone(),
                created_at: timestamp,
                updated_at: timestamp,
            });
        }

        let mut post_ids = HashMap::new();
        for snapshot in &archive.posts {
            let id = Uuid::new_v4();
            post_ids.insert(snapshot.slug.clone(), id);
            state.posts.push(PostRecord {
                id,
                slug: snapshot.slug.clone(),
                title: snapshot.title.clone(),
                excerpt: snapshot.excerpt.clone(),
                body: snapshot.body.clone(),
                status: snapshot.status,
                category_id: snapshot
                    .category_slug
                    .as_ref()
                    .and_then(|slug| category_ids.get(slug).copied()),
                view_count: snapshot.view_count,
                published_at: snapshot.published_at,
                created_at: timestamp,
                updated_at: timestamp,
            });
            for slug in &snapshot.tag_slugs {
                let tag_id = tag_ids.get(slug).copied().ok_or_else(|| RepoError::InvalidInput {
                    message: format!("unknown tag `{slug}`"),
                })?;
                state.post_tags.push((id, tag_id));
            }
        }

        for snapshot in &archive.comments {
            let post_id = post_ids
                .get(&snapshot.post_slug)
                .copied()
                .ok_or_else(|| RepoError::InvalidInput {
                    message: format!("unknown post `{}`", snapshot.post_slug),
                })?;
            state.comments.push(CommentRecord {
                id: Uuid::new_v4(),
                post_id,
                author_name: snapshot.author_name.clone(),
                author_email: snapshot.author_email.clone(),
                body: snapshot.body.clone(),
                status: snapshot.status,
                created_at: snapshot.created_at,
            });
        }

        for snapshot in &archive.pages {
            state.pages.push(PageRecord {
                id: Uuid::new_v4(),
                slug: snapshot.slug.clone(),
                title: snapshot.title.clone(),
                body: snapshot.body.clone(),
                status: snapshot.status,
                created_at: timestamp,
                updated_at: timestamp,
            });
        }

        for snapshot in &archive.menu {
            state.menu.push(MenuItemRecord {
                id: Uuid::new_v4(),
                label: snapshot.label.clone(),
                destination: snapshot.destination.clone(),
                sort_order: snapshot.sort_order,
                visible: snapshot.visible,
                created_at: timestamp,
                updated_at: timestamp,
            });
        }

        state.settings = Some(SiteSettingsRecord {
            site_title: archive.settings.site_title.clone(),
            site_description: archive.settings.site_description.clone(),
            posts_per_page: archive.settings.posts_per_page,
            timezone: archive.settings.timezone,
            footer_text: archive.settings.footer_text.clone(),
            comments_enabled: archive.settings.comments_enabled,
            updated_at: timestamp,
        });
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
