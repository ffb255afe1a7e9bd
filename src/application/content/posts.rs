use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError};
use crate::cache::{CacheKey, KvCache, SetOptions};
use crate::domain::posts::{ListingQuery, PostPage, PostView};

use super::assemble::{PostAssembler, listing_tags, view_tags};

const TARGET: &str = "quire::content";

/// Cached public reads of posts. Only published posts are ever returned.
#[derive(Clone)]
pub struct PostReader {
    posts: Arc<dyn PostsRepo>,
    counters: Arc<dyn PostsWriteRepo>,
    assembler: PostAssembler,
    cache: KvCache,
}

impl PostReader {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        counters: Arc<dyn PostsWriteRepo>,
        assembler: PostAssembler,
        cache: KvCache,
    ) -> Self {
        Self {
            posts,
            counters,
            assembler,
            cache,
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<PostView>, RepoError> {
        let key = CacheKey::Post(id);
        if let Some(view) = self.cache.get::<PostView>(&key).await {
            return Ok(Some(self.with_advisory_views(view).await));
        }

        let Some(post) = self.posts.find_by_id(id).await? else {
            return Ok(None);
        };
        if !post.status.is_public() {
            return Ok(None);
        }

        let view = self.assembler.assemble_one(post).await?;
        self.cache
            .set(&key, &view, SetOptions::tagged(view_tags(&view)))
            .await;
        Ok(Some(view))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PostView>, RepoError> {
        let key = CacheKey::PostSlug(slug.to_string());
        if let Some(view) = self.cache.get::<PostView>(&key).await {
            return Ok(Some(self.with_advisory_views(view).await));
        }

        let Some(post) = self.posts.find_by_slug(slug).await? else {
            return Ok(None);
        };
        if !post.status.is_public() {
            return Ok(None);
        }

        let view = self.assembler.assemble_one(post).await?;
        self.cache
            .set(&key, &view, SetOptions::tagged(view_tags(&view)))
            .await;
        Ok(Some(view))
    }

    /// Read a post for display and record the view.
    ///
    /// The counter is incremented atomically in the store and the returned
    /// value replaces the one in the (possibly cached) view. The cached view
    /// itself is not rewritten; the latest count is kept under a short-lived
    /// advisory key instead.
    pub async fn view_by_slug(&self, slug: &str) -> Result<Option<PostView>, RepoError> {
        let Some(mut view) = self.get_by_slug(slug).await? else {
            return Ok(None);
        };

        let count = match self.counters.increment_view_count(view.post.id).await {
            Ok(count) => count,
            // deleted between the cached read and the increment
            Err(RepoError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        metrics::counter!("quire_post_views_total").increment(1);

        view.post.view_count = count;
        let ttl = self.cache.config().views_ttl();
        self.cache
            .set(
                &CacheKey::PostViews(view.post.id),
                &count,
                SetOptions::default().with_ttl(ttl),
            )
            .await;
        Ok(Some(view))
    }

    pub async fn get_all_published(&self) -> Result<Vec<PostView>, RepoError> {
        let key = CacheKey::PostsPublished;
        if let Some(views) = self.cache.get::<Vec<PostView>>(&key).await {
            return Ok(views);
        }

        let posts = self.posts.list_all_posts(&PostQueryFilter::public()).await?;
        let views = self.assembler.assemble_many(posts).await?;

        self.cache
            .set(&key, &views, SetOptions::tagged(listing_tags(&views)))
            .await;
        Ok(views)
    }

    pub async fn get_paginated(&self, query: &ListingQuery) -> Result<PostPage, RepoError> {
        let key = CacheKey::PostList(query.clone());
        if let Some(page) = self.cache.get::<PostPage>(&key).await {
            return Ok(page);
        }

        let filter = PostQueryFilter {
            category_slug: query.category().map(str::to_string),
            tag_slug: query.tag().map(str::to_string),
            ..PostQueryFilter::public()
        };
        let total = self.posts.count_posts(&filter).await?;
        let posts = if query.offset() < total {
            self.posts
                .list_posts(&filter, query.per_page(), query.offset())
                .await?
        } else {
            Vec::new()
        };
        let items = self.assembler.assemble_many(posts).await?;

        let page = PostPage {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total,
        };
        self.cache
            .set(&key, &page, SetOptions::tagged(listing_tags(&page.items)))
            .await;
        Ok(page)
    }

    /// Latest published posts, newest first.
    pub(crate) async fn latest(&self, limit: u32) -> Result<Vec<PostView>, RepoError> {
        let posts = self
            .posts
            .list_posts(&PostQueryFilter::public(), limit, 0)
            .await?;
        self.assembler.assemble_many(posts).await
    }

    /// Overlay a fresher advisory view count onto a cached view.
    async fn with_advisory_views(&self, mut view: PostView) -> PostView {
        let advisory = self
            .cache
            .get::<i64>(&CacheKey::PostViews(view.post.id))
            .await;
        if let Some(count) = advisory.filter(|count| *count > view.post.view_count) {
            debug!(target: TARGET, post_id = %view.post.id, count, "Using advisory view count");
            view.post.view_count = count;
        }
        view
    }
}
