use std::sync::Arc;

use crate::application::repos::{
    CategoriesRepo, CommentsRepo, PostQueryFilter, PostsRepo, RepoError, TagsRepo,
};
use crate::cache::{CacheKey, CacheTag, KvCache, SetOptions};
use crate::domain::posts::HomeStats;

use super::assemble::listing_tags;
use super::posts::PostReader;

const LATEST_POSTS: u32 = 5;

/// Home page aggregate.
#[derive(Clone)]
pub struct StatsReader {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
    reader: PostReader,
    cache: KvCache,
}

impl StatsReader {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
        reader: PostReader,
        cache: KvCache,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            comments,
            reader,
            cache,
        }
    }

    pub async fn home_stats(&self) -> Result<HomeStats, RepoError> {
        let key = CacheKey::HomeStats;
        if let Some(stats) = self.cache.get::<HomeStats>(&key).await {
            return Ok(stats);
        }

        let published_posts = self.posts.count_posts(&PostQueryFilter::public()).await?;
        let categories = self.categories.list_all().await?.len() as u64;
        let tags = self.tags.list_all().await?.len() as u64;
        let approved_comments = self.comments.count_approved().await?;
        let total_views = self.posts.total_views().await?;
        let latest = self.reader.latest(LATEST_POSTS).await?;

        let stats = HomeStats {
            published_posts,
            categories,
            tags,
            approved_comments,
            total_views,
            latest,
        };

        let mut tags = listing_tags(&stats.latest);
        tags.push(CacheTag::Stats);
        tags.push(CacheTag::Taxonomy);
        // total_views moves on every page view without invalidating anything
        let ttl = self.cache.config().views_ttl();
        self.cache
            .set(&key, &stats, SetOptions::tagged(tags).with_ttl(ttl))
            .await;
        Ok(stats)
    }
}
