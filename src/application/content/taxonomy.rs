use std::sync::Arc;

use crate::application::repos::{CategoriesRepo, RepoError, TagsRepo};
use crate::cache::{CacheKey, CacheTag, KvCache, SetOptions};
use crate::domain::entities::{CategoryRecord, TagRecord};

/// Cached category and tag collections.
#[derive(Clone)]
pub struct TaxonomyReader {
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    cache: KvCache,
}

impl TaxonomyReader {
    pub fn new(
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        cache: KvCache,
    ) -> Self {
        Self {
            categories,
            tags,
            cache,
        }
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        self.cache
            .get_or_set(
                &CacheKey::Categories,
                SetOptions::tagged([CacheTag::Taxonomy]),
                || self.categories.list_all(),
            )
            .await
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        self.cache
            .get_or_set_optional(
                &CacheKey::CategorySlug(slug.to_string()),
                SetOptions::tagged([CacheTag::Taxonomy]),
                || self.categories.find_by_slug(slug),
            )
            .await
    }

    pub async fn tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        self.cache
            .get_or_set(
                &CacheKey::Tags,
                SetOptions::tagged([CacheTag::Taxonomy]),
                || self.tags.list_all(),
            )
            .await
    }

    pub async fn tag_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
        self.cache
            .get_or_set_optional(
                &CacheKey::TagSlug(slug.to_string()),
                SetOptions::tagged([CacheTag::Taxonomy]),
                || self.tags.find_by_slug(slug),
            )
            .await
    }
}
