use std::sync::Arc;

use crate::application::repos::{MenuRepo, PagesRepo, RepoError};
use crate::cache::{CacheKey, CacheTag, KvCache, SetOptions};
use crate::domain::entities::{MenuItemRecord, PageRecord};
use crate::domain::types::PageStatus;

/// Cached reads of published static pages.
#[derive(Clone)]
pub struct PageReader {
    pages: Arc<dyn PagesRepo>,
    cache: KvCache,
}

impl PageReader {
    pub fn new(pages: Arc<dyn PagesRepo>, cache: KvCache) -> Self {
        Self { pages, cache }
    }

    pub async fn published_pages(&self) -> Result<Vec<PageRecord>, RepoError> {
        self.cache
            .get_or_set(&CacheKey::Pages, SetOptions::tagged([CacheTag::Pages]), || {
                self.pages.list_pages(Some(PageStatus::Published))
            })
            .await
    }

    pub async fn page_by_slug(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        self.cache
            .get_or_set_optional(
                &CacheKey::PageSlug(slug.to_string()),
                SetOptions::tagged([CacheTag::Pages]),
                || async {
                    let page = self.pages.find_by_slug(slug).await?;
                    Ok::<_, RepoError>(page.filter(|page| page.status == PageStatus::Published))
                },
            )
            .await
    }
}

#[derive(Clone)]
pub struct MenuReader {
    menu: Arc<dyn MenuRepo>,
    cache: KvCache,
}

impl MenuReader {
    pub fn new(menu: Arc<dyn MenuRepo>, cache: KvCache) -> Self {
        Self { menu, cache }
    }

    /// Visible items in display order.
    pub async fn visible_items(&self) -> Result<Vec<MenuItemRecord>, RepoError> {
        self.cache
            .get_or_set(&CacheKey::Menu, SetOptions::tagged([CacheTag::Menu]), || {
                self.menu.list_items(true)
            })
            .await
    }
}
