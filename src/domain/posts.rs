//! Assembled post views and the canonical listing query.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};

/// Placeholder used for an absent listing filter.
pub const ALL_FILTER: &str = "all";

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// A post together with its resolved relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub category: Option<CategoryRecord>,
    pub tags: Vec<TagRecord>,
    pub comment_count: i64,
}

/// One page of a post listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub items: Vec<PostView>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PostPage {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

/// Aggregate shown on the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeStats {
    pub published_posts: u64,
    pub categories: u64,
    pub tags: u64,
    pub approved_comments: u64,
    pub total_views: i64,
    pub latest: Vec<PostView>,
}

/// Public listing parameters in canonical form.
///
/// Two requests meaning the same thing always normalize to equal values:
/// missing, blank and `all` filters collapse to `None`, slugs are trimmed and
/// lowercased, and the page number is at least one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingQuery {
    page: u32,
    per_page: u32,
    category: Option<String>,
    tag: Option<String>,
}

impl ListingQuery {
    pub fn new(
        page: Option<u32>,
        per_page: u32,
        category: Option<&str>,
        tag: Option<&str>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            category: canonical_filter(category),
            tag: canonical_filter(tag),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

fn canonical_filter(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL_FILTER) {
        return None;
    }
    Some(value.to_lowercase())
}
