//! Cache key namespace.
//!
//! Every cache key and invalidation tag in the crate is rendered here. Reads
//! and writes build a [`CacheKey`] and never format key strings themselves, so
//! a reader and the mutation that invalidates it cannot drift apart.

use std::fmt;

use uuid::Uuid;

use crate::domain::posts::{ALL_FILTER, ListingQuery};

/// Prefix shared by every paginated post listing key.
pub const POST_LIST_PREFIX: &str = "posts:list:";

/// Prefix of the tag index markers kept alongside cached entries.
pub const TAG_INDEX_PREFIX: &str = "tagidx:";

/// Separator between a tag and the key it indexes inside a marker.
pub const TAG_INDEX_SEPARATOR: char = '#';

/// Every key family owned by the content cache, used to purge the namespace.
pub const NAMESPACE_PREFIXES: &[&str] = &[
    "post:",
    "posts:",
    "category:",
    "categories:",
    "tag:",
    "tags:",
    "page:",
    "pages:",
    "menu:",
    "comments:",
    "site:",
    TAG_INDEX_PREFIX,
];

/// A cache entry identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Assembled post view by id.
    Post(Uuid),
    /// Assembled post view by slug.
    PostSlug(String),
    /// One page of the public listing.
    PostList(ListingQuery),
    /// Every published post.
    PostsPublished,
    /// Advisory view counter.
    PostViews(Uuid),
    Categories,
    CategorySlug(String),
    Tags,
    TagSlug(String),
    Pages,
    PageSlug(String),
    Menu,
    /// Approved comments of one post.
    Comments(Uuid),
    SiteSettings,
    HomeStats,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Post(id) => write!(f, "post:{id}"),
            CacheKey::PostSlug(slug) => write!(f, "post:slug:{}", Segment(slug)),
            CacheKey::PostList(query) => write!(
                f,
                "{POST_LIST_PREFIX}{}:{}:{}:{}",
                query.page(),
                query.per_page(),
                Segment(query.category().unwrap_or(ALL_FILTER)),
                Segment(query.tag().unwrap_or(ALL_FILTER)),
            ),
            CacheKey::PostsPublished => f.write_str("posts:all"),
            CacheKey::PostViews(id) => write!(f, "post:views:{id}"),
            CacheKey::Categories => f.write_str("categories:all"),
            CacheKey::CategorySlug(slug) => write!(f, "category:slug:{}", Segment(slug)),
            CacheKey::Tags => f.write_str("tags:all"),
            CacheKey::TagSlug(slug) => write!(f, "tag:slug:{}", Segment(slug)),
            CacheKey::Pages => f.write_str("pages:all"),
            CacheKey::PageSlug(slug) => write!(f, "page:slug:{}", Segment(slug)),
            CacheKey::Menu => f.write_str("menu:all"),
            CacheKey::Comments(post_id) => write!(f, "comments:post:{post_id}"),
            CacheKey::SiteSettings => f.write_str("site:settings"),
            CacheKey::HomeStats => f.write_str("site:stats"),
        }
    }
}

/// A label attached to cache entries; invalidating it drops every entry carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    Post(Uuid),
    Category(Uuid),
    Tag(Uuid),
    Comments(Uuid),
    /// Any multi-post result: listings, the published set, the stats aggregate.
    Listing,
    /// Counts shown on the home page.
    Stats,
    /// Category and tag collections.
    Taxonomy,
    Pages,
    Menu,
    Settings,
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Post(id) => write!(f, "post:{id}"),
            CacheTag::Category(id) => write!(f, "category:{id}"),
            CacheTag::Tag(id) => write!(f, "tag:{id}"),
            CacheTag::Comments(id) => write!(f, "comments:{id}"),
            CacheTag::Listing => f.write_str("listing"),
            CacheTag::Stats => f.write_str("stats"),
            CacheTag::Taxonomy => f.write_str("taxonomy"),
            CacheTag::Pages => f.write_str("pages"),
            CacheTag::Menu => f.write_str("menu"),
            CacheTag::Settings => f.write_str("settings"),
        }
    }
}

/// Prefix under which the markers of `tag` live.
pub fn tag_index_prefix(tag: &CacheTag) -> String {
    format!("{TAG_INDEX_PREFIX}{tag}{TAG_INDEX_SEPARATOR}")
}

/// Marker recording that `key` carries `tag`.
pub fn tag_index_marker(tag: &CacheTag, key: &str) -> String {
    format!("{}{key}", tag_index_prefix(tag))
}

/// Free-form key segment with separator characters escaped.
///
/// Slugs and filters come from requests, so `:` (segment separator), `#` (tag
/// index separator) and `%` (the escape itself) are percent-encoded.
struct Segment<'a>(&'a str);

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '%' => f.write_str("%25")?,
                ':' => f.write_str("%3A")?,
                '#' => f.write_str("%23")?,
                other => fmt::Write::write_char(f, other)?,
            }
        }
        Ok(())
    }
}
