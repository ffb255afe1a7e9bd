//! Invalidation plan generation.
//!
//! Maps committed [`CacheEvent`]s onto the keys, tags and prefixes whose
//! cached values may now be stale. Several events merge into one plan.
//!
//! Readers tag what they store (see `application::content`):
//!
//! - post views carry `post:{id}`, `category:{id}`, `tag:{id}` and
//!   `comments:{id}` for the post and every relation embedded in them;
//! - listings, the published set and the stats aggregate carry `listing`;
//! - category and tag collections carry `taxonomy`.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use uuid::Uuid;

use super::events::CacheEvent;
use super::keys::{CacheKey, CacheTag, POST_LIST_PREFIX};

/// Everything one batch of events invalidates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: HashSet<CacheKey>,
    pub tags: BTreeSet<CacheTag>,
    pub prefixes: BTreeSet<&'static str>,
    /// Drop the whole namespace; set after a site import.
    pub purge_all: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ keys: {}, tags: {}, prefixes: {}, purge_all: {} }}",
            self.keys.len(),
            self.tags.len(),
            self.prefixes.len(),
            self.purge_all,
        )
    }
}

impl InvalidationPlan {
    pub fn from_events(events: &[CacheEvent]) -> Self {
        let mut plan = Self::default();

        for event in events {
            match event {
                CacheEvent::PostUpserted { post_id, slugs } => {
                    plan.post(*post_id, slugs.iter().map(String::as_str));
                }
                CacheEvent::PostDeleted { post_id, slug } => {
                    plan.post(*post_id, [slug.as_str()]);
                }
                CacheEvent::CategoryChanged { category_id, slugs } => {
                    plan.keys.insert(CacheKey::Categories);
                    plan.keys
                        .extend(slugs.iter().cloned().map(CacheKey::CategorySlug));
                    plan.tags.insert(CacheTag::Category(*category_id));
                    plan.taxonomy();
                }
                CacheEvent::TagChanged { tag_id, slugs } => {
                    plan.keys.insert(CacheKey::Tags);
                    plan.keys.extend(slugs.iter().cloned().map(CacheKey::TagSlug));
                    plan.tags.insert(CacheTag::Tag(*tag_id));
                    plan.taxonomy();
                }
                CacheEvent::PageChanged { slugs } => {
                    plan.keys.insert(CacheKey::Pages);
                    plan.keys.extend(slugs.iter().cloned().map(CacheKey::PageSlug));
                    plan.tags.insert(CacheTag::Pages);
                }
                CacheEvent::MenuChanged => {
                    plan.keys.insert(CacheKey::Menu);
                    plan.tags.insert(CacheTag::Menu);
                }
                CacheEvent::CommentChanged { post_id } => {
                    plan.keys.insert(CacheKey::Comments(*post_id));
                    plan.tags.insert(CacheTag::Comments(*post_id));
                    plan.tags.insert(CacheTag::Post(*post_id));
                    plan.tags.insert(CacheTag::Stats);
                    plan.prefixes.insert(POST_LIST_PREFIX);
                }
                CacheEvent::SettingsUpdated => {
                    plan.keys.insert(CacheKey::SiteSettings);
                    plan.tags.insert(CacheTag::Settings);
                    plan.tags.insert(CacheTag::Listing);
                    plan.prefixes.insert(POST_LIST_PREFIX);
                }
                CacheEvent::SiteImported => {
                    plan.purge_all = true;
                }
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.tags.is_empty() && self.prefixes.is_empty() && !self.purge_all
    }

    fn post<'s>(&mut self, post_id: Uuid, slugs: impl IntoIterator<Item = &'s str>) {
        self.keys.insert(CacheKey::Post(post_id));
        self.keys.insert(CacheKey::PostViews(post_id));
        self.keys.insert(CacheKey::PostsPublished);
        self.keys.insert(CacheKey::HomeStats);
        self.keys
            .extend(slugs.into_iter().map(|slug| CacheKey::PostSlug(slug.to_string())));
        self.tags.insert(CacheTag::Post(post_id));
        self.tags.insert(CacheTag::Listing);
        self.tags.insert(CacheTag::Stats);
        self.prefixes.insert(POST_LIST_PREFIX);
    }

    fn taxonomy(&mut self) {
        self.keys.insert(CacheKey::HomeStats);
        self.tags.insert(CacheTag::Taxonomy);
        self.tags.insert(CacheTag::Listing);
        self.tags.insert(CacheTag::Stats);
        self.prefixes.insert(POST_LIST_PREFIX);
    }
}
