//! Cache trigger service.
//!
//! Admin services call the trigger after a store write has committed. The
//! trigger turns the mutation into an [`InvalidationPlan`] and applies it
//! inline, so the next read observes the new state.

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use super::events::{CacheEvent, slug_pair};
use super::planner::InvalidationPlan;
use super::store::KvCache;

const TARGET: &str = "quire::cache";

/// Summary of one applied plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationReport {
    pub keys_removed: usize,
}

#[derive(Clone)]
pub struct CacheTrigger {
    cache: KvCache,
}

impl CacheTrigger {
    pub fn new(cache: KvCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &KvCache {
        &self.cache
    }

    /// Invalidate everything `events` may have made stale.
    pub async fn apply(&self, events: &[CacheEvent]) -> InvalidationReport {
        if !self.cache.is_enabled() {
            debug!(target: TARGET, events = events.len(), "Cache trigger skipped: cache disabled");
            return InvalidationReport::default();
        }

        let plan = InvalidationPlan::from_events(events);
        if plan.is_empty() {
            return InvalidationReport::default();
        }

        let started = Instant::now();
        let keys_removed = self.execute(&plan).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        metrics::histogram!("quire_cache_invalidate_ms").record(elapsed_ms);
        metrics::counter!("quire_cache_invalidated_keys_total").increment(keys_removed as u64);

        let kinds: Vec<&'static str> = events.iter().map(CacheEvent::kind).collect();
        info!(
            target: TARGET,
            events = ?kinds,
            %plan,
            keys_removed,
            elapsed_ms,
            "Applied cache invalidation"
        );

        InvalidationReport { keys_removed }
    }

    async fn execute(&self, plan: &InvalidationPlan) -> usize {
        if plan.purge_all {
            return self.cache.purge().await;
        }

        let mut removed = plan.keys.len();
        self.cache.delete_many(&plan.keys).await;

        let tags: Vec<_> = plan.tags.iter().cloned().collect();
        removed += self.cache.invalidate_tags(&tags).await;

        for prefix in &plan.prefixes {
            removed += self.cache.clear_by_prefix(prefix).await;
        }
        removed
    }

    pub async fn post_upserted(&self, post_id: Uuid, previous_slug: Option<&str>, slug: &str) {
        self.apply(&[CacheEvent::PostUpserted {
            post_id,
            slugs: slug_pair(previous_slug, slug),
        }])
        .await;
    }

    pub async fn post_deleted(&self, post_id: Uuid, slug: &str) {
        self.apply(&[CacheEvent::PostDeleted {
            post_id,
            slug: slug.to_string(),
        }])
        .await;
    }

    pub async fn category_changed(
        &self,
        category_id: Uuid,
        previous_slug: Option<&str>,
        slug: &str,
    ) {
        self.apply(&[CacheEvent::CategoryChanged {
            category_id,
            slugs: slug_pair(previous_slug, slug),
        }])
        .await;
    }

    pub async fn tag_changed(&self, tag_id: Uuid, previous_slug: Option<&str>, slug: &str) {
        self.apply(&[CacheEvent::TagChanged {
            tag_id,
            slugs: slug_pair(previous_slug, slug),
        }])
        .await;
    }

    pub async fn page_changed(&self, previous_slug: Option<&str>, slug: &str) {
        self.apply(&[CacheEvent::PageChanged {
            slugs: slug_pair(previous_slug, slug),
        }])
        .await;
    }

    pub async fn menu_changed(&self) {
        self.apply(&[CacheEvent::MenuChanged]).await;
    }

    pub async fn comment_changed(&self, post_id: Uuid) {
        self.apply(&[CacheEvent::CommentChanged { post_id }]).await;
    }

    pub async fn settings_updated(&self) {
        self.apply(&[CacheEvent::SettingsUpdated]).await;
    }

    pub async fn site_imported(&self) -> InvalidationReport {
        self.apply(&[CacheEvent::SiteImported]).await
    }
}
