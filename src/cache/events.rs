//! Content mutations that require cache invalidation.

use uuid::Uuid;

/// A committed change to cached content.
///
/// Slug-bearing variants carry every slug the entity had before and after the
/// change, so entries cached under a renamed slug are dropped as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A post was created or updated.
    PostUpserted { post_id: Uuid, slugs: Vec<String> },
    PostDeleted { post_id: Uuid, slug: String },
    CategoryChanged { category_id: Uuid, slugs: Vec<String> },
    TagChanged { tag_id: Uuid, slugs: Vec<String> },
    PageChanged { slugs: Vec<String> },
    MenuChanged,
    /// A comment on `post_id` was added, moderated or removed.
    CommentChanged { post_id: Uuid },
    SettingsUpdated,
    /// The whole site was replaced from a backup archive.
    SiteImported,
}

impl CacheEvent {
    /// Stable label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::PostUpserted { .. } => "post_upserted",
            CacheEvent::PostDeleted { .. } => "post_deleted",
            CacheEvent::CategoryChanged { .. } => "category_changed",
            CacheEvent::TagChanged { .. } => "tag_changed",
            CacheEvent::PageChanged { .. } => "page_changed",
            CacheEvent::MenuChanged => "menu_changed",
            CacheEvent::CommentChanged { .. } => "comment_changed",
            CacheEvent::SettingsUpdated => "settings_updated",
            CacheEvent::SiteImported => "site_imported",
        }
    }
}

/// Slugs worth invalidating: both sides of a rename, deduplicated.
pub fn slug_pair(previous: Option<&str>, current: &str) -> Vec<String> {
    let mut slugs = Vec::with_capacity(2);
    if let Some(previous) = previous.filter(|previous| *previous != current) {
        slugs.push(previous.to_string());
    }
    slugs.push(current.to_string());
    slugs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_pair_keeps_both_sides_of_a_rename() {
        assert_eq!(slug_pair(Some("old"), "new"), vec!["old", "new"]);
        assert_eq!(slug_pair(Some("same"), "same"), vec!["same"]);
        assert_eq!(slug_pair(None, "fresh"), vec!["fresh"]);
    }

    #[test]
    fn kind_labels_are_snake_case() {
        assert_eq!(CacheEvent::MenuChanged.kind(), "menu_changed");
        assert_eq!(
            CacheEvent::CommentChanged {
                post_id: Uuid::nil()
            }
            .kind(),
            "comment_changed"
        );
    }
}
