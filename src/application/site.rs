//! Import/export of site content and configuration.
//!
//! The archive references relations by slug rather than id, so an export can
//! be imported into an empty database and every row receives a fresh id.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::application::admin::audit::AdminAuditService;
use crate::application::error::AppError;
use crate::application::repos::SiteArchiveRepo;
use crate::cache::{CacheTrigger, InvalidationReport};
use crate::domain::menu::MenuDestination;
use crate::domain::types::{CommentStatus, PageStatus, PostStatus};
use crate::infra::error::InfraError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteArchive {
    pub settings: SettingsSnapshot,
    #[serde(default)]
    pub categories: Vec<CategorySnapshot>,
    #[serde(default)]
    pub tags: Vec<TagSnapshot>,
    #[serde(default)]
    pub posts: Vec<PostSnapshot>,
    #[serde(default)]
    pub pages: Vec<PageSnapshot>,
    #[serde(default)]
    pub menu: Vec<MenuSnapshot>,
    #[serde(default)]
    pub comments: Vec<CommentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub site_title: String,
    pub site_description: String,
    pub posts_per_page: i32,
    pub timezone: Tz,
    pub footer_text: Option<String>,
    pub comments_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub category_slug: Option<String>,
    #[serde(default)]
    pub tag_slugs: Vec<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub status: PageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSnapshot {
    pub label: String,
    pub destination: String,
    pub sort_order: i32,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSnapshot {
    pub post_slug: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
    pub status: CommentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SiteArchive {
    /// Put every collection in a stable order so equal sites export equal text.
    pub fn normalize(&mut self) {
        self.categories.sort_by(|a, b| a.slug.cmp(&b.slug));
        self.tags.sort_by(|a, b| a.slug.cmp(&b.slug));
        self.posts.sort_by(|a, b| a.slug.cmp(&b.slug));
        for post in &mut self.posts {
            post.tag_slugs.sort();
            post.tag_slugs.dedup();
        }
        self.pages.sort_by(|a, b| a.slug.cmp(&b.slug));
        self.menu
            .sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.label.cmp(&b.label)));
        self.comments.sort_by(|a, b| {
            a.post_slug
                .cmp(&b.post_slug)
                .then(a.created_at.cmp(&b.created_at))
        });
    }

    /// Reject archives whose slug references cannot be resolved on import.
    pub fn validate(&self) -> Result<(), AppError> {
        let categories = unique_slugs("category", self.categories.iter().map(|c| &c.slug))?;
        let tags = unique_slugs("tag", self.tags.iter().map(|t| &t.slug))?;
        let posts = unique_slugs("post", self.posts.iter().map(|p| &p.slug))?;
        unique_slugs("page", self.pages.iter().map(|p| &p.slug))?;

        for post in &self.posts {
            if post.status == PostStatus::Published && post.published_at.is_none() {
                return Err(AppError::validation(format!(
                    "published post `{}` has no published_at",
                    post.slug
                )));
            }
            if let Some(category) = post.category_slug.as_deref() {
                if !categories.contains(category) {
                    return Err(AppError::validation(format!(
                        "post `{}` references unknown category `{category}`",
                        post.slug
                    )));
                }
            }
            if let Some(tag) = post.tag_slugs.iter().find(|tag| !tags.contains(tag.as_str())) {
                return Err(AppError::validation(format!(
                    "post `{}` references unknown tag `{tag}`",
                    post.slug
                )));
            }
        }

        if let Some(comment) = self
            .comments
            .iter()
            .find(|comment| !posts.contains(comment.post_slug.as_str()))
        {
            return Err(AppError::validation(format!(
                "comment references unknown post `{}`",
                comment.post_slug
            )));
        }

        for item in &self.menu {
            MenuDestination::parse(&item.destination)?;
        }

        if self.settings.posts_per_page < 1 {
            return Err(AppError::validation("settings.posts_per_page must be positive"));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self)
            .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))
    }

    pub fn from_toml(data: &str) -> Result<Self, AppError> {
        let mut archive: SiteArchive = toml::from_str(data)
            .map_err(|err| AppError::validation(format!("invalid archive: {err}")))?;
        archive.normalize();
        archive.validate()?;
        Ok(archive)
    }
}

fn unique_slugs<'a>(
    kind: &str,
    slugs: impl Iterator<Item = &'a String>,
) -> Result<HashSet<&'a str>, AppError> {
    let mut seen = HashSet::new();
    for slug in slugs {
        if !seen.insert(slug.as_str()) {
            return Err(AppError::validation(format!("duplicate {kind} slug `{slug}`")));
        }
    }
    Ok(seen)
}

/// Whole-site export and import.
#[derive(Clone)]
pub struct SiteBackupService {
    repo: Arc<dyn SiteArchiveRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl SiteBackupService {
    pub fn new(
        repo: Arc<dyn SiteArchiveRepo>,
        audit: AdminAuditService,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            repo,
            audit,
            trigger,
        }
    }

    pub async fn export_archive(&self) -> Result<SiteArchive, AppError> {
        let mut archive = self.repo.export_archive().await?;
        archive.normalize();
        Ok(archive)
    }

    pub async fn export_toml(&self) -> Result<String, AppError> {
        self.export_archive().await?.to_toml()
    }

    /// Replace the site with `data` and drop every cached entry.
    pub async fn import_toml(
        &self,
        actor: &str,
        data: &str,
    ) -> Result<InvalidationReport, AppError> {
        let archive = SiteArchive::from_toml(data)?;
        self.repo.replace_with_archive(&archive).await?;
        let report = self.trigger.site_imported().await;

        info!(
            target: "quire::admin",
            posts = archive.posts.len(),
            pages = archive.pages.len(),
            comments = archive.comments.len(),
            keys_removed = report.keys_removed,
            "Site archive imported"
        );

        self.audit
            .record(
                actor,
                "site.import",
                "site",
                None,
                Some(&ImportSummary {
                    categories: archive.categories.len(),
                    tags: archive.tags.len(),
                    posts: archive.posts.len(),
                    pages: archive.pages.len(),
                    comments: archive.comments.len(),
                }),
            )
            .await?;

        Ok(report)
    }

    pub async fn export_to_path(&self, path: &Path) -> Result<(), AppError> {
        let encoded = self.export_toml().await?;
        tokio::fs::write(path, encoded)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))
    }

    pub async fn import_from_path(
        &self,
        actor: &str,
        path: &Path,
    ) -> Result<InvalidationReport, AppError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))?;
        self.import_toml(actor, &data).await
    }
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    categories: usize,
    tags: usize,
    posts: usize,
    pages: usize,
    comments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn archive() -> SiteArchive {
        SiteArchive {
            settings: SettingsSnapshot {
                site_title: "Quire".into(),
                site_description: "Notes".into(),
                posts_per_page: 10,
                timezone: chrono_tz::UTC,
                footer_text: None,
                comments_enabled: true,
            },
            categories: vec![CategorySnapshot {
                slug: "rust".into(),
                name: "Rust".into(),
                description: None,
            }],
            tags: vec![
                TagSnapshot {
                    slug: "tokio".into(),
                    name: "Tokio".into(),
                },
                TagSnapshot {
                    slug: "async".into(),
                    name: "Async".into(),
                },
            ],
            posts: vec![
                PostSnapshot {
                    slug: "zeta".into(),
                    title: "Zeta".into(),
                    excerpt: String::new(),
                    body: "z".into(),
                    status: PostStatus::Draft,
                    category_slug: None,
                    tag_slugs: vec![],
                    view_count: 0,
                    published_at: None,
                },
                PostSnapshot {
                    slug: "alpha".into(),
                    title: "Alpha".into(),
                    excerpt: "a".into(),
                    body: "a".into(),
                    status: PostStatus::Published,
                    category_slug: Some("rust".into()),
                    tag_slugs: vec!["tokio".into(), "async".into(), "tokio".into()],
                    view_count: 7,
                    published_at: Some(datetime!(2024-01-02 03:04:05 UTC)),
                },
            ],
            pages: vec![],
            menu: vec![
                MenuSnapshot {
                    label: "B".into(),
                    destination: "/b".into(),
                    sort_order: 2,
                    visible: true,
                },
                MenuSnapshot {
                    label: "A".into(),
                    destination: "https://example.com/".into(),
                    sort_order: 1,
                    visible: true,
                },
            ],
            comments: vec![CommentSnapshot {
                post_slug: "alpha".into(),
                author_name: "Ada".into(),
                author_email: None,
                body: "hi".into(),
                status: CommentStatus::Approved,
                created_at: datetime!(2024-01-03 00:00 UTC),
            }],
        }
    }

    #[test]
    fn normalize_orders_collections() {
        let mut archive = archive();
        archive.normalize();

        let slugs: Vec<_> = archive.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["alpha", "zeta"]);
        assert_eq!(archive.posts[0].tag_slugs, ["async", "tokio"]);
        assert_eq!(archive.tags[0].slug, "async");
        assert_eq!(archive.menu[0].label, "A");
    }

    #[test]
    fn toml_round_trip_preserves_content() {
        let mut expected = archive();
        expected.normalize();

        let encoded = expected.to_toml().expect("encode");
        let decoded = SiteArchive::from_toml(&encoded).expect("decode");
        assert_eq!(decoded, expected);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let mut broken = archive();
        broken.posts[1].category_slug = Some("missing".into());
        assert!(matches!(broken.validate(), Err(AppError::Validation(_))));

        let mut broken = archive();
        broken.comments[0].post_slug = "ghost".into();
        assert!(matches!(broken.validate(), Err(AppError::Validation(_))));

        let mut broken = archive();
        broken.tags.push(TagSnapshot {
            slug: "async".into(),
            name: "Again".into(),
        });
        assert!(matches!(broken.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn unsafe_menu_destination_is_rejected() {
        let mut broken = archive();
        broken.menu[0].destination = "javascript:alert(1)".into();
        assert!(matches!(broken.validate(), Err(AppError::Domain(_))));
    }
}
