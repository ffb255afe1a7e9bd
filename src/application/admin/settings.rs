use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::slugs::optional;
use crate::application::repos::{RepoError, SettingsRepo};
use crate::cache::CacheTrigger;
use crate::domain::entities::SiteSettingsRecord;
use crate::domain::posts::MAX_PER_PAGE;

#[derive(Debug, Error)]
pub enum AdminSettingsError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct UpdateSettingsCommand {
    pub site_title: String,
    pub site_description: String,
    pub posts_per_page: i32,
    pub timezone: Tz,
    pub footer_text: Option<String>,
    pub comments_enabled: bool,
}

#[derive(Clone)]
pub struct AdminSettingsService {
    repo: Arc<dyn SettingsRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminSettingsService {
    pub fn new(repo: Arc<dyn SettingsRepo>, audit: AdminAuditService, trigger: CacheTrigger) -> Self {
        Self {
            repo,
            audit,
            trigger,
        }
    }

    pub async fn load(&self) -> Result<SiteSettingsRecord, AdminSettingsError> {
        self.repo
            .load_site_settings()
            .await
            .map_err(AdminSettingsError::from)
    }

    pub async fn update(
        &self,
        actor: &str,
        command: UpdateSettingsCommand,
    ) -> Result<SiteSettingsRecord, AdminSettingsError> {
        ensure_non_empty(&command.site_title, "site_title")?;
        if command.posts_per_page < 1 || command.posts_per_page > MAX_PER_PAGE as i32 {
            return Err(AdminSettingsError::ConstraintViolation("posts_per_page"));
        }

        let mut record = self.repo.load_site_settings().await?;
        record.site_title = command.site_title.trim().to_string();
        record.site_description = command.site_description.trim().to_string();
        record.posts_per_page = command.posts_per_page;
        record.timezone = command.timezone;
        record.footer_text = optional(command.footer_text);
        record.comments_enabled = command.comments_enabled;
        record.updated_at = OffsetDateTime::now_utc();

        self.repo.upsert_site_settings(record).await?;
        self.trigger.settings_updated().await;

        let latest = self.repo.load_site_settings().await?;
        let snapshot = SettingsSnapshot::from(&latest);
        self.audit
            .record(actor, "settings.update", "settings", None, Some(&snapshot))
            .await?;

        Ok(latest)
    }
}

#[derive(Debug, Serialize)]
struct SettingsSnapshot<'a> {
    site_title: &'a str,
    posts_per_page: i32,
    timezone: &'a str,
    comments_enabled: bool,
}

impl<'a> From<&'a SiteSettingsRecord> for SettingsSnapshot<'a> {
    fn from(record: &'a SiteSettingsRecord) -> Self {
        Self {
            site_title: record.site_title.as_str(),
            posts_per_page: record.posts_per_page,
            timezone: record.timezone.name(),
            comments_enabled: record.comments_enabled,
        }
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminSettingsError> {
    if value.trim().is_empty() {
        return Err(AdminSettingsError::ConstraintViolation(field));
    }
    Ok(())
}
