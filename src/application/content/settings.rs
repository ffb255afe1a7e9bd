use std::sync::Arc;

use crate::application::repos::{RepoError, SettingsRepo};
use crate::cache::{CacheKey, CacheTag, KvCache, SetOptions};
use crate::domain::entities::SiteSettingsRecord;

#[derive(Clone)]
pub struct SettingsReader {
    settings: Arc<dyn SettingsRepo>,
    cache: KvCache,
}

impl SettingsReader {
    pub fn new(settings: Arc<dyn SettingsRepo>, cache: KvCache) -> Self {
        Self { settings, cache }
    }

    pub async fn site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        self.cache
            .get_or_set(
                &CacheKey::SiteSettings,
                SetOptions::tagged([CacheTag::Settings]),
                || self.settings.load_site_settings(),
            )
            .await
    }
}
