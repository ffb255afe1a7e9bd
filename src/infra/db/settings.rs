use async_trait::async_trait;
use chrono_tz::Tz;
use time::OffsetDateTime;

use crate::{
    application::repos::{RepoError, SettingsRepo},
    domain::entities::SiteSettingsRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

pub(super) const SETTINGS_ROW_ID: i16 = 1;

#[derive(sqlx::FromRow)]
struct SiteSettingsRow {
    site_title: String,
    site_description: String,
    posts_per_page: i32,
    timezone: String,
    footer_text: Option<String>,
    comments_enabled: bool,
    updated_at: OffsetDateTime,
}

impl TryFrom<SiteSettingsRow> for SiteSettingsRecord {
    type Error = RepoError;

    fn try_from(row: SiteSettingsRow) -> Result<Self, Self::Error> {
        let timezone = row
            .timezone
            .parse::<Tz>()
            .map_err(|err| RepoError::Integrity {
                message: format!("invalid timezone `{}`: {err}", row.timezone),
            })?;

        Ok(Self {
            site_title: row.site_title,
            site_description: row.site_description,
            posts_per_page: row.posts_per_page,
            timezone,
            footer_text: row.footer_text,
            comments_enabled: row.comments_enabled,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl SettingsRepo for PostgresRepositories {
    async fn load_site_settings(&self) -> Result<SiteSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, SiteSettingsRow>(
            r#"
            SELECT site_title,
                   site_description,
                   posts_per_page,
                   timezone,
                   footer_text,
                   comments_enabled,
                   updated_at
            FROM site_settings
            WHERE id = $1
            "#,
        )
        .bind(SETTINGS_ROW_ID)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        SiteSettingsRecord::try_from(row)
    }

    async fn upsert_site_settings(&self, settings: SiteSettingsRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO site_settings (
                id, site_title, site_description, posts_per_page, timezone,
                footer_text, comments_enabled, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET site_title = EXCLUDED.site_title,
                site_description = EXCLUDED.site_description,
                posts_per_page = EXCLUDED.posts_per_page,
                timezone = EXCLUDED.timezone,
                footer_text = EXCLUDED.footer_text,
                comments_enabled = EXCLUDED.comments_enabled,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(SETTINGS_ROW_ID)
        .bind(settings.site_title)
        .bind(settings.site_description)
        .bind(settings.posts_per_page)
        .bind(settings.timezone.name())
        .bind(settings.footer_text)
        .bind(settings.comments_enabled)
        .bind(settings.updated_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
