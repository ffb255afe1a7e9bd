use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::slugs::{SlugFailure, required, resolve_slug};
use crate::application::repos::{
    CreatePageParams, PagesRepo, PagesWriteRepo, RepoError, UpdatePageParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::PageRecord;
use crate::domain::types::PageStatus;

#[derive(Debug, Error)]
pub enum AdminPageError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminPageError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Constraint(field) => Self::ConstraintViolation(field),
            SlugFailure::Repo(err) => Self::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePageCommand {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub status: PageStatus,
}

#[derive(Debug, Clone)]
pub struct UpdatePageCommand {
    pub id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub status: PageStatus,
}

#[derive(Clone)]
pub struct AdminPageService {
    reader: Arc<dyn PagesRepo>,
    writer: Arc<dyn PagesWriteRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminPageService {
    pub fn new(
        reader: Arc<dyn PagesRepo>,
        writer: Arc<dyn PagesWriteRepo>,
        audit: AdminAuditService,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            audit,
            trigger,
        }
    }

    pub async fn list(&self, status: Option<PageStatus>) -> Result<Vec<PageRecord>, AdminPageError> {
        self.reader
            .list_pages(status)
            .await
            .map_err(AdminPageError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PageRecord>, AdminPageError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminPageError::from)
    }

    pub async fn create_page(
        &self,
        actor: &str,
        command: CreatePageCommand,
    ) -> Result<PageRecord, AdminPageError> {
        let title = required(&command.title, "title").map_err(AdminPageError::ConstraintViolation)?;
        ensure_non_empty(&command.body, "body")?;
        let slug = self.choose_slug(command.slug.as_deref(), None, &title).await?;

        let page = self
            .writer
            .create_page(CreatePageParams {
                slug,
                title,
                body: command.body,
                status: command.status,
            })
            .await?;
        self.trigger.page_changed(None, &page.slug).await;
        self.audit
            .record(
                actor,
                "page.create",
                "page",
                Some(&page.id.to_string()),
                Some(&PageSnapshot::from(&page)),
            )
            .await?;
        Ok(page)
    }

    pub async fn update_page(
        &self,
        actor: &str,
        command: UpdatePageCommand,
    ) -> Result<PageRecord, AdminPageError> {
        let title = required(&command.title, "title").map_err(AdminPageError::ConstraintViolation)?;
        ensure_non_empty(&command.body, "body")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(RepoError::NotFound)?;
        let slug = self
            .choose_slug(
                command.slug.as_deref(),
                Some((existing.id, existing.slug.as_str())),
                &title,
            )
            .await?;

        let page = self
            .writer
            .update_page(UpdatePageParams {
                id: existing.id,
                slug,
                title,
                body: command.body,
                status: command.status,
            })
            .await?;
        self.trigger
            .page_changed(Some(&existing.slug), &page.slug)
            .await;
        self.audit
            .record(
                actor,
                "page.update",
                "page",
                Some(&page.id.to_string()),
                Some(&PageSnapshot::from(&page)),
            )
            .await?;
        Ok(page)
    }

    pub async fn delete_page(&self, actor: &str, id: Uuid) -> Result<(), AdminPageError> {
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        self.writer.delete_page(id).await?;
        self.trigger.page_changed(None, &existing.slug).await;
        self.audit
            .record(
                actor,
                "page.delete",
                "page",
                Some(&id.to_string()),
                Some(&PageSnapshot::from(&existing)),
            )
            .await?;
        Ok(())
    }

    async fn choose_slug(
        &self,
        explicit: Option<&str>,
        current: Option<(Uuid, &str)>,
        title: &str,
    ) -> Result<String, AdminPageError> {
        let reader = self.reader.clone();
        let slug = resolve_slug(explicit, current, title, "title", move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.map(|page| page.id))
            }
        })
        .await?;
        Ok(slug)
    }
}

#[derive(Debug, Serialize)]
struct PageSnapshot<'a> {
    slug: &'a str,
    title: &'a str,
    status: PageStatus,
}

impl<'a> From<&'a PageRecord> for PageSnapshot<'a> {
    fn from(page: &'a PageRecord) -> Self {
        Self {
            slug: page.slug.as_str(),
            title: page.title.as_str(),
            status: page.status,
        }
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminPageError> {
    if value.trim().is_empty() {
        return Err(AdminPageError::ConstraintViolation(field));
    }
    Ok(())
}
