use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::slugs::{SlugFailure, optional, required, resolve_slug};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, RepoError, UpdateCategoryParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::CategoryRecord;

#[derive(Debug, Error)]
pub enum AdminCategoryError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("category is referenced by {count} posts")]
    InUse { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminCategoryError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Constraint(field) => Self::ConstraintViolation(field),
            SlugFailure::Repo(err) => Self::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
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

    pub async fn list_all(&self) -> Result<Vec<CategoryRecord>, AdminCategoryError> {
        self.reader
            .list_all()
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, AdminCategoryError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminCategoryError::from)
    }

    pub async fn create_category(
        &self,
        actor: &str,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name =
            required(&command.name, "name").map_err(AdminCategoryError::ConstraintViolation)?;
        let slug = self.choose_slug(command.slug.as_deref(), None, &name).await?;

        let category = self
            .writer
            .create_category(CreateCategoryParams {
                slug,
                name,
                description: optional(command.description),
            })
            .await?;
        self.trigger
            .category_changed(category.id, None, &category.slug)
            .await;
        self.audit
            .record(
                actor,
                "category.create",
                "category",
                Some(&category.id.to_string()),
                Some(&CategorySnapshot::from(&category)),
            )
            .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &str,
        command: UpdateCategoryCommand,
    ) -> Result<CategoryRecord, AdminCategoryError> {
        let name =
            required(&command.name, "name").map_err(AdminCategoryError::ConstraintViolation)?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(RepoError::NotFound)?;
        let slug = self
            .choose_slug(
                command.slug.as_deref(),
                Some((existing.id, existing.slug.as_str())),
                &name,
            )
            .await?;

        let category = self
            .writer
            .update_category(UpdateCategoryParams {
                id: existing.id,
                slug,
                name,
                description: optional(command.description),
            })
            .await?;
        self.trigger
            .category_changed(category.id, Some(&existing.slug), &category.slug)
            .await;
        self.audit
            .record(
                actor,
                "category.update",
                "category",
                Some(&category.id.to_string()),
                Some(&CategorySnapshot::from(&category)),
            )
            .await?;
        Ok(category)
    }

    pub async fn delete_category(&self, actor: &str, id: Uuid) -> Result<(), AdminCategoryError> {
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(RepoError::NotFound)?;
        let usage = self.reader.count_usage(id).await?;
        if usage > 0 {
            return Err(AdminCategoryError::InUse { count: usage });
        }

        self.writer.delete_category(id).await?;
        self.trigger.category_changed(id, None, &existing.slug).await;
        self.audit
            .record(
                actor,
                "category.delete",
                "category",
                Some(&id.to_string()),
                Some(&CategorySnapshot::from(&existing)),
            )
            .await?;
        Ok(())
    }

    async fn choose_slug(
        &self,
        explicit: Option<&str>,
        current: Option<(Uuid, &str)>,
        name: &str,
    ) -> Result<String, AdminCategoryError> {
        let reader = self.reader.clone();
        let slug = resolve_slug(explicit, current, name, "name", move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.map(|category| category.id))
            }
        })
        .await?;
        Ok(slug)
    }
}

#[derive(Debug, Serialize)]
struct CategorySnapshot<'a> {
    slug: &'a str,
    name: &'a str,
    description: Option<&'a str>,
}

impl<'a> From<&'a CategoryRecord> for CategorySnapshot<'a> {
    fn from(category: &'a CategoryRecord) -> Self {
        Self {
            slug: category.slug.as_str(),
            name: category.name.as_str(),
            description: category.description.as_deref(),
        }
    }
}
