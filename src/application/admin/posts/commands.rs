use uuid::Uuid;

use super::service::AdminPostService;
use super::types::{
    AdminPostError, CreatePostCommand, PostSummarySnapshot, UpdatePostCommand, ensure_non_empty,
    normalize_published_at,
};
use crate::application::admin::slugs::resolve_slug;
use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;

impl AdminPostService {
    pub async fn create_post(
        &self,
        actor: &str,
        command: CreatePostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.body, "body")?;
        self.ensure_relations(command.category_id, &command.tag_ids)
            .await?;

        let title = command.title.trim().to_string();
        let slug = self.choose_slug(command.slug.as_deref(), None, &title).await?;

        let params = CreatePostParams {
            slug,
            title,
            excerpt: command.excerpt.trim().to_string(),
            body: command.body,
            status: command.status,
            category_id: command.category_id,
            published_at: normalize_published_at(command.status, command.published_at, None),
        };

        let post = self.writer.create_post(params).await?;
        let tag_ids = dedup(command.tag_ids);
        let tagged = self.writer.replace_post_tags(post.id, &tag_ids).await;

        // the post row is committed; invalidate even if the tag write failed
        self.trigger.post_upserted(post.id, None, &post.slug).await;
        tagged?;

        self.audit
            .record(
                actor,
                "post.create",
                "post",
                Some(&post.id.to_string()),
                Some(&snapshot(&post, &tag_ids)),
            )
            .await?;
        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &str,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.body, "body")?;

        let existing = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(RepoError::NotFound)?;
        let tag_ids = command.tag_ids.map(dedup);
        self.ensure_relations(command.category_id, tag_ids.as_deref().unwrap_or_default())
            .await?;

        let title = command.title.trim().to_string();
        let slug = self
            .choose_slug(
                command.slug.as_deref(),
                Some((existing.id, existing.slug.as_str())),
                &title,
            )
            .await?;

        let params = UpdatePostParams {
            id: existing.id,
            slug,
            title,
            excerpt: command.excerpt.trim().to_string(),
            body: command.body,
            status: command.status,
            category_id: command.category_id,
            published_at: normalize_published_at(
                command.status,
                command.published_at,
                existing.published_at,
            ),
        };

        let post = self.writer.update_post(params).await?;
        let tagged = match tag_ids.as_deref() {
            Some(tag_ids) => self.writer.replace_post_tags(post.id, tag_ids).await,
            None => Ok(()),
        };

        self.trigger
            .post_upserted(post.id, Some(&existing.slug), &post.slug)
            .await;
        tagged?;

        self.audit
            .record(
                actor,
                "post.update",
                "post",
                Some(&post.id.to_string()),
                Some(&snapshot(&post, tag_ids.as_deref().unwrap_or_default())),
            )
            .await?;
        Ok(post)
    }

    pub async fn delete_post(&self, actor: &str, id: Uuid) -> Result<(), AdminPostError> {
        let existing = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(RepoError::NotFound)?;

        self.writer.delete_post(id).await?;
        self.trigger.post_deleted(id, &existing.slug).await;
        self.audit
            .record(
                actor,
                "post.delete",
                "post",
                Some(&id.to_string()),
                Some(&snapshot(&existing, &[])),
            )
            .await?;
        Ok(())
    }

    /// Replace only the tag set of a post.
    pub async fn replace_tags(
        &self,
        actor: &str,
        post_id: Uuid,
        tag_ids: Vec<Uuid>,
    ) -> Result<(), AdminPostError> {
        let post = self
            .reader
            .find_by_id(post_id)
            .await?
            .ok_or(RepoError::NotFound)?;
        let tag_ids = dedup(tag_ids);
        self.ensure_relations(None, &tag_ids).await?;

        self.writer.replace_post_tags(post_id, &tag_ids).await?;
        self.trigger.post_upserted(post_id, None, &post.slug).await;
        self.audit
            .record(
                actor,
                "post.tags",
                "post",
                Some(&post_id.to_string()),
                Some(&snapshot(&post, &tag_ids)),
            )
            .await?;
        Ok(())
    }

    async fn ensure_relations(
        &self,
        category_id: Option<Uuid>,
        tag_ids: &[Uuid],
    ) -> Result<(), AdminPostError> {
        if let Some(category_id) = category_id {
            if self.categories.find_by_id(category_id).await?.is_none() {
                return Err(AdminPostError::ConstraintViolation("category_id"));
            }
        }

        for tag_id in tag_ids {
            if self.tags.find_by_id(*tag_id).await?.is_none() {
                return Err(AdminPostError::ConstraintViolation("tag_ids"));
            }
        }
        Ok(())
    }

    async fn choose_slug(
        &self,
        explicit: Option<&str>,
        current: Option<(Uuid, &str)>,
        title: &str,
    ) -> Result<String, AdminPostError> {
        let reader = self.reader.clone();
        let slug = resolve_slug(explicit, current, title, "title", move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.map(|post| post.id))
            }
        })
        .await?;
        Ok(slug)
    }
}

fn snapshot<'a>(post: &'a PostRecord, tag_ids: &'a [Uuid]) -> PostSummarySnapshot<'a> {
    PostSummarySnapshot {
        slug: post.slug.as_str(),
        title: post.title.as_str(),
        status: post.status,
        category_id: post.category_id,
        tag_ids,
    }
}

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(*id));
    ids
}
