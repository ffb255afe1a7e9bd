use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::admin::slugs::{SlugFailure, required, resolve_slug};
use crate::application::repos::{
    CreateTagParams, RepoError, TagsRepo, TagsWriteRepo, UpdateTagParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::TagRecord;

#[derive(Debug, Error)]
pub enum AdminTagError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("tag is referenced by {count} posts")]
    InUse { count: u64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminTagError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Constraint(field) => Self::ConstraintViolation(field),
            SlugFailure::Repo(err) => Self::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTagCommand {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateTagCommand {
    pub id: Uuid,
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Clone)]
pub struct AdminTagService {
    reader: Arc<dyn TagsRepo>,
    writer: Arc<dyn TagsWriteRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminTagService {
    pub fn new(
        reader: Arc<dyn TagsRepo>,
        writer: Arc<dyn TagsWriteRepo>,
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

    pub async fn list_all(&self) -> Result<Vec<TagRecord>, AdminTagError> {
        self.reader.list_all().await.map_err(AdminTagError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, AdminTagError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminTagError::from)
    }

    pub async fn create_tag(
        &self,
        actor: &str,
        command: CreateTagCommand,
    ) -> Result<TagRecord, AdminTagError> {
        let name = required(&command.name, "name").map_err(AdminTagError::ConstraintViolation)?;
        let slug = self.choose_slug(command.slug.as_deref(), None, &name).await?;

        let tag = self
            .writer
            .create_tag(CreateTagParams { slug, name })
            .await?;
        self.trigger.tag_changed(tag.id, None, &tag.slug).await;
        self.audit
            .record(
                actor,
                "tag.create",
                "tag",
                Some(&tag.id.to_string()),
                Some(&TagSnapshot::from(&tag)),
            )
            .await?;
        Ok(tag)
    }

    pub async fn update_tag(
        &self,
        actor: &str,
        command: UpdateTagCommand,
    ) -> Result<TagRecord, AdminTagError> {
        let name = required(&command.name, "name").map_err(AdminTagError::ConstraintViolation)?;

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

        let tag = self
            .writer
            .update_tag(UpdateTagParams {
                id: existing.id,
                slug,
                name,
            })
            .await?;
        self.trigger
            .tag_changed(tag.id, Some(&existing.slug), &tag.slug)
            .await;
        self.audit
            .record(
                actor,
                "tag.update",
                "tag",
                Some(&tag.id.to_string()),
                Some(&TagSnapshot::from(&tag)),
            )
            .await?;
        Ok(tag)
    }

    pub async fn delete_tag(&self, actor: &str, id: Uuid) -> Result<(), AdminTagError> {
        let existing = self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;
        let usage = self.reader.count_usage(id).await?;
        if usage > 0 {
            return Err(AdminTagError::InUse { count: usage });
        }

        self.writer.delete_tag(id).await?;
        self.trigger.tag_changed(id, None, &existing.slug).await;
        self.audit
            .record(
                actor,
                "tag.delete",
                "tag",
                Some(&id.to_string()),
                Some(&TagSnapshot::from(&existing)),
            )
            .await?;
        Ok(())
    }

    async fn choose_slug(
        &self,
        explicit: Option<&str>,
        current: Option<(Uuid, &str)>,
        name: &str,
    ) -> Result<String, AdminTagError> {
        let reader = self.reader.clone();
        let slug = resolve_slug(explicit, current, name, "name", move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.map(|tag| tag.id))
            }
        })
        .await?;
        Ok(slug)
    }
}

#[derive(Debug, Serialize)]
struct TagSnapshot<'a> {
    slug: &'a str,
    name: &'a str,
}

impl<'a> From<&'a TagRecord> for TagSnapshot<'a> {
    fn from(tag: &'a TagRecord) -> Self {
        Self {
            slug: tag.slug.as_str(),
            name: tag.name.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use crate::application::admin::test_support::{FakeAuditRepo, memory_trigger};
    use crate::application::repos::{AuditRepo, PostTagRecord};
    use crate::cache::{CacheKey, CacheTag, SetOptions};

    #[derive(Clone, Default)]
    struct StubTagsRepo {
        usage: u64,
        record: Option<TagRecord>,
    }

    #[async_trait]
    impl TagsRepo for StubTagsRepo {
        async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError> {
            Ok(self.record.clone().into_iter().collect())
        }

        async fn list_for_post(&self, _post_id: Uuid) -> Result<Vec<TagRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_for_posts(
            &self,
            _post_ids: &[Uuid],
        ) -> Result<Vec<PostTagRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError> {
            let record = self.record.clone().filter(|tag| tag.id == id);
            Ok(record)
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>, RepoError> {
            let record = self.record.clone().filter(|tag| tag.slug == slug);
            Ok(record)
        }

        async fn count_usage(&self, _id: Uuid) -> Result<u64, RepoError> {
            Ok(self.usage)
        }
    }

    #[derive(Default)]
    struct RecordingTagsWriter {
        deleted: Mutex<Vec<Uuid>>,
        updated: Mutex<Vec<UpdateTagParams>>,
    }

    #[async_trait]
    impl TagsWriteRepo for RecordingTagsWriter {
        async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
            let mut tag = sample_tag(Uuid::new_v4());
            tag.slug = params.slug;
            tag.name = params.name;
            Ok(tag)
        }

        async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
            let mut tag = sample_tag(params.id);
            tag.slug = params.slug.clone();
            tag.name = params.name.clone();
            self.updated.lock().unwrap().push(params);
            Ok(tag)
        }

        async fn delete_tag(&self, id: Uuid) -> Result<(), RepoError> {
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn sample_tag(id: Uuid) -> TagRecord {
        TagRecord {
            id,
            slug: "sample".into(),
            name: "Sample".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn service(
        reader: StubTagsRepo,
        writer: Arc<RecordingTagsWriter>,
    ) -> (AdminTagService, CacheTrigger) {
        let audit_repo: Arc<dyn AuditRepo> = Arc::new(FakeAuditRepo::default());
        let audit = AdminAuditService::new(audit_repo);
        let trigger = memory_trigger();
        let service = AdminTagService::new(Arc::new(reader), writer, audit, trigger.clone());
        (service, trigger)
    }

    #[tokio::test]
    async fn delete_tag_rejects_when_in_use() {
        let id = Uuid::new_v4();
        let reader = StubTagsRepo {
            usage: 3,
            record: Some(sample_tag(id)),
        };
        let (service, _) = service(reader, Arc::new(RecordingTagsWriter::default()));

        let result = service.delete_tag("tester", id).await;
        match result {
            Err(AdminTagError::InUse { count }) => assert_eq!(count, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_tag_allows_when_unused() {
        let id = Uuid::new_v4();
        let reader = StubTagsRepo {
            usage: 0,
            record: Some(sample_tag(id)),
        };
        let writer = Arc::new(RecordingTagsWriter::default());
        let (service, _) = service(reader, writer.clone());

        service
            .delete_tag("tester", id)
            .await
            .expect("delete succeeds");

        assert_eq!(writer.deleted.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn create_tag_derives_slug_from_name() {
        let (service, _) = service(StubTagsRepo::default(), Arc::new(RecordingTagsWriter::default()));

        let tag = service
            .create_tag(
                "tester",
                CreateTagCommand {
                    name: "  Async Rust ".into(),
                    slug: None,
                },
            )
            .await
            .expect("create succeeds");

        assert_eq!(tag.name, "Async Rust");
        assert_eq!(tag.slug, "async-rust");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (service, _) = service(StubTagsRepo::default(), Arc::new(RecordingTagsWriter::default()));

        let result = service
            .create_tag(
                "tester",
                CreateTagCommand {
                    name: "   ".into(),
                    slug: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AdminTagError::ConstraintViolation("name"))));
    }

    #[tokio::test]
    async fn rename_invalidates_old_slug_lookup() {
        let id = Uuid::new_v4();
        let reader = StubTagsRepo {
            usage: 0,
            record: Some(sample_tag(id)),
        };
        let writer = Arc::new(RecordingTagsWriter::default());
        let (service, trigger) = service(reader, writer.clone());
        let cache = trigger.cache().clone();

        cache
            .set(
                &CacheKey::TagSlug("sample".into()),
                &"cached",
                SetOptions::tagged([CacheTag::Taxonomy]),
            )
            .await;

        service
            .update_tag(
                "tester",
                UpdateTagCommand {
                    id,
                    name: "Renamed".into(),
                    slug: Some("renamed".into()),
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(writer.updated.lock().unwrap()[0].slug, "renamed");
        assert_eq!(
            cache.get::<String>(&CacheKey::TagSlug("sample".into())).await,
            None
        );
    }

    #[tokio::test]
    async fn update_unknown_tag_is_not_found() {
        let (service, _) = service(StubTagsRepo::default(), Arc::new(RecordingTagsWriter::default()));
        let result = service
            .update_tag(
                "tester",
                UpdateTagCommand {
                    id: Uuid::new_v4(),
                    name: "x".into(),
                    slug: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AdminTagError::Repo(RepoError::NotFound))));
    }
}
