use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::{CommentsRepo, CommentsWriteRepo, RepoError};
use crate::cache::CacheTrigger;
use crate::domain::entities::CommentRecord;
use crate::domain::types::CommentStatus;

const DEFAULT_MODERATION_PAGE: u32 = 50;
const MAX_MODERATION_PAGE: u32 = 200;

#[derive(Debug, Error)]
pub enum AdminCommentError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Comment moderation.
#[derive(Clone)]
pub struct AdminCommentService {
    reader: Arc<dyn CommentsRepo>,
    writer: Arc<dyn CommentsWriteRepo>,
    audit: AdminAuditService,
    trigger: CacheTrigger,
}

impl AdminCommentService {
    pub fn new(
        reader: Arc<dyn CommentsRepo>,
        writer: Arc<dyn CommentsWriteRepo>,
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

    pub async fn list_recent(
        &self,
        status: Option<CommentStatus>,
        limit: Option<u32>,
    ) -> Result<Vec<CommentRecord>, AdminCommentError> {
        let limit = limit
            .unwrap_or(DEFAULT_MODERATION_PAGE)
            .clamp(1, MAX_MODERATION_PAGE);
        self.reader
            .list_recent(status, limit)
            .await
            .map_err(AdminCommentError::from)
    }

    pub async fn list_for_post(
        &self,
        post_id: Uuid,
        status: Option<CommentStatus>,
    ) -> Result<Vec<CommentRecord>, AdminCommentError> {
        self.reader
            .list_for_post(post_id, status)
            .await
            .map_err(AdminCommentError::from)
    }

    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<CommentRecord, AdminCommentError> {
        let existing = self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;
        if existing.status == status {
            return Ok(existing);
        }

        let comment = self.writer.update_comment_status(id, status).await?;
        self.trigger.comment_changed(comment.post_id).await;
        self.audit
            .record(
                actor,
                "comment.moderate",
                "comment",
                Some(&id.to_string()),
                Some(&ModerationSnapshot {
                    post_id: comment.post_id,
                    from: existing.status,
                    to: comment.status,
                }),
            )
            .await?;
        Ok(comment)
    }

    pub async fn delete_comment(&self, actor: &str, id: Uuid) -> Result<(), AdminCommentError> {
        let existing = self.reader.find_by_id(id).await?.ok_or(RepoError::NotFound)?;

        self.writer.delete_comment(id).await?;
        self.trigger.comment_changed(existing.post_id).await;
        self.audit
            .record(
                actor,
                "comment.delete",
                "comment",
                Some(&id.to_string()),
                Some(&ModerationSnapshot {
                    post_id: existing.post_id,
                    from: existing.status,
                    to: existing.status,
                }),
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ModerationSnapshot {
    post_id: Uuid,
    from: CommentStatus,
    to: CommentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use crate::application::admin::test_support::{FakeAuditRepo, memory_trigger};
    use crate::application::repos::CreateCommentParams;
    use crate::cache::{CacheKey, CacheTag, SetOptions};

    #[derive(Default)]
    struct MemoryComments {
        items: Mutex<Vec<CommentRecord>>,
    }

    #[async_trait]
    impl CommentsRepo for MemoryComments {
        async fn list_for_post(
            &self,
            post_id: Uuid,
            status: Option<CommentStatus>,
        ) -> Result<Vec<CommentRecord>, RepoError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|c| c.post_id == post_id && status.is_none_or(|s| c.status == s))
                .cloned()
                .collect())
        }

        async fn list_recent(
            &self,
            status: Option<CommentStatus>,
            limit: u32,
        ) -> Result<Vec<CommentRecord>, RepoError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .rev()
                .filter(|c| status.is_none_or(|s| c.status == s))
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
            let items = self.items.lock().unwrap();
            Ok(items.iter().find(|c| c.id == id).cloned())
        }

        async fn count_approved_for_posts(
            &self,
            _post_ids: &[Uuid],
        ) -> Result<Vec<(Uuid, i64)>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_approved_for_post(&self, _post_id: Uuid) -> Result<i64, RepoError> {
            Ok(0)
        }

        async fn count_approved(&self) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[async_trait]
    impl CommentsWriteRepo for MemoryComments {
        async fn create_comment(
            &self,
            _params: CreateCommentParams,
        ) -> Result<CommentRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn update_comment_status(
            &self,
            id: Uuid,
            status: CommentStatus,
        ) -> Result<CommentRecord, RepoError> {
            let mut items = self.items.lock().unwrap();
            let comment = items
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(RepoError::NotFound)?;
            comment.status = status;
            Ok(comment.clone())
        }

        async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
            self.items.lock().unwrap().retain(|c| c.id != id);
            Ok(())
        }
    }

    fn pending(post_id: Uuid) -> CommentRecord {
        CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            author_name: "Ada".into(),
            author_email: None,
            body: "Nice post".into(),
            status: CommentStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn approving_invalidates_post_comments() {
        let post_id = Uuid::new_v4();
        let comment = pending(post_id);
        let repo = Arc::new(MemoryComments {
            items: Mutex::new(vec![comment.clone()]),
        });
        let trigger = memory_trigger();
        let cache = trigger.cache().clone();
        let audit = AdminAuditService::new(Arc::new(FakeAuditRepo::default()));
        let service = AdminCommentService::new(repo.clone(), repo, audit, trigger);

        cache
            .set(
                &CacheKey::Comments(post_id),
                &Vec::<CommentRecord>::new(),
                SetOptions::tagged([CacheTag::Comments(post_id)]),
            )
            .await;

        let updated = service
            .set_status("tester", comment.id, CommentStatus::Approved)
            .await
            .expect("moderation succeeds");

        assert_eq!(updated.status, CommentStatus::Approved);
        assert_eq!(
            cache
                .get::<Vec<CommentRecord>>(&CacheKey::Comments(post_id))
                .await,
            None
        );
    }

    #[tokio::test]
    async fn unchanged_status_is_a_no_op() {
        let comment = pending(Uuid::new_v4());
        let repo = Arc::new(MemoryComments {
            items: Mutex::new(vec![comment.clone()]),
        });
        let audit_repo = Arc::new(FakeAuditRepo::default());
        let audit = AdminAuditService::new(audit_repo.clone());
        let service = AdminCommentService::new(repo.clone(), repo, audit, memory_trigger());

        service
            .set_status("tester", comment.id, CommentStatus::Pending)
            .await
            .expect("no-op succeeds");
        assert!(audit_repo.actions().is_empty());
    }

    #[tokio::test]
    async fn list_recent_clamps_limit() {
        let post_id = Uuid::new_v4();
        let repo = Arc::new(MemoryComments {
            items: Mutex::new(vec![pending(post_id), pending(post_id)]),
        });
        let audit = AdminAuditService::new(Arc::new(FakeAuditRepo::default()));
        let service = AdminCommentService::new(repo.clone(), repo, audit, memory_trigger());

        let listed = service.list_recent(None, Some(0)).await.expect("list");
        assert_eq!(listed.len(), 1);
    }
}
