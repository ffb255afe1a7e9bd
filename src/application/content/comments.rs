use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CommentsWriteRepo, CreateCommentParams, RepoError};
use crate::cache::{CacheKey, CacheTag, CacheTrigger, KvCache, SetOptions};
use crate::domain::entities::CommentRecord;
use crate::domain::types::CommentStatus;

use super::settings::SettingsReader;

const MAX_AUTHOR_LEN: usize = 100;
const MAX_BODY_LEN: usize = 5_000;

#[derive(Clone)]
pub struct CommentReader {
    comments: Arc<dyn CommentsRepo>,
    cache: KvCache,
}

impl CommentReader {
    pub fn new(comments: Arc<dyn CommentsRepo>, cache: KvCache) -> Self {
        Self { comments, cache }
    }

    /// Approved comments of a post, oldest first.
    pub async fn approved_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        self.cache
            .get_or_set(
                &CacheKey::Comments(post_id),
                SetOptions::tagged([CacheTag::Comments(post_id)]),
                || {
                    self.comments
                        .list_for_post(post_id, Some(CommentStatus::Approved))
                },
            )
            .await
    }
}

#[derive(Debug, Error)]
pub enum CommentSubmitError {
    #[error("comments are disabled")]
    Disabled,
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SubmitCommentCommand {
    pub post_id: Uuid,
    pub author_name: String,
    pub author_email: Option<String>,
    pub body: String,
}

/// Public comment intake.
#[derive(Clone)]
pub struct CommentSubmissionService {
    writer: Arc<dyn CommentsWriteRepo>,
    settings: SettingsReader,
    trigger: CacheTrigger,
    auto_approve: bool,
}

impl CommentSubmissionService {
    pub fn new(
        writer: Arc<dyn CommentsWriteRepo>,
        settings: SettingsReader,
        trigger: CacheTrigger,
        auto_approve: bool,
    ) -> Self {
        Self {
            writer,
            settings,
            trigger,
            auto_approve,
        }
    }

    /// Store a visitor comment; it stays pending unless auto-approval is on.
    pub async fn submit(
        &self,
        command: SubmitCommentCommand,
    ) -> Result<CommentRecord, CommentSubmitError> {
        if !self.settings.site_settings().await?.comments_enabled {
            return Err(CommentSubmitError::Disabled);
        }

        let author_name = command.author_name.trim().to_string();
        if author_name.is_empty() || author_name.chars().count() > MAX_AUTHOR_LEN {
            return Err(CommentSubmitError::ConstraintViolation("author_name"));
        }
        let body = command.body.trim().to_string();
        if body.is_empty() || body.chars().count() > MAX_BODY_LEN {
            return Err(CommentSubmitError::ConstraintViolation("body"));
        }
        let author_email = command
            .author_email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());
        if author_email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(CommentSubmitError::ConstraintViolation("author_email"));
        }

        let status = if self.auto_approve {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        };

        let comment = self
            .writer
            .create_comment(CreateCommentParams {
                post_id: command.post_id,
                author_name,
                author_email,
                body,
                status,
            })
            .await?;

        info!(
            target: "quire::content",
            comment_id = %comment.id,
            post_id = %comment.post_id,
            status = ?comment.status,
            "Comment submitted"
        );

        if comment.status == CommentStatus::Approved {
            self.trigger.comment_changed(comment.post_id).await;
        }
        Ok(comment)
    }
}
