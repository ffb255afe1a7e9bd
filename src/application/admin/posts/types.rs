use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::admin::slugs::SlugFailure;
use crate::application::repos::RepoError;
use crate::domain::entities::PostRecord;
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum AdminPostError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminPostError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Constraint(field) => Self::ConstraintViolation(field),
            SlugFailure::Repo(err) => Self::Repo(err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PostSummarySnapshot<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
    pub tag_ids: &'a [Uuid],
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub published_at: Option<OffsetDateTime>,
}

/// Full replacement of a post's editable fields.
///
/// `slug: None` keeps the current slug; `tag_ids: None` leaves tags untouched.
#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: Uuid,
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminPostList {
    pub items: Vec<PostRecord>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Publication timestamp implied by a status change.
///
/// Published posts always carry a timestamp, keeping the earliest one known;
/// drafts never do; archived posts keep whatever they had.
pub fn normalize_published_at(
    status: PostStatus,
    requested: Option<OffsetDateTime>,
    existing: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match status {
        PostStatus::Published => Some(
            requested
                .or(existing)
                .unwrap_or_else(OffsetDateTime::now_utc),
        ),
        PostStatus::Draft => None,
        PostStatus::Archived => requested.or(existing),
    }
}

pub(crate) fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AdminPostError> {
    if value.trim().is_empty() {
        return Err(AdminPostError::ConstraintViolation(field));
    }
    Ok(())
}
