use uuid::Uuid;

use super::service::AdminPostService;
use super::types::{AdminPostError, AdminPostList};
use crate::application::repos::{PostListScope, PostQueryFilter};
use crate::domain::entities::{PostRecord, TagRecord};
use crate::domain::posts::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::domain::types::PostStatus;

impl AdminPostService {
    pub async fn list(
        &self,
        status: Option<PostStatus>,
        search: Option<String>,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<AdminPostList, AdminPostError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let filter = PostQueryFilter {
            scope: PostListScope::Admin { status },
            category_slug: None,
            tag_slug: None,
            search: search.filter(|value| !value.trim().is_empty()),
        };

        let total = self.reader.count_posts(&filter).await?;
        let offset = u64::from(page - 1) * u64::from(per_page);
        let items = self.reader.list_posts(&filter, per_page, offset).await?;

        Ok(AdminPostList {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, AdminPostError> {
        self.reader
            .find_by_id(id)
            .await
            .map_err(AdminPostError::from)
    }

    pub async fn list_tags(&self, post_id: Uuid) -> Result<Vec<TagRecord>, AdminPostError> {
        self.tags
            .list_for_post(post_id)
            .await
            .map_err(AdminPostError::from)
    }
}
