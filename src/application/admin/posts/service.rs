use std::sync::Arc;

use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::{CategoriesRepo, PostsRepo, PostsWriteRepo, TagsRepo};
use crate::cache::CacheTrigger;

#[derive(Clone)]
pub struct AdminPostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) categories: Arc<dyn CategoriesRepo>,
    pub(crate) tags: Arc<dyn TagsRepo>,
    pub(crate) audit: AdminAuditService,
    pub(crate) trigger: CacheTrigger,
}

impl AdminPostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        audit: AdminAuditService,
        trigger: CacheTrigger,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            tags,
            audit,
            trigger,
        }
    }
}
