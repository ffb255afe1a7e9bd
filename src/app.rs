//! Service graph assembly.
//!
//! The cache client is created once and handed to every reader and, wrapped in
//! a [`CacheTrigger`], to every admin service. Nothing reaches for a global.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::admin::{
    audit::AdminAuditService, categories::AdminCategoryService, comments::AdminCommentService,
    menu::AdminMenuService, pages::AdminPageService, posts::AdminPostService,
    settings::AdminSettingsService, tags::AdminTagService,
};
use crate::application::content::{
    CommentReader, CommentSubmissionService, MenuReader, PageReader, PostAssembler, PostReader,
    SettingsReader, StatsReader, TaxonomyReader,
};
use crate::application::repos::{
    AuditRepo, CategoriesRepo, CategoriesWriteRepo, CommentsRepo, CommentsWriteRepo, HealthRepo,
    MenuRepo, MenuWriteRepo, PagesRepo, PagesWriteRepo, PostsRepo, PostsWriteRepo, SettingsRepo,
    SiteArchiveRepo, TagsRepo, TagsWriteRepo,
};
use crate::application::site::SiteBackupService;
use crate::cache::{
    CacheBackend, CacheConfig, CacheTrigger, KvCache, MemoryBackend, NullBackend, RedisBackend,
};
use crate::config::{CacheBackendKind, CacheSettings};
use crate::infra::db::PostgresRepositories;
use crate::infra::error::InfraError;
use crate::infra::http::{AdminState, PublicState};

/// Every persistence capability the services need.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub categories_write: Arc<dyn CategoriesWriteRepo>,
    pub tags: Arc<dyn TagsRepo>,
    pub tags_write: Arc<dyn TagsWriteRepo>,
    pub pages: Arc<dyn PagesRepo>,
    pub pages_write: Arc<dyn PagesWriteRepo>,
    pub menu: Arc<dyn MenuRepo>,
    pub menu_write: Arc<dyn MenuWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub comments_write: Arc<dyn CommentsWriteRepo>,
    pub settings: Arc<dyn SettingsRepo>,
    pub audit: Arc<dyn AuditRepo>,
    pub archive: Arc<dyn SiteArchiveRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    pub fn postgres(db: Arc<PostgresRepositories>) -> Self {
        Self {
            posts: db.clone(),
            posts_write: db.clone(),
            categories: db.clone(),
            categories_write: db.clone(),
            tags: db.clone(),
            tags_write: db.clone(),
            pages: db.clone(),
            pages_write: db.clone(),
            menu: db.clone(),
            menu_write: db.clone(),
            comments: db.clone(),
            comments_write: db.clone(),
            settings: db.clone(),
            audit: db.clone(),
            archive: db.clone(),
            health: db,
        }
    }
}

pub struct ApplicationContext {
    pub public: PublicState,
    pub admin: AdminState,
    pub backup: SiteBackupService,
    pub cache: KvCache,
}

pub fn build_application_context(
    repos: &Repositories,
    cache: KvCache,
    auto_approve_comments: bool,
) -> ApplicationContext {
    let trigger = CacheTrigger::new(cache.clone());
    let audit = AdminAuditService::new(repos.audit.clone());

    let assembler = PostAssembler::new(
        repos.categories.clone(),
        repos.tags.clone(),
        repos.comments.clone(),
    );
    let posts = PostReader::new(
        repos.posts.clone(),
        repos.posts_write.clone(),
        assembler,
        cache.clone(),
    );
    let settings = SettingsReader::new(repos.settings.clone(), cache.clone());

    let public = PublicState {
        posts: posts.clone(),
        taxonomy: TaxonomyReader::new(repos.categories.clone(), repos.tags.clone(), cache.clone()),
        pages: PageReader::new(repos.pages.clone(), cache.clone()),
        menu: MenuReader::new(repos.menu.clone(), cache.clone()),
        settings: settings.clone(),
        comments: CommentReader::new(repos.comments.clone(), cache.clone()),
        submissions: CommentSubmissionService::new(
            repos.comments_write.clone(),
            settings,
            trigger.clone(),
            auto_approve_comments,
        ),
        stats: StatsReader::new(
            repos.posts.clone(),
            repos.categories.clone(),
            repos.tags.clone(),
            repos.comments.clone(),
            posts,
            cache.clone(),
        ),
        health: repos.health.clone(),
    };

    let backup = SiteBackupService::new(repos.archive.clone(), audit.clone(), trigger.clone());

    let admin = AdminState {
        posts: AdminPostService::new(
            repos.posts.clone(),
            repos.posts_write.clone(),
            repos.categories.clone(),
            repos.tags.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        categories: AdminCategoryService::new(
            repos.categories.clone(),
            repos.categories_write.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        tags: AdminTagService::new(
            repos.tags.clone(),
            repos.tags_write.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        pages: AdminPageService::new(
            repos.pages.clone(),
            repos.pages_write.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        menu: AdminMenuService::new(
            repos.menu.clone(),
            repos.menu_write.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        comments: AdminCommentService::new(
            repos.comments.clone(),
            repos.comments_write.clone(),
            audit.clone(),
            trigger.clone(),
        ),
        settings: AdminSettingsService::new(repos.settings.clone(), audit.clone(), trigger.clone()),
        audit,
        backup: backup.clone(),
        trigger,
        health: repos.health.clone(),
    };

    ApplicationContext {
        public,
        admin,
        backup,
        cache,
    }
}

/// Connect the configured cache backend.
///
/// A disabled cache gets the null backend. An unreachable Redis is a startup
/// error; once running, backend failures only degrade to misses.
pub async fn build_cache(settings: &CacheSettings) -> Result<KvCache, InfraError> {
    let config = CacheConfig::from(settings);

    let backend: Arc<dyn CacheBackend> = if !settings.enabled {
        warn!(target: "quire::cache", "Content cache disabled; every read goes to the store");
        Arc::new(NullBackend)
    } else {
        match settings.backend {
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new(settings.memory_capacity)),
            CacheBackendKind::Redis => {
                let url = settings
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| InfraError::configuration("cache.redis_url is not set"))?;
                let backend = RedisBackend::connect(url)
                    .await
                    .map_err(|err| InfraError::cache(err.to_string()))?;
                Arc::new(backend)
            }
        }
    };

    let cache = KvCache::new(backend, config);
    info!(
        target: "quire::cache",
        backend = cache.backend_name(),
        enabled = cache.is_enabled(),
        "Content cache ready"
    );
    Ok(cache)
}
