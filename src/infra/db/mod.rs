//! Postgres-backed repository implementations.
//!
//! Queries are built at runtime (`sqlx::query_as` with `FromRow` rows and
//! `QueryBuilder` for filtered listings), so the crate builds without a live
//! database.

mod audit;
mod categories;
mod comments;
mod menu;
mod pages;
mod posts;
mod settings;
mod site;
mod tags;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use async_trait::async_trait;

use crate::application::repos::{HealthRepo, PostListScope, PostQueryFilter, RepoError};
use crate::domain::types::PostStatus;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn apply_scope_conditions<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: PostListScope) {
        match scope {
            PostListScope::Public => {
                qb.push(" AND p.status = ");
                qb.push_bind(PostStatus::Published);
                qb.push(" AND p.published_at IS NOT NULL ");
            }
            PostListScope::Admin { status } => {
                if let Some(status) = status {
                    qb.push(" AND p.status = ");
                    qb.push_bind(status);
                }
            }
        }
    }

    fn apply_post_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
        Self::apply_scope_conditions(qb, filter.scope);

        if let Some(category) = filter.category_slug.as_ref() {
            qb.push(" AND EXISTS (SELECT 1 FROM categories c WHERE c.id = p.category_id AND c.slug = ");
            qb.push_bind(category);
            qb.push(")");
        }

        if let Some(tag) = filter.tag_slug.as_ref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id = p.id AND t.slug = ",
            );
            qb.push_bind(tag);
            qb.push(")");
        }

        if let Some(search) = filter.search.as_ref() {
            qb.push(" AND (");
            qb.push("p.title ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(" OR p.slug ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(" OR p.excerpt ILIKE ");
            qb.push_bind(format!("%{}%", search));
            qb.push(")");
        }
    }

    fn push_post_order(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostQueryFilter) {
        match filter.scope {
            PostListScope::Public => qb.push(" ORDER BY p.published_at DESC, p.id DESC"),
            PostListScope::Admin { .. } => qb.push(" ORDER BY p.updated_at DESC, p.id DESC"),
        };
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
