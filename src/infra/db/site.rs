use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, SettingsRepo, SiteArchiveRepo};
use crate::application::site::{
    CategorySnapshot, CommentSnapshot, MenuSnapshot, PageSnapshot, PostSnapshot, SettingsSnapshot,
    SiteArchive, TagSnapshot,
};
use crate::domain::types::{CommentStatus, PageStatus, PostStatus};

use super::settings::SETTINGS_ROW_ID;
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostExportRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: String,
    body: String,
    status: PostStatus,
    category_slug: Option<String>,
    view_count: i64,
    published_at: Option<OffsetDateTime>,
}

#[derive(sqlx::FromRow)]
struct CommentExportRow {
    post_slug: String,
    author_name: String,
    author_email: Option<String>,
    body: String,
    status: CommentStatus,
    created_at: OffsetDateTime,
}

#[async_trait]
impl SiteArchiveRepo for PostgresRepositories {
    async fn export_archive(&self) -> Result<SiteArchive, RepoError> {
        let settings = SettingsRepo::load_site_settings(self).await?;

        let categories = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT slug, name, description FROM categories ORDER BY slug",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|(slug, name, description)| CategorySnapshot {
            slug,
            name,
            description,
        })
        .collect();

        let tags = sqlx::query_as::<_, (String, String)>("SELECT slug, name FROM tags ORDER BY slug")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(|(slug, name)| TagSnapshot { slug, name })
            .collect();

        let mut tag_slugs: HashMap<Uuid, Vec<String>> = HashMap::new();
        let links = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT pt.post_id, t.slug
            FROM post_tags pt
            INNER JOIN tags t ON t.id = pt.tag_id
            ORDER BY t.slug
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        for (post_id, slug) in links {
            tag_slugs.entry(post_id).or_default().push(slug);
        }

        let posts = sqlx::query_as::<_, PostExportRow>(
            r#"
            SELECT p.id, p.slug, p.title, p.excerpt, p.body, p.status,
                   c.slug AS category_slug, p.view_count, p.published_at
            FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            ORDER BY p.slug
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|row| PostSnapshot {
            tag_slugs: tag_slugs.remove(&row.id).unwrap_or_default(),
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            status: row.status,
            category_slug: row.category_slug,
            view_count: row.view_count,
            published_at: row.published_at,
        })
        .collect();

        let pages = sqlx::query_as::<_, (String, String, String, PageStatus)>(
            "SELECT slug, title, body, status FROM pages ORDER BY slug",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|(slug, title, body, status)| PageSnapshot {
            slug,
            title,
            body,
            status,
        })
        .collect();

        let menu = sqlx::query_as::<_, (String, String, i32, bool)>(
            "SELECT label, destination, sort_order, visible FROM menu_items ORDER BY sort_order, label",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|(label, destination, sort_order, visible)| MenuSnapshot {
            label,
            destination,
            sort_order,
            visible,
        })
        .collect();

        let comments = sqlx::query_as::<_, CommentExportRow>(
            r#"
            SELECT p.slug AS post_slug, c.author_name, c.author_email, c.body, c.status, c.created_at
            FROM comments c
            INNER JOIN posts p ON p.id = c.post_id
            ORDER BY p.slug, c.created_at
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(|row| CommentSnapshot {
            post_slug: row.post_slug,
            author_name: row.author_name,
            author_email: row.author_email,
            body: row.body,
            status: row.status,
            created_at: row.created_at,
        })
        .collect();

        Ok(SiteArchive {
            settings: SettingsSnapshot {
                site_title: settings.site_title,
                site_description: settings.site_description,
                posts_per_page: settings.posts_per_page,
                timezone: settings.timezone,
                footer_text: settings.footer_text,
                comments_enabled: settings.comments_enabled,
            },
            categories,
            tags,
            posts,
            pages,
            menu,
            comments,
        })
    }

    async fn replace_with_archive(&self, archive: &SiteArchive) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "TRUNCATE comments, post_tags, posts, categories, tags, pages, menu_items RESTART IDENTITY CASCADE",
        )
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        let category_ids = insert_categories(&mut tx, &archive.categories).await?;
        let tag_ids = insert_tags(&mut tx, &archive.tags).await?;

        let mut post_ids = HashMap::new();
        for post in &archive.posts {
            let category_id = match post.category_slug.as_deref() {
                Some(slug) => Some(lookup(&category_ids, "category", slug)?),
                None => None,
            };
            let id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO posts (
                    id, slug, title, excerpt, body, status, category_id, view_count, published_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(id)
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.body)
            .bind(post.status)
            .bind(category_id)
            .bind(post.view_count)
            .bind(post.published_at)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

            for tag_slug in &post.tag_slugs {
                let tag_id = lookup(&tag_ids, "tag", tag_slug)?;
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(tag_id)
                    .execute(tx.as_mut())
                    .await
                    .map_err(map_sqlx_error)?;
            }
            post_ids.insert(post.slug.as_str(), id);
        }

        for comment in &archive.comments {
            let post_id = lookup(&post_ids, "post", &comment.post_slug)?;
            sqlx::query(
                r#"
                INSERT INTO comments (id, post_id, author_name, author_email, body, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(&comment.author_name)
            .bind(&comment.author_email)
            .bind(&comment.body)
            .bind(comment.status)
            .bind(comment.created_at)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        }

        for page in &archive.pages {
            sqlx::query("INSERT INTO pages (id, slug, title, body, status) VALUES ($1, $2, $3, $4, $5)")
                .bind(Uuid::new_v4())
                .bind(&page.slug)
                .bind(&page.title)
                .bind(&page.body)
                .bind(page.status)
                .execute(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;
        }

        for item in &archive.menu {
            sqlx::query(
                "INSERT INTO menu_items (id, label, destination, sort_order, visible) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(&item.label)
            .bind(&item.destination)
            .bind(item.sort_order)
            .bind(item.visible)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        }

        let settings = &archive.settings;
        sqlx::query(
            r#"
            UPDATE site_settings
            SET site_title = $1,
                site_description = $2,
                posts_per_page = $3,
                timezone = $4,
                footer_text = $5,
                comments_enabled = $6,
                updated_at = now()
            WHERE id = $7
            "#,
        )
        .bind(&settings.site_title)
        .bind(&settings.site_description)
        .bind(settings.posts_per_page)
        .bind(settings.timezone.name())
        .bind(&settings.footer_text)
        .bind(settings.comments_enabled)
        .bind(SETTINGS_ROW_ID)
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

async fn insert_categories<'a>(
    tx: &mut Transaction<'_, Postgres>,
    categories: &'a [CategorySnapshot],
) -> Result<HashMap<&'a str, Uuid>, RepoError> {
    let mut ids = HashMap::with_capacity(categories.len());
    for category in categories {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO categories (id, slug, name, description) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&category.slug)
            .bind(&category.name)
            .bind(&category.description)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        ids.insert(category.slug.as_str(), id);
    }
    Ok(ids)
}

async fn insert_tags<'a>(
    tx: &mut Transaction<'_, Postgres>,
    tags: &'a [TagSnapshot],
) -> Result<HashMap<&'a str, Uuid>, RepoError> {
    let mut ids = HashMap::with_capacity(tags.len());
    for tag in tags {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO tags (id, slug, name) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&tag.slug)
            .bind(&tag.name)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        ids.insert(tag.slug.as_str(), id);
    }
    Ok(ids)
}

fn lookup(ids: &HashMap<&str, Uuid>, kind: &str, slug: &str) -> Result<Uuid, RepoError> {
    ids.get(slug).copied().ok_or_else(|| RepoError::InvalidInput {
        message: format!("unknown {kind} slug `{slug}`"),
    })
}
