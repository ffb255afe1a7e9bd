//! Relation resolution for post views.
//!
//! Lists are assembled with a fixed number of relation queries regardless of
//! their length: one for categories, one for tags, one for comment counts.
//! [`PostAssembler::assemble_one`] resolves a single post row by row and must
//! produce exactly what the batch path produces.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use uuid::Uuid;

use crate::application::repos::{CategoriesRepo, CommentsRepo, RepoError, TagsRepo};
use crate::cache::CacheTag;
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord};
use crate::domain::posts::PostView;

#[derive(Clone)]
pub struct PostAssembler {
    categories: Arc<dyn CategoriesRepo>,
    tags: Arc<dyn TagsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostAssembler {
    pub fn new(
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            categories,
            tags,
            comments,
        }
    }

    /// Resolve relations for `posts`, preserving their order.
    pub async fn assemble_many(&self, posts: Vec<PostRecord>) -> Result<Vec<PostView>, RepoError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let category_ids: Vec<Uuid> = posts
            .iter()
            .filter_map(|post| post.category_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let post_ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();

        let categories: HashMap<Uuid, CategoryRecord> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            self.categories
                .find_by_ids(&category_ids)
                .await?
                .into_iter()
                .map(|category| (category.id, category))
                .collect()
        };

        let mut tags: HashMap<Uuid, Vec<TagRecord>> = HashMap::new();
        for link in self.tags.list_for_posts(&post_ids).await? {
            tags.entry(link.post_id).or_default().push(link.tag);
        }

        let counts: HashMap<Uuid, i64> = self
            .comments
            .count_approved_for_posts(&post_ids)
            .await?
            .into_iter()
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| {
                let category = post
                    .category_id
                    .and_then(|id| categories.get(&id).cloned());
                let post_tags = sorted_tags(tags.remove(&post.id).unwrap_or_default());
                let comment_count = counts.get(&post.id).copied().unwrap_or(0);
                PostView {
                    post,
                    category,
                    tags: post_tags,
                    comment_count,
                }
            })
            .collect())
    }

    /// Resolve relations for a single post with per-relation queries.
    pub async fn assemble_one(&self, post: PostRecord) -> Result<PostView, RepoError> {
        let category = match post.category_id {
            Some(id) => self.categories.find_by_id(id).await?,
            None => None,
        };
        let tags = sorted_tags(self.tags.list_for_post(post.id).await?);
        let comment_count = self.comments.count_approved_for_post(post.id).await?;

        Ok(PostView {
            post,
            category,
            tags,
            comment_count,
        })
    }
}

/// Tags in display order: name, then slug.
fn sorted_tags(mut tags: Vec<TagRecord>) -> Vec<TagRecord> {
    tags.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
    tags.dedup_by(|a, b| a.id == b.id);
    tags
}

/// Invalidation tags of a cached post view: the post and everything embedded in it.
pub fn view_tags(view: &PostView) -> Vec<CacheTag> {
    let mut tags = vec![
        CacheTag::Post(view.post.id),
        CacheTag::Comments(view.post.id),
    ];
    if let Some(category_id) = view.post.category_id {
        tags.push(CacheTag::Category(category_id));
    }
    tags.extend(view.tags.iter().map(|tag| CacheTag::Tag(tag.id)));
    tags
}

/// Tags of a multi-post result: `listing` plus the tags of every item.
pub fn listing_tags<'a>(views: impl IntoIterator<Item = &'a PostView>) -> Vec<CacheTag> {
    let mut tags: BTreeSet<CacheTag> = BTreeSet::from([CacheTag::Listing]);
    for view in views {
        tags.extend(view_tags(view));
    }
    tags.into_iter().collect()
}
