//! Slug selection shared by the admin services.

use std::future::Future;

use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, normalize_explicit_slug};

#[derive(Debug)]
pub(crate) enum SlugFailure {
    /// The named input field cannot produce a usable slug.
    Constraint(&'static str),
    Repo(RepoError),
}

/// Pick the slug for an entity.
///
/// An explicit slug is normalized and must not belong to another entity. When
/// none is given an existing entity keeps its current slug, and a new one gets
/// a unique slug derived from `source`. `owner_of` returns the id currently
/// holding a slug.
pub(crate) async fn resolve_slug<F, Fut>(
    explicit: Option<&str>,
    current: Option<(Uuid, &str)>,
    source: &str,
    source_field: &'static str,
    mut owner_of: F,
) -> Result<String, SlugFailure>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<Option<Uuid>, RepoError>>,
{
    let explicit = explicit.map(str::trim).filter(|value| !value.is_empty());

    if let Some(explicit) = explicit {
        let slug = normalize_explicit_slug(explicit).map_err(|_| SlugFailure::Constraint("slug"))?;
        let owner = owner_of(&slug).await.map_err(SlugFailure::Repo)?;
        let self_id = current.map(|(id, _)| id);
        return match owner {
            Some(owner) if Some(owner) != self_id => Err(SlugFailure::Constraint("slug")),
            _ => Ok(slug),
        };
    }

    if let Some((_, slug)) = current {
        return Ok(slug.to_string());
    }

    let generated = generate_unique_slug_async(source, |candidate| {
        let owner = owner_of(candidate);
        async move { owner.await.map(|owner| owner.is_none()) }
    })
    .await;

    match generated {
        Ok(slug) => Ok(slug),
        Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => {
            Err(SlugFailure::Constraint("slug"))
        }
        Err(SlugAsyncError::Slug(SlugError::Malformed { .. })) => {
            Err(SlugFailure::Constraint("slug"))
        }
        Err(SlugAsyncError::Slug(_)) => Err(SlugFailure::Constraint(source_field)),
        Err(SlugAsyncError::Predicate(err)) => Err(SlugFailure::Repo(err)),
    }
}

/// Trimmed value, or a constraint violation naming `field` when blank.
pub(crate) fn required(value: &str, field: &'static str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(field);
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn owner(taken: &'static [&'static str], slug: &str, id: Uuid) -> Result<Option<Uuid>, RepoError> {
        Ok(taken.contains(&slug).then_some(id))
    }

    #[tokio::test]
    async fn generated_slug_skips_taken_candidates() {
        let other = Uuid::new_v4();
        let slug = resolve_slug(None, None, "Hello World", "title", |candidate| {
            let candidate = candidate.to_string();
            async move { owner(&["hello-world"], &candidate, other).await }
        })
        .await
        .expect("slug");
        assert_eq!(slug, "hello-world-2");
    }

    #[tokio::test]
    async fn explicit_slug_owned_by_another_entity_is_rejected() {
        let other = Uuid::new_v4();
        let result = resolve_slug(Some("taken"), None, "ignored", "title", |candidate| {
            let candidate = candidate.to_string();
            async move { owner(&["taken"], &candidate, other).await }
        })
        .await;
        assert!(matches!(result, Err(SlugFailure::Constraint("slug"))));
    }

    #[tokio::test]
    async fn explicit_slug_owned_by_self_is_kept() {
        let me = Uuid::new_v4();
        let slug = resolve_slug(Some("mine"), Some((me, "mine")), "x", "title", |candidate| {
            let candidate = candidate.to_string();
            async move { owner(&["mine"], &candidate, me).await }
        })
        .await
        .expect("slug");
        assert_eq!(slug, "mine");
    }

    #[tokio::test]
    async fn updates_keep_current_slug_without_explicit_value() {
        let me = Uuid::new_v4();
        let slug = resolve_slug(None, Some((me, "stable")), "New Title", "title", |_| async {
            Ok(None)
        })
        .await
        .expect("slug");
        assert_eq!(slug, "stable");
    }

    #[tokio::test]
    async fn blank_source_names_the_field() {
        let result = resolve_slug(None, None, "   ", "name", |_| async { Ok(None) }).await;
        assert!(matches!(result, Err(SlugFailure::Constraint("name"))));
    }
}
