//! Cached public reads.
//!
//! Each reader computes a [`crate::cache::CacheKey`], returns the cached value
//! on a hit and otherwise queries the store, assembles relations, stores the
//! result with its invalidation tags and returns it. Store errors propagate;
//! cache failures never do. Absent entities are not cached.

pub mod assemble;
pub mod comments;
pub mod pages;
pub mod posts;
pub mod settings;
pub mod stats;
pub mod taxonomy;

pub use assemble::PostAssembler;
pub use comments::{CommentReader, CommentSubmissionService, CommentSubmitError, SubmitCommentCommand};
pub use pages::{MenuReader, PageReader};
pub use posts::PostReader;
pub use settings::SettingsReader;
pub use stats::StatsReader;
pub use taxonomy::TaxonomyReader;
