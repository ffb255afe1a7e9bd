mod commands;
mod queries;
mod service;
pub mod types;

pub use service::*;
pub use types::{
    AdminPostError, AdminPostList, CreatePostCommand, UpdatePostCommand, normalize_published_at,
};
