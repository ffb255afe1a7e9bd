//! Quire content cache.
//!
//! A cache-aside layer between the public readers and the store:
//!
//! - [`CacheBackend`]: TTL key/value storage (in-process LRU or Redis)
//! - [`KvCache`]: typed JSON wrapper that never surfaces backend failures
//! - [`CacheKey`] / [`CacheTag`]: the only source of key and tag strings
//! - [`CacheTrigger`]: maps committed mutations to invalidations
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"          # or "redis"
//! redis_url = "redis://127.0.0.1/"
//! default_ttl_seconds = 300
//! views_ttl_seconds = 60
//! memory_capacity = 10000
//! operation_timeout_ms = 250
//! ```

mod backend;
mod config;
mod events;
mod keys;
mod memory;
mod planner;
mod redis_backend;
mod registry;
mod store;
mod trigger;

pub use backend::{BackendError, CacheBackend, NullBackend};
pub use config::CacheConfig;
pub use events::{CacheEvent, slug_pair};
pub use keys::{
    CacheKey, CacheTag, NAMESPACE_PREFIXES, POST_LIST_PREFIX, TAG_INDEX_PREFIX, tag_index_marker,
    tag_index_prefix,
};
pub use memory::MemoryBackend;
pub use planner::InvalidationPlan;
pub use redis_backend::{RedisBackend, SharedRedis};
pub use registry::TagIndex;
pub use store::{KvCache, SetOptions};
pub use trigger::{CacheTrigger, InvalidationReport};
