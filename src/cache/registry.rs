//! Tag index.
//!
//! Records which cache keys carry which [`CacheTag`]. The index lives in the
//! backend itself as marker entries `tagidx:{tag}#{key}`, so every process
//! sharing a Redis instance sees the same relationships. A marker expires with
//! the entry it describes; a stale marker only costs one redundant delete.

use std::time::Duration;

use super::backend::{BackendError, CacheBackend};
use super::keys::{CacheTag, tag_index_marker, tag_index_prefix};

const MARKER_VALUE: &str = "1";

pub struct TagIndex<'a> {
    backend: &'a dyn CacheBackend,
}

impl<'a> TagIndex<'a> {
    pub fn new(backend: &'a dyn CacheBackend) -> Self {
        Self { backend }
    }

    /// Register `key` under every tag in `tags`.
    pub async fn register(
        &self,
        key: &str,
        tags: &[CacheTag],
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        for tag in tags {
            self.backend
                .put(&tag_index_marker(tag, key), MARKER_VALUE.to_string(), ttl)
                .await?;
        }
        Ok(())
    }

    /// Keys currently registered under `tag`.
    pub async fn keys_for_tag(&self, tag: &CacheTag) -> Result<Vec<String>, BackendError> {
        let prefix = tag_index_prefix(tag);
        let markers = self.backend.list(&prefix).await?;
        Ok(markers
            .into_iter()
            .filter_map(|marker| marker.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Delete every key carrying `tag`, then its markers.
    ///
    /// Returns the number of keys removed.
    pub async fn invalidate(&self, tag: &CacheTag) -> Result<usize, BackendError> {
        let keys = self.keys_for_tag(tag).await?;
        for key in &keys {
            self.backend.delete(key).await?;
            self.backend.delete(&tag_index_marker(tag, key)).await?;
        }
        Ok(keys.len())
    }
}
