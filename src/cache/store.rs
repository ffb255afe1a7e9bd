//! Typed cache-aside wrapper over a [`CacheBackend`].
//!
//! Values are stored as JSON. Backend failures never reach callers: they are
//! logged, counted and degraded to a miss (reads) or a no-op (writes).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backend::{BackendError, CacheBackend};
use super::config::CacheConfig;
use super::keys::{CacheKey, CacheTag, NAMESPACE_PREFIXES};
use super::registry::TagIndex;

const TARGET: &str = "quire::cache";

/// Per-write options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Overrides the configured default TTL.
    pub ttl: Option<Duration>,
    pub tags: Vec<CacheTag>,
}

impl SetOptions {
    pub fn tagged(tags: impl IntoIterator<Item = CacheTag>) -> Self {
        Self {
            ttl: None,
            tags: tags.into_iter().collect(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Shared content cache handle. Cloning is cheap.
#[derive(Clone)]
pub struct KvCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl KvCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Cached value for `key`, or `None` on miss, failure or undecodable entry.
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if !self.is_enabled() {
            return None;
        }

        let rendered = key.to_string();
        let raw = self
            .call("get", &rendered, self.backend.get(&rendered))
            .await
            .flatten();

        let Some(raw) = raw else {
            metrics::counter!("quire_cache_miss_total").increment(1);
            return None;
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                metrics::counter!("quire_cache_hit_total").increment(1);
                Some(value)
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    key = %rendered,
                    error = %err,
                    "Dropping undecodable cache entry"
                );
                metrics::counter!("quire_cache_error_total", "op" => "decode").increment(1);
                metrics::counter!("quire_cache_miss_total").increment(1);
                self.delete_raw(&rendered).await;
                None
            }
        }
    }

    /// Store `value` under `key`.
    ///
    /// Tag markers are written before the value; if they cannot be written
    /// the value is not stored either, so a tagged entry is always reachable
    /// through its tags.
    pub async fn set<T>(&self, key: &CacheKey, value: &T, options: SetOptions)
    where
        T: Serialize + ?Sized,
    {
        if !self.is_enabled() {
            return;
        }

        let rendered = key.to_string();
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    target: TARGET,
                    key = %rendered,
                    error = %err,
                    "Skipping cache write: value does not serialize"
                );
                metrics::counter!("quire_cache_error_total", "op" => "encode").increment(1);
                return;
            }
        };

        let ttl = options.ttl.unwrap_or_else(|| self.config.default_ttl());

        if !options.tags.is_empty() {
            let index = TagIndex::new(self.backend.as_ref());
            let registered = self
                .call("tag", &rendered, index.register(&rendered, &options.tags, Some(ttl)))
                .await;
            if registered.is_none() {
                return;
            }
        }

        self.call("set", &rendered, self.backend.put(&rendered, payload, Some(ttl)))
            .await;
    }

    /// Remove `key`. Removing an absent key is a no-op.
    pub async fn delete(&self, key: &CacheKey) {
        if !self.is_enabled() {
            return;
        }
        self.delete_raw(&key.to_string()).await;
    }

    pub async fn delete_many<'k>(&self, keys: impl IntoIterator<Item = &'k CacheKey>) {
        if !self.is_enabled() {
            return;
        }
        for key in keys {
            self.delete_raw(&key.to_string()).await;
        }
    }

    /// Remove every key starting with `prefix`; returns how many were listed.
    pub async fn clear_by_prefix(&self, prefix: &str) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let Some(keys) = self.call("list", prefix, self.backend.list(prefix)).await else {
            return 0;
        };

        for key in &keys {
            self.delete_raw(key).await;
        }

        debug!(target: TARGET, prefix, removed = keys.len(), "Cleared cache prefix");
        keys.len()
    }

    /// Drop every entry carrying one of `tags`; returns the number of keys removed.
    pub async fn invalidate_tags(&self, tags: &[CacheTag]) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let index = TagIndex::new(self.backend.as_ref());
        let mut removed = 0;
        for tag in tags {
            let label = tag.to_string();
            if let Some(count) = self.call("invalidate_tag", &label, index.invalidate(tag)).await {
                removed += count;
            }
        }
        removed
    }

    /// Drop the whole content namespace.
    pub async fn purge(&self) -> usize {
        let mut removed = 0;
        for prefix in NAMESPACE_PREFIXES {
            removed += self.clear_by_prefix(prefix).await;
        }
        removed
    }

    /// Cached value, or the producer's result stored and returned.
    ///
    /// Producer errors propagate and nothing is stored. Concurrent misses for
    /// the same key may each run the producer; the last write wins.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        options: SetOptions,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }

        let value = producer().await?;
        self.set(key, &value, options).await;
        Ok(value)
    }

    /// Like [`Self::get_or_set`] for look-ups that may find nothing.
    ///
    /// Absence is never cached, so an entity created after a miss is visible
    /// on the next read.
    pub async fn get_or_set_optional<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        options: SetOptions,
        producer: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(Some(hit));
        }

        let value = producer().await?;
        if let Some(value) = value.as_ref() {
            self.set(key, value, options).await;
        }
        Ok(value)
    }

    async fn delete_raw(&self, key: &str) {
        self.call("delete", key, self.backend.delete(key)).await;
    }

    /// Run one backend call under the operation timeout, swallowing failures.
    async fn call<T, F>(&self, op: &'static str, key: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let limit = self.config.operation_timeout();
        let result = match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(limit)),
        };

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target: TARGET,
                    op,
                    key,
                    backend = self.backend.name(),
                    error = %err,
                    "Cache operation failed; continuing without cache"
                );
                metrics::counter!("quire_cache_error_total", "op" => op).increment(1);
                None
            }
        }
    }
}
