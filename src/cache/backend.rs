//! Key-value backend contract.
//!
//! Backends store opaque strings with an optional expiry. They report failures
//! honestly; swallowing them is the job of [`super::KvCache`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unreachable: {message}")]
    Connection { message: String },
    #[error("cache command failed: {message}")]
    Command { message: String },
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }
}

/// Minimal TTL key-value store.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Store `value`; `None` keeps the entry until it is deleted or evicted.
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>)
    -> Result<(), BackendError>;

    /// Remove `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Live keys starting with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError>;
}

/// Backend used when caching is disabled: every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    async fn put(
        &self,
        _key: &str,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, BackendError> {
        Ok(Vec::new())
    }
}
