//! Cache tuning knobs.
//!
//! Built from the `[cache]` section of `quire.toml`; see [`crate::config`].

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_VIEWS_TTL_SECONDS: u64 = 60;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;

/// Runtime options of [`super::KvCache`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every read misses and every write is skipped.
    pub enabled: bool,
    /// TTL applied when a write does not name one.
    pub default_ttl_seconds: u64,
    /// TTL of the advisory view counters and of the home stats aggregate.
    pub views_ttl_seconds: u64,
    /// Upper bound on a single backend call.
    pub operation_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            views_ttl_seconds: DEFAULT_VIEWS_TTL_SECONDS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            default_ttl_seconds: settings.default_ttl.as_secs(),
            views_ttl_seconds: settings.views_ttl.as_secs(),
            operation_timeout_ms: u64::try_from(settings.operation_timeout.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Default TTL, never shorter than one second.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.max(1))
    }

    pub fn views_ttl(&self) -> Duration {
        Duration::from_secs(self.views_ttl_seconds.max(1))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}
