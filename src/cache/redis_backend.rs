//! Redis-backed store shared between processes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::Mutex;

use super::backend::{BackendError, CacheBackend};

const SCAN_BATCH: usize = 200;

/// Redis connection manager guarded by a Tokio mutex.
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

pub struct RedisBackend {
    redis: SharedRedis,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = Client::open(url).map_err(|err| BackendError::connection(err.to_string()))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| BackendError::connection(err.to_string()))?;
        Ok(Self::from_shared(Arc::new(Mutex::new(manager))))
    }

    pub fn from_shared(redis: SharedRedis) -> Self {
        Self { redis }
    }
}

fn command_error(err: RedisError) -> BackendError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        BackendError::connection(err.to_string())
    } else {
        BackendError::command(err.to_string())
    }
}

/// `SCAN MATCH` pattern selecting every key that starts with `prefix`.
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.redis.lock().await;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(command_error)
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let mut conn = self.redis.lock().await;
        match ttl {
            // SETEX rejects zero; round sub-second TTLs up
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(command_error),
            None => conn.set::<_, _, ()>(key, value).await.map_err(command_error),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(key).await.map_err(command_error)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let pattern = scan_pattern(prefix);
        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            // SCAN rather than KEYS so large keyspaces do not block the server
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(command_error)?;

            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}
