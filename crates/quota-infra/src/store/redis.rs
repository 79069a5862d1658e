//! Redis store implementation - lets several hosts share one set of windows.

use std::sync::Mutex;
use std::time::Duration;

use redis::{Client, Commands, Connection};

use quota_core::ports::{KeyValueStore, StoreError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Fall back to the in-memory store if Redis is unavailable. Off by
    /// default, since the fallback forgets usage on exit.
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: false,
        }
    }
}

/// Redis-backed store over a single synchronous connection.
pub struct RedisStore {
    conn: Mutex<Connection>,
    config: RedisConfig,
}

impl RedisStore {
    pub fn new(config: RedisConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| StoreError::Connection(e.to_string()))?;

        // Bounded so an unreachable server cannot hang the caller
        let conn = client
            .get_connection_with_timeout(config.connect_timeout)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis store");

        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
        wrap: fn(String) -> StoreError,
    ) -> Result<T, StoreError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        op(&mut *conn).map_err(|e| wrap(e.to_string()))
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| conn.get::<_, Option<String>>(key), StoreError::Read)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| conn.set::<_, _, ()>(key, value), StoreError::Write)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| conn.del::<_, ()>(key), StoreError::Write)
    }
}
