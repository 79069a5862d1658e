//! Application state - the rate window and how results are reported.

use std::sync::Arc;

use anyhow::Context;
use quota_core::RateLimitWindow;
use quota_core::ports::KeyValueStore;
use quota_infra::{FileStore, InMemoryStore, ScopedStore, SystemClock};

#[cfg(feature = "redis")]
use quota_infra::RedisStore;

use crate::config::{AppConfig, StoreKind};

/// Shared state for command handlers.
pub struct AppState {
    pub window: RateLimitWindow,
    /// Print JSON instead of prose.
    pub json: bool,
    /// The caller is privileged and skips the limiter.
    pub bypass: bool,
}

impl AppState {
    /// Build the state with the configured store and the wall clock.
    pub fn new(config: &AppConfig, json: bool, bypass: bool) -> anyhow::Result<Self> {
        let mut store = open_store(config)?;

        if let Some(client_id) = &config.client_id {
            tracing::debug!(client_id = %client_id, "Scoping rate window to client");
            store = Arc::new(ScopedStore::new(store, client_id.clone()));
        }

        let window = RateLimitWindow::new(store, Arc::new(SystemClock), config.window.clone())
            .context("invalid rate window configuration")?
            .with_storage_key(config.storage_key.clone());

        Ok(Self::from_parts(window, json, bypass))
    }

    pub fn from_parts(window: RateLimitWindow, json: bool, bypass: bool) -> Self {
        Self {
            window,
            json,
            bypass,
        }
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.store_kind {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, usage is forgotten on exit");
            Arc::new(InMemoryStore::new())
        }
        StoreKind::File => {
            tracing::debug!(path = %config.store_path.display(), "Using file store");
            Arc::new(FileStore::new(&config.store_path))
        }
        #[cfg(feature = "redis")]
        StoreKind::Redis => match RedisStore::new(config.redis.clone()) {
            Ok(store) => Arc::new(store),
            Err(e) if config.redis.fallback_to_memory => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory store");
                Arc::new(InMemoryStore::new())
            }
            Err(e) => return Err(e).context("failed to connect to Redis store"),
        },
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::fs;

    use quota_core::Category;

    use super::*;

    fn config_from(pairs: &[(&str, String)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_client_scope_and_storage_key_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = config_from(&[
            ("QUOTA_STORE", "file".to_string()),
            ("QUOTA_STORE_PATH", path.display().to_string()),
            ("QUOTA_CLIENT_ID", "tab-7".to_string()),
            ("QUOTA_STORAGE_KEY", "usage".to_string()),
        ]);

        let state = AppState::new(&config, false, false).unwrap();
        state.window.mark(Category::Text).unwrap();

        let entries: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["tab-7:usage"]);
    }

    #[test]
    fn test_unscoped_file_store_uses_plain_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = config_from(&[
            ("QUOTA_STORE", "file".to_string()),
            ("QUOTA_STORE_PATH", path.display().to_string()),
        ]);

        let state = AppState::new(&config, true, false).unwrap();
        state.window.mark(Category::Image).unwrap();
        assert!(!state.window.is_allowed(Category::Image).is_allowed());

        let entries: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(entries.contains_key("rate_limit"));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_unreachable_redis_fails_without_fallback() {
        let mut config = config_from(&[("QUOTA_STORE", "redis".to_string())]);
        config.redis.url = "redis://127.0.0.1:1".to_string();
        config.redis.connect_timeout = std::time::Duration::from_millis(200);

        assert!(AppState::new(&config, false, false).is_err());

        config.redis.fallback_to_memory = true;
        assert!(AppState::new(&config, false, false).is_ok());
    }
}
