//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quota_core::{Category, ConfigError, Limits, STORAGE_KEY, WindowConfig};

#[cfg(feature = "redis")]
use quota_infra::RedisConfig;

use crate::cli::GlobalArgs;

/// Where the window is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
    #[cfg(feature = "redis")]
    Redis,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            #[cfg(feature = "redis")]
            "redis" => Ok(StoreKind::Redis),
            _ => Err(ConfigError::Invalid {
                key: "QUOTA_STORE",
                value: s.to_string(),
            }),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub store_kind: StoreKind,
    pub store_path: PathBuf,
    pub storage_key: String,
    /// Scope prefix separating the windows of different clients.
    pub client_id: Option<String>,
    /// Lowercased account names that skip the limiter.
    pub privileged_users: Vec<String>,
    #[cfg(feature = "redis")]
    pub redis: RedisConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = WindowConfig::default();

        let period = Duration::from_millis(parse_or(
            &lookup,
            "QUOTA_PERIOD_MS",
            defaults.period.as_millis() as u64,
        ));

        let mut limits = Limits::default();
        for (key, category) in [
            ("QUOTA_LIMIT_TEXT", Category::Text),
            ("QUOTA_LIMIT_CODE", Category::Code),
            ("QUOTA_LIMIT_IMAGE", Category::Image),
        ] {
            limits = limits.with(category, parse_or(&lookup, key, limits.get(category)));
        }

        let window = WindowConfig::new(period, limits);
        window.validate()?;

        let store_kind = match lookup("QUOTA_STORE") {
            Some(raw) => raw.parse()?,
            None => StoreKind::File,
        };

        let privileged_users = lookup("QUOTA_PRIVILEGED_USERS")
            .map(|raw| {
                raw.split(',')
                    .map(|name| name.trim().to_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            window,
            store_kind,
            store_path: lookup("QUOTA_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".quota/store.json")),
            storage_key: lookup("QUOTA_STORAGE_KEY").unwrap_or_else(|| STORAGE_KEY.to_string()),
            client_id: lookup("QUOTA_CLIENT_ID").filter(|id| !id.trim().is_empty()),
            privileged_users,
            #[cfg(feature = "redis")]
            redis: RedisConfig {
                url: lookup("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
                connect_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "REDIS_CONNECT_TIMEOUT_SECS",
                    5,
                )),
                fallback_to_memory: lookup("REDIS_FALLBACK_TO_MEMORY")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            },
        })
    }

    /// Apply command-line flags on top of the environment.
    pub fn apply_overrides(&mut self, args: &GlobalArgs) -> Result<(), ConfigError> {
        if let Some(ms) = args.period_ms {
            self.window.period = Duration::from_millis(ms);
            self.window.validate()?;
        }
        if let Some(kind) = args.store {
            self.store_kind = kind;
        }
        if let Some(path) = &args.store_path {
            self.store_path = path.clone();
        }
        if let Some(id) = args.client_id.as_ref().filter(|id| !id.trim().is_empty()) {
            self.client_id = Some(id.clone());
        }
        Ok(())
    }

    /// Whether `user` is a privileged account that skips the limiter.
    pub fn is_privileged(&self, user: Option<&str>) -> bool {
        user.map(|name| name.trim().to_lowercase())
            .is_some_and(|name| self.privileged_users.contains(&name))
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = %key, value = %raw, "Ignoring unparsable value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.store_kind, StoreKind::File);
        assert_eq!(config.store_path, PathBuf::from(".quota/store.json"));
        assert_eq!(config.storage_key, "rate_limit");
        assert!(config.client_id.is_none());
        assert!(config.privileged_users.is_empty());
    }

    #[test]
    fn test_reads_limits_and_period() {
        let config = config_from(&[
            ("QUOTA_PERIOD_MS", "60000"),
            ("QUOTA_LIMIT_TEXT", "10"),
            ("QUOTA_LIMIT_IMAGE", "0"),
            ("QUOTA_STORE", "Memory"),
        ])
        .unwrap();

        assert_eq!(config.window.period, Duration::from_secs(60));
        assert_eq!(config.window.limits, Limits { text: 10, code: 3, image: 0 });
        assert_eq!(config.store_kind, StoreKind::Memory);
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = config_from(&[("QUOTA_LIMIT_CODE", "lots")]).unwrap();
        assert_eq!(config.window.limits.code, 3);
    }

    #[test]
    fn test_rejects_zero_period_and_unknown_store() {
        assert!(matches!(
            config_from(&[("QUOTA_PERIOD_MS", "0")]),
            Err(ConfigError::ZeroPeriod)
        ));
        assert!(matches!(
            config_from(&[("QUOTA_STORE", "sqlite")]),
            Err(ConfigError::Invalid { key: "QUOTA_STORE", .. })
        ));
    }

    #[test]
    fn test_privileged_users_are_case_insensitive() {
        let config = config_from(&[("QUOTA_PRIVILEGED_USERS", "Gudvin, ops ,")]).unwrap();
        assert_eq!(config.privileged_users, vec!["gudvin", "ops"]);
        assert!(config.is_privileged(Some("GUDVIN")));
        assert!(config.is_privileged(Some(" ops")));
        assert!(!config.is_privileged(Some("alice")));
        assert!(!config.is_privileged(None));
    }

    #[test]
    fn test_flags_override_environment() {
        let mut config = config_from(&[("QUOTA_STORE", "file")]).unwrap();
        let cli = Cli::try_parse_from([
            "quota",
            "status",
            "--store",
            "memory",
            "--period-ms",
            "1000",
            "--client-id",
            "tab-1",
        ])
        .unwrap();

        config.apply_overrides(&cli.global).unwrap();

        assert_eq!(config.store_kind, StoreKind::Memory);
        assert_eq!(config.window.period, Duration::from_secs(1));
        assert_eq!(config.client_id.as_deref(), Some("tab-1"));
    }

    #[test]
    fn test_blank_client_id_flag_keeps_environment_scope() {
        let mut config = config_from(&[("QUOTA_CLIENT_ID", "tab-2")]).unwrap();
        let cli = Cli::try_parse_from(["quota", "status", "--client-id", "  "]).unwrap();
        config.apply_overrides(&cli.global).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("tab-2"));

        let mut unscoped = config_from(&[]).unwrap();
        let cli = Cli::try_parse_from(["quota", "status", "--client-id", ""]).unwrap();
        unscoped.apply_overrides(&cli.global).unwrap();
        assert!(unscoped.client_id.is_none());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_fallback_is_opt_in() {
        assert!(!config_from(&[]).unwrap().redis.fallback_to_memory);
        assert!(
            config_from(&[("REDIS_FALLBACK_TO_MEMORY", "true")])
                .unwrap()
                .redis
                .fallback_to_memory
        );
    }
}
