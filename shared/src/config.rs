use crate::{CacheBackend, ListenerMode};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub cache_ttl: Duration,
    pub cache_backend: CacheBackend,
    pub cdc_enabled: bool,
    pub listener_mode: ListenerMode,
    pub skip_init: bool,
    pub cache_log_removed: bool,
    pub backend_count: usize,
}

impl Config {
    const DEFAULT_HOST: &str = "localhost";
    const DEFAULT_PORT: u16 = 3619;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_CACHE_TTL_MS: u64 = 10_000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; missing or unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl_ms = parse_or(&lookup, "FREESEATS_CACHE_TTL_MS", Self::DEFAULT_CACHE_TTL_MS);
        let backend_count = parse_or(&lookup, "FREESEATS_BACKEND_COUNT", 1usize);
        if backend_count == 0 {
            warn!("FREESEATS_BACKEND_COUNT must be at least 1, using 1");
        }

        Self {
            host: lookup("FREESEATS_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "FREESEATS_PORT", Self::DEFAULT_PORT),
            data_dir: lookup("FREESEATS_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            cache_ttl: Duration::from_millis(cache_ttl_ms),
            cache_backend: parse_or(&lookup, "FREESEATS_CACHE_BACKEND", CacheBackend::default()),
            cdc_enabled: parse_or(&lookup, "FREESEATS_CDC", true),
            listener_mode: parse_or(&lookup, "FREESEATS_CDC_MODE", ListenerMode::default()),
            skip_init: parse_or(&lookup, "FREESEATS_SKIP_INIT", false),
            cache_log_removed: parse_or(&lookup, "FREESEATS_CACHE_LOG_REMOVED", false),
            backend_count: backend_count.max(1),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_enabled(&self) -> bool {
        !self.cache_ttl.is_zero()
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default", name, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.listen_addr(), "localhost:3619");
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.cache_backend, CacheBackend::Ttl);
        assert_eq!(config.listener_mode, ListenerMode::Invalidate);
        assert!(config.cdc_enabled);
        assert!(!config.skip_init);
        assert!(!config.cache_log_removed);
        assert_eq!(config.backend_count, 1);
        assert!(config.cache_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("FREESEATS_PORT", "8080"),
            ("FREESEATS_CACHE_TTL_MS", "0"),
            ("FREESEATS_CACHE_BACKEND", "moka"),
            ("FREESEATS_CDC", "false"),
            ("FREESEATS_CDC_MODE", "direct"),
            ("FREESEATS_BACKEND_COUNT", "3"),
            ("FREESEATS_CACHE_LOG_REMOVED", "true"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(!config.cache_enabled());
        assert_eq!(config.cache_backend, CacheBackend::Moka);
        assert!(!config.cdc_enabled);
        assert_eq!(config.listener_mode, ListenerMode::DirectUpdate);
        assert_eq!(config.backend_count, 3);
        assert!(config.cache_log_removed);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("FREESEATS_PORT", "not-a-port"),
            ("FREESEATS_BACKEND_COUNT", "0"),
            ("FREESEATS_CDC_MODE", "sometimes"),
        ]);
        assert_eq!(config.port, 3619);
        assert_eq!(config.backend_count, 1);
        assert_eq!(config.listener_mode, ListenerMode::Invalidate);
    }
}
