//! API Configuration Module
//!
//! CORS, request timeout and occupancy cache settings. Configuration is
//! loaded from environment variables with defaults suited to development.

use std::time::Duration;

use parking_storage::{CacheConfig, InMemoryCache, DEFAULT_KEY_PREFIX};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP-level configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Upper bound on handling a single request.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `PARKING_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `PARKING_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `PARKING_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `PARKING_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("PARKING_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("PARKING_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("PARKING_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let request_timeout = Duration::from_secs(
            std::env::var("PARKING_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            request_timeout,
        }
    }

    /// Check if running with a strict CORS policy.
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.com matches any https subdomain
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain
                        .strip_suffix(pattern)
                        .is_some_and(|sub| sub.ends_with('.'));
                }
            }
            false
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Where occupancy values are cached and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Redis URL. `None` selects the in-process cache.
    pub redis_url: Option<String>,
    /// Entry lifetime; `None` keeps entries until overwritten.
    pub entry_ttl: Option<Duration>,
    pub key_prefix: String,
    /// Key limit for the in-process cache.
    pub memory_max_entries: usize,
}

/// Default key limit for the in-process cache.
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: Some("redis://localhost:6379".to_string()),
            entry_ttl: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    /// - `REDIS_URL`: cache server (default: redis://localhost:6379; empty or
    ///   "memory" selects the in-process cache)
    /// - `OCCUPANCY_CACHE_TTL_SECS`: entry lifetime (unset or 0 = no expiry)
    /// - `OCCUPANCY_MEMORY_MAX_ENTRIES`: in-process cache key limit (default: 10000)
    pub fn from_env() -> Self {
        let redis_url = match std::env::var("REDIS_URL") {
            Ok(url) => parse_redis_url(&url),
            Err(_) => Self::default().redis_url,
        };

        let entry_ttl = std::env::var("OCCUPANCY_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let memory_max_entries = std::env::var("OCCUPANCY_MEMORY_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MEMORY_MAX_ENTRIES);

        Self {
            redis_url,
            entry_ttl,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            memory_max_entries,
        }
    }

    /// In-process cache used when Redis is disabled.
    pub fn memory_cache(&self) -> InMemoryCache {
        InMemoryCache::bounded(self.memory_max_entries)
    }

    /// Occupancy cache configuration derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::default().with_key_prefix(self.key_prefix.clone());
        match self.entry_ttl {
            Some(ttl) => config.with_ttl(ttl),
            None => config,
        }
    }
}

fn parse_redis_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("memory") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_origin_allowed_dev_mode() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.com"));
        assert!(config.is_origin_allowed("http://localhost:5173"));
    }

    #[test]
    fn test_origin_allowed_production() {
        let config = ApiConfig {
            cors_origins: parse_origins("https://parkings.app, https://admin.parkings.app"),
            ..Default::default()
        };

        assert!(config.is_production());
        assert!(config.is_origin_allowed("https://parkings.app"));
        assert!(config.is_origin_allowed("https://admin.parkings.app"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }

    #[test]
    fn test_wildcard_subdomain() {
        let config = ApiConfig {
            cors_origins: vec!["*.parkings.app".to_string()],
            ..Default::default()
        };

        assert!(config.is_origin_allowed("https://map.parkings.app"));
        assert!(!config.is_origin_allowed("https://notparkings.app"));
        assert!(!config.is_origin_allowed("http://map.parkings.app"));
    }

    #[test]
    fn test_redis_url_parsing() {
        assert_eq!(parse_redis_url(""), None);
        assert_eq!(parse_redis_url("memory"), None);
        assert_eq!(
            parse_redis_url(" redis://cache:6379 "),
            Some("redis://cache:6379".to_string())
        );
    }

    #[test]
    fn test_cache_config_from_settings() {
        let settings = CacheSettings {
            redis_url: None,
            entry_ttl: Some(Duration::from_secs(90)),
            key_prefix: "lot".to_string(),
            memory_max_entries: 16,
        };
        let config = settings.cache_config();
        assert_eq!(config.entry_ttl, Some(Duration::from_secs(90)));
        assert_eq!(config.key_for(4).as_str(), "lot:4:occupancy");
    }

    #[test]
    fn test_memory_cache_is_bounded() {
        assert_eq!(
            CacheSettings::default().memory_cache().max_entries(),
            Some(DEFAULT_MEMORY_MAX_ENTRIES)
        );
        let settings = CacheSettings {
            memory_max_entries: 3,
            ..Default::default()
        };
        let cache = settings.memory_cache();
        for id in 0..10 {
            cache.insert_raw(&format!("parking:{id}:occupancy"), "1");
        }
        assert_eq!(cache.len(), 3);
    }
}
