//! Portal configuration
//!
//! Loaded once at startup from environment variables (after `.env` has been
//! read by the binary). Nothing here is mutated at runtime.

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_FILTER: &str = "research_portal=info,tower_http=debug";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/research_portal".to_string()),
            max_connections: env_parse("DATABASE_POOL_SIZE", 10),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub log_filter: String,
    /// Insert the institutional vertical / special-area taxonomy on startup
    pub seed_taxonomy: bool,
}

impl PortalConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("PORTAL_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(
                        "Invalid PORTAL_BIND_ADDR '{}', using {}: {}",
                        raw,
                        DEFAULT_BIND_ADDR,
                        e
                    );
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        Self {
            bind_addr,
            database: DatabaseConfig::default(),
            log_filter: std::env::var("PORTAL_LOG_FILTER")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            seed_taxonomy: env_bool("PORTAL_SEED_TAXONOMY", true),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr_matches_constant() {
        assert_eq!(default_bind_addr().to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_env_bool_default_when_unset() {
        assert!(env_bool("PORTAL_TEST_SURELY_UNSET_FLAG", true));
        assert!(!env_bool("PORTAL_TEST_SURELY_UNSET_FLAG", false));
    }

    #[test]
    fn test_env_parse_default_when_unset() {
        assert_eq!(env_parse("PORTAL_TEST_SURELY_UNSET_NUMBER", 7u32), 7);
    }
}
