//! Configuration for the Meter API service.

use std::str::FromStr;
use std::time::Duration;

use meter_core::{MeteringConfig, UsageSource};
use meter_db::PoolOptions;

/// Meter API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Connection pool bounds
    pub pool: PoolOptions,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
    /// Core metering configuration
    pub metering: MeteringConfig,
    /// Host the periodic aggregator in this process
    pub aggregation_enabled: bool,
    /// Time between aggregation runs
    pub aggregation_interval: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        // Database
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let acquire_timeout_secs: u64 = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?;
        let pool = PoolOptions {
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            ..PoolOptions::default()
        };
        if pool.max_connections == 0 {
            return Err(ConfigError::Invalid("DB_MAX_CONNECTIONS"));
        }
        let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", true)?;

        // Server
        let http_port = parse_or(&lookup, "HTTP_PORT", 8080)?;
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECS"));
        }
        let metrics_enabled = parse_or(&lookup, "METRICS_ENABLED", true)?;

        // Aggregation
        let aggregation_enabled = parse_or(&lookup, "AGGREGATION_ENABLED", true)?;
        let interval_secs: u64 = parse_or(&lookup, "AGGREGATION_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid("AGGREGATION_INTERVAL_SECS"));
        }

        // Core
        let storage_timeout: u64 = parse_or(&lookup, "STORAGE_TIMEOUT_SECS", 5)?;
        let aggregation_timeout: u64 = parse_or(&lookup, "AGGREGATION_TIMEOUT_SECS", 30)?;
        let key_cache_ttl: u64 = parse_or(&lookup, "API_KEY_CACHE_TTL_SECS", 30)?;
        if storage_timeout == 0 {
            return Err(ConfigError::Invalid("STORAGE_TIMEOUT_SECS"));
        }
        if aggregation_timeout == 0 {
            return Err(ConfigError::Invalid("AGGREGATION_TIMEOUT_SECS"));
        }
        let metering = MeteringConfig::default()
            .with_storage_timeout(Duration::from_secs(storage_timeout))
            .with_aggregation_timeout(Duration::from_secs(aggregation_timeout))
            .with_key_cache_ttl(Duration::from_secs(key_cache_ttl))
            .with_usage_source(parse_or(&lookup, "BILLING_USAGE_SOURCE", UsageSource::Events)?);

        Ok(Self {
            http_port,
            database_url,
            pool,
            run_migrations,
            metering,
            aggregation_enabled,
            aggregation_interval: Duration::from_secs(interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<_, _> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/meter")]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(3));
        assert_eq!(config.aggregation_interval, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.aggregation_enabled);
        assert_eq!(config.metering.usage_source, UsageSource::Events);
    }

    #[test]
    fn test_database_url_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_invalid_values() {
        let base = ("DATABASE_URL", "postgres://localhost/meter");
        assert!(matches!(
            load(&[base, ("HTTP_PORT", "http")]),
            Err(ConfigError::Invalid("HTTP_PORT"))
        ));
        assert!(matches!(
            load(&[base, ("AGGREGATION_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid("AGGREGATION_INTERVAL_SECS"))
        ));
        assert!(matches!(
            load(&[base, ("BILLING_USAGE_SOURCE", "guess")]),
            Err(ConfigError::Invalid("BILLING_USAGE_SOURCE"))
        ));
    }

    #[test]
    fn test_zero_durations_rejected() {
        for name in [
            "REQUEST_TIMEOUT_SECS",
            "AGGREGATION_INTERVAL_SECS",
            "AGGREGATION_TIMEOUT_SECS",
            "STORAGE_TIMEOUT_SECS",
        ] {
            let err = load(&[("DATABASE_URL", "postgres://localhost/meter"), (name, "0")])
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(n) if n == name), "{name}");
        }
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/meter"),
            ("API_KEY_CACHE_TTL_SECS", "0"),
            ("BILLING_USAGE_SOURCE", "aggregates"),
            ("DB_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        assert!(config.metering.key_cache_ttl.is_zero());
        assert_eq!(config.metering.usage_source, UsageSource::Aggregates);
        assert_eq!(config.pool.max_connections, 4);
    }
}
