//! Configuration for the aggregation worker.

use std::str::FromStr;
use std::time::Duration;

use meter_db::PoolOptions;

/// Aggregation worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL
    pub database_url: String,
    /// Connection pool bounds
    pub pool: PoolOptions,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
    /// Time between aggregation runs
    pub interval: Duration,
    /// Upper bound on a single run
    pub aggregation_timeout: Duration,
    /// Port for the Prometheus scrape listener; `None` disables metrics
    pub metrics_port: Option<u16>,
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
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        // The worker holds at most one statement at a time
        let pool = PoolOptions {
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 2)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            min_connections: 0,
            ..PoolOptions::default()
        };
        if pool.max_connections == 0 {
            return Err(ConfigError::Invalid("DB_MAX_CONNECTIONS"));
        }

        let interval_secs: u64 = parse_or(&lookup, "AGGREGATION_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid("AGGREGATION_INTERVAL_SECS"));
        }
        let aggregation_timeout: u64 = parse_or(&lookup, "AGGREGATION_TIMEOUT_SECS", 30)?;
        if aggregation_timeout == 0 {
            return Err(ConfigError::Invalid("AGGREGATION_TIMEOUT_SECS"));
        }

        let metrics_port = if parse_or(&lookup, "METRICS_ENABLED", true)? {
            Some(parse_or(&lookup, "METRICS_PORT", 9091)?)
        } else {
            None
        };

        Ok(Self {
            database_url,
            pool,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", false)?,
            interval: Duration::from_secs(interval_secs),
            aggregation_timeout: Duration::from_secs(aggregation_timeout),
            metrics_port,
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
