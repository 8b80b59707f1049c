//! Core configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Where invoice generation reads usage from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsageSource {
    /// Sum raw events in the period; always current
    #[default]
    Events,
    /// Sum daily buckets lying entirely inside the period; lags ingestion by
    /// up to one aggregation interval
    Aggregates,
}

impl UsageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Aggregates => "aggregates",
        }
    }
}

impl fmt::Display for UsageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "events" => Ok(Self::Events),
            "aggregates" => Ok(Self::Aggregates),
            other => Err(format!("unknown usage source: {other}")),
        }
    }
}

/// Metering service configuration
#[derive(Debug, Clone)]
pub struct MeteringConfig {
    /// Upper bound on any single storage call
    pub storage_timeout: Duration,
    /// Upper bound on one aggregation run
    pub aggregation_timeout: Duration,
    /// TTL for positive API key lookups; zero disables the cache
    pub key_cache_ttl: Duration,
    /// Maximum cached API keys
    pub key_cache_capacity: u64,
    /// Usage source for invoice generation
    pub usage_source: UsageSource,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(5),
            aggregation_timeout: Duration::from_secs(30),
            key_cache_ttl: Duration::from_secs(30),
            key_cache_capacity: 10_000,
            usage_source: UsageSource::Events,
        }
    }
}

impl MeteringConfig {
    /// Set the per-call storage timeout
    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    /// Set the aggregation run timeout
    pub fn with_aggregation_timeout(mut self, timeout: Duration) -> Self {
        self.aggregation_timeout = timeout;
        self
    }

    /// Set the API key cache TTL
    pub fn with_key_cache_ttl(mut self, ttl: Duration) -> Self {
        self.key_cache_ttl = ttl;
        self
    }

    /// Set the billing usage source
    pub fn with_usage_source(mut self, source: UsageSource) -> Self {
        self.usage_source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_source_parse() {
        assert_eq!("events".parse::<UsageSource>().unwrap(), UsageSource::Events);
        assert_eq!(
            "Aggregates".parse::<UsageSource>().unwrap(),
            UsageSource::Aggregates
        );
        assert!("raw".parse::<UsageSource>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = MeteringConfig::default();
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
        assert_eq!(config.key_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.usage_source, UsageSource::Events);
    }
}
