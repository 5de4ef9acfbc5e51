//! Engine configuration loaded from environment variables

use crate::reputation::{disposable::DEFAULT_API_URL, ReputationConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Redis connection string; the in-process cache is used when unset
    pub redis_url: Option<String>,

    /// Disposable-domain lookup API (domain is appended to the URL)
    pub disposable_api_url: String,

    /// Upper bound on any single reputation lookup
    pub lookup_timeout: Duration,

    pub disposable_ttl: Duration,

    pub mx_ttl: Duration,

    /// Optional YAML file with extra or overriding profiles
    pub pipelines_file: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            redis_url: non_empty("GATEKEEP_REDIS_URL"),
            disposable_api_url: non_empty("GATEKEEP_DISPOSABLE_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            lookup_timeout: seconds("GATEKEEP_LOOKUP_TIMEOUT_SECS", 5)?,
            disposable_ttl: seconds("GATEKEEP_DISPOSABLE_TTL_SECS", 3600)?,
            mx_ttl: seconds("GATEKEEP_MX_TTL_SECS", 1800)?,
            pipelines_file: non_empty("GATEKEEP_PIPELINES_FILE").map(PathBuf::from),
        })
    }

    pub fn reputation(&self) -> ReputationConfig {
        ReputationConfig {
            lookup_timeout: self.lookup_timeout,
            disposable_ttl: self.disposable_ttl,
            mx_ttl: self.mx_ttl,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let reputation = ReputationConfig::default();
        Self {
            redis_url: None,
            disposable_api_url: DEFAULT_API_URL.to_string(),
            lookup_timeout: reputation.lookup_timeout,
            disposable_ttl: reputation.disposable_ttl,
            mx_ttl: reputation.mx_ttl,
            pipelines_file: None,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn seconds(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match non_empty(name) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidDuration { name, value: raw }),
            Ok(secs) => Ok(Duration::from_secs(secs)),
        },
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' (expected a positive number of seconds)")]
    InvalidDuration { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared
    #[test]
    fn test_seconds_default_and_override() {
        assert_eq!(
            seconds("GATEKEEP_TEST_UNSET_SECS", 42).unwrap(),
            Duration::from_secs(42)
        );

        env::set_var("GATEKEEP_TEST_SET_SECS", " 90 ");
        assert_eq!(
            seconds("GATEKEEP_TEST_SET_SECS", 5).unwrap(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_seconds_rejects_garbage() {
        env::set_var("GATEKEEP_TEST_BAD_SECS", "soon");
        assert!(matches!(
            seconds("GATEKEEP_TEST_BAD_SECS", 5),
            Err(ConfigError::InvalidDuration { name: "GATEKEEP_TEST_BAD_SECS", .. })
        ));

        env::set_var("GATEKEEP_TEST_ZERO_SECS", "0");
        assert!(seconds("GATEKEEP_TEST_ZERO_SECS", 5).is_err());
    }

    #[test]
    fn test_defaults_match_reputation_defaults() {
        let config = EngineConfig::default();
        assert!(config.redis_url.is_none());
        assert_eq!(config.disposable_api_url, DEFAULT_API_URL);
        assert_eq!(config.reputation().lookup_timeout, Duration::from_secs(5));
        assert_eq!(config.reputation().mx_ttl, Duration::from_secs(1800));
    }
}
