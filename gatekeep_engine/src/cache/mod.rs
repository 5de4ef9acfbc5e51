//! TTL key-value cache backing rate counters and reputation verdicts
//!
//! Two backends:
//! - `MemoryCache` for single-process deployments and tests
//! - `RedisCache` for sharing counters across nodes

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    #[error("Corrupt cache entry for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Generic get / set-with-expiry store. No ordering guarantees across keys.
#[async_trait]
pub trait TtlCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Read a JSON value, treating a missing key as `None`
pub async fn get_json<T: serde::de::DeserializeOwned>(
    cache: &dyn TtlCache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Write a JSON value with a TTL
pub async fn set_json<T: serde::Serialize>(
    cache: &dyn TtlCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value).map_err(|source| CacheError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    cache.set(key, raw, ttl).await
}
