//! Redis-backed TTL cache for multi-node deployments

use super::{CacheError, TtlCache};
use async_trait::async_trait;
use fred::clients::Client;
use fred::interfaces::*;
use fred::types::{config::Config as RedisConfig, Expiration};
use std::time::Duration;

/// Initialize Redis client
pub async fn init_client(redis_url: &str) -> anyhow::Result<Client> {
    let config = RedisConfig::from_url(redis_url)?;
    let client = Client::new(config, None, None, None);
    client.init().await?;
    Ok(client)
}

/// Cache operations on a shared Redis connection
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    prefix: String,
}

impl RedisCache {
    pub fn new(client: Client) -> Self {
        Self::with_prefix(client, "gk:")
    }

    /// Namespace every key, so several pipelines can share one Redis
    pub fn with_prefix(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// Ping Redis to check connection
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.client.ping::<()>(None).await?;
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl TtlCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self.client.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        // Redis rejects EX 0
        let secs = ttl.as_secs().max(1) as i64;
        self.client
            .set::<(), _, _>(self.key(key), value, Some(Expiration::EX(secs)), None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.client.del::<i64, _>(self.key(key)).await?;
        Ok(())
    }
}
