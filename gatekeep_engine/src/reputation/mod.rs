//! Domain reputation lookups (disposable-provider API and DNS MX/A)
//!
//! Each fact is cached under its own key and TTL. Concurrent misses for the
//! same domain share a single in-flight network call. Every network failure
//! or timeout fails open: the domain is treated as not disposable and as able
//! to receive mail.

pub mod disposable;
pub mod dns;

pub use disposable::HttpDisposableLookup;
pub use dns::HickoryMailExchangerLookup;

use crate::cache::TtlCache;
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("HTTP lookup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DNS lookup failed: {0}")]
    Dns(#[from] hickory_resolver::error::ResolveError),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid lookup URL: {0}")]
    InvalidUrl(String),
}

/// Third-party "is this a throwaway mailbox provider" service
#[async_trait]
pub trait DisposableLookup: Send + Sync {
    async fn is_disposable(&self, domain: &str) -> Result<bool, LookupError>;
}

/// DNS check for MX records, falling back to A/AAAA
#[async_trait]
pub trait MailExchangerLookup: Send + Sync {
    /// `Ok(false)` only when the resolver positively reports no records
    async fn has_mail_exchanger(&self, domain: &str) -> Result<bool, LookupError>;
}

/// Lookup timing and cache lifetimes
#[derive(Debug, Clone)]
pub struct ReputationConfig {
    pub lookup_timeout: Duration,
    pub disposable_ttl: Duration,
    pub mx_ttl: Duration,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(5),
            disposable_ttl: Duration::from_secs(3600),
            mx_ttl: Duration::from_secs(1800),
        }
    }
}

type InFlight = DashMap<String, Arc<OnceCell<bool>>>;

/// Cached, deduplicated, fail-open reputation lookups
pub struct ReputationClient {
    cache: Arc<dyn TtlCache>,
    disposable: Arc<dyn DisposableLookup>,
    mail_exchanger: Arc<dyn MailExchangerLookup>,
    config: ReputationConfig,
    in_flight: InFlight,
}

impl ReputationClient {
    pub fn new(
        cache: Arc<dyn TtlCache>,
        disposable: Arc<dyn DisposableLookup>,
        mail_exchanger: Arc<dyn MailExchangerLookup>,
        config: ReputationConfig,
    ) -> Self {
        Self {
            cache,
            disposable,
            mail_exchanger,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Whether the domain belongs to a disposable-mail provider.
    /// Fails open (`false`) on any lookup error.
    pub async fn is_disposable(&self, domain: &str) -> bool {
        let key = format!("rep:disposable:{}", domain);
        let lookup = self.disposable.clone();
        let owned = domain.to_string();
        self.cached_fact(&key, self.config.disposable_ttl, false, async move {
            lookup.is_disposable(&owned).await
        })
        .await
    }

    /// Whether the domain publishes MX (or A/AAAA) records.
    /// Fails open (`true`) on resolver errors and timeouts.
    pub async fn has_mail_exchanger(&self, domain: &str) -> bool {
        let key = format!("rep:mx:{}", domain);
        let lookup = self.mail_exchanger.clone();
        let owned = domain.to_string();
        self.cached_fact(&key, self.config.mx_ttl, true, async move {
            lookup.has_mail_exchanger(&owned).await
        })
        .await
    }

    async fn cached_fact<F>(&self, key: &str, ttl: Duration, fail_open: bool, lookup: F) -> bool
    where
        F: Future<Output = Result<bool, LookupError>>,
    {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match raw.as_str() {
                "1" => return true,
                "0" => return false,
                _ => tracing::warn!("Ignoring corrupt reputation entry {}", key),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Reputation cache read failed for {}: {}", key, e),
        }

        let cell = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let timeout = self.config.lookup_timeout;
        let value = *cell
            .get_or_init(|| async move {
                match tokio::time::timeout(timeout, lookup).await {
                    Ok(Ok(value)) => {
                        let raw = if value { "1" } else { "0" };
                        if let Err(e) = self.cache.set(key, raw.to_string(), ttl).await {
                            tracing::warn!("Reputation cache write failed for {}: {}", key, e);
                        }
                        value
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("{} lookup failed, failing open: {}", key, e);
                        fail_open
                    }
                    Err(_) => {
                        tracing::warn!(
                            "{} lookup failed, failing open: {}",
                            key,
                            LookupError::Timeout(timeout)
                        );
                        fail_open
                    }
                }
            })
            .await;

        // Only the cell that resolved may leave; a later cell for the same key belongs to a new flight
        self.in_flight
            .remove_if(key, |_, existing| Arc::ptr_eq(existing, &cell));

        value
    }
}
