//! Gatekeep engine - input trust and abuse prevention
//!
//! Screens untrusted user submissions before they are persisted:
//! - Free-text content risk (spam, profanity, injection payloads)
//! - Email, phone and client identity trust
//! - Institutional sign-up enforcement
//! - Per-identity submission rate limits
//!
//! Every check produces a [`ValidationOutcome`]; nothing here panics or
//! returns errors to the caller on bad input.

pub mod abuse;
pub mod cache;
pub mod clock;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod reputation;

pub use config::{ConfigError, EngineConfig};
pub use gatekeep_common::{
    FailureCategory, FailureCode, Purpose, ValidationOutcome, ValidationRequest,
};
pub use orchestrator::{
    OptionsError, PipelineConfig, PipelineError, RequestOptions, Step, ValidationOrchestrator,
};

use abuse::RateLimiter;
use cache::{MemoryCache, RedisCache, TtlCache};
use reputation::{HickoryMailExchangerLookup, HttpDisposableLookup, ReputationClient};
use std::sync::Arc;

/// Wire cache, reputation client, rate limiter and profiles from configuration
pub async fn build_orchestrator(config: &EngineConfig) -> anyhow::Result<ValidationOrchestrator> {
    let cache: Arc<dyn TtlCache> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis...");
            let cache = RedisCache::new(cache::redis::init_client(url).await?);
            cache.ping().await?;
            Arc::new(cache)
        }
        None => {
            tracing::info!("No Redis configured, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let disposable =
        HttpDisposableLookup::new(&config.disposable_api_url, config.lookup_timeout)?;
    let mail_exchanger = match HickoryMailExchangerLookup::from_system_conf() {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::warn!("System resolver unavailable ({}), using public upstreams", e);
            HickoryMailExchangerLookup::with_timeout(config.lookup_timeout)
        }
    };

    let reputation = ReputationClient::new(
        cache.clone(),
        Arc::new(disposable),
        Arc::new(mail_exchanger),
        config.reputation(),
    );

    let pipelines = match &config.pipelines_file {
        Some(path) => {
            tracing::info!("Loading validation profiles from {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::builtin(),
    };
    tracing::info!("{} validation profiles ready", pipelines.profiles.len());

    Ok(ValidationOrchestrator::new(
        Arc::new(reputation),
        RateLimiter::new(cache),
        pipelines,
    ))
}
