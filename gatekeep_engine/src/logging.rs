//! Tracing bootstrap for hosts that embed the engine

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info,gatekeep_engine=debug";

/// Install a global subscriber. `RUST_LOG` wins over `default_filter`.
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(default_filter: Option<&str>) -> anyhow::Result<()> {
    let fallback = default_filter.unwrap_or(DEFAULT_FILTER).to_string();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
