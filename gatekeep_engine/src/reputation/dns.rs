//! DNS mail-exchanger lookups via hickory-resolver

use super::{LookupError, MailExchangerLookup};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;

/// MX lookup with an A/AAAA fallback (RFC 5321 implicit MX)
pub struct HickoryMailExchangerLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryMailExchangerLookup {
    /// Resolver from the host's system configuration
    pub fn from_system_conf() -> Result<Self, LookupError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        Ok(Self { resolver })
    }

    /// Resolver against public upstreams with a bounded per-query timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);
        Self { resolver }
    }
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl MailExchangerLookup for HickoryMailExchangerLookup {
    async fn has_mail_exchanger(&self, domain: &str) -> Result<bool, LookupError> {
        // Trailing dot keeps the resolver from appending search domains
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match self.resolver.mx_lookup(fqdn.as_str()).await {
            Ok(mx) if mx.iter().next().is_some() => return Ok(true),
            Ok(_) => {}
            Err(e) if is_no_records(&e) => {}
            Err(e) => return Err(e.into()),
        }

        match self.resolver.lookup_ip(fqdn.as_str()).await {
            Ok(ips) => Ok(ips.iter().next().is_some()),
            Err(e) if is_no_records(&e) => {
                tracing::debug!("No MX or A records for {}", domain);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
