//! HTTP client for the disposable-domain reputation service

use super::{DisposableLookup, LookupError};
use async_trait::async_trait;
use serde::Deserialize;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://open.kickbox.com/v1/disposable/";

/// Response body of the reputation service
#[derive(Debug, Deserialize)]
struct DisposableResponse {
    disposable: bool,
}

/// Queries `GET {base_url}/{domain}` and reads `{"disposable": bool}`
pub struct HttpDisposableLookup {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDisposableLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gatekeep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| LookupError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(LookupError::InvalidUrl(base_url));
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    /// Request URL with the domain percent-encoded as one trailing path segment
    fn lookup_url(&self, domain: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(domain);
        Ok(url)
    }
}

#[async_trait]
impl DisposableLookup for HttpDisposableLookup {
    async fn is_disposable(&self, domain: &str) -> Result<bool, LookupError> {
        let url = self.lookup_url(domain)?;
        let body: DisposableResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!("Disposable lookup for {}: {}", domain, body.disposable);
        Ok(body.disposable)
    }
}
