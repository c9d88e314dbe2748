use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::utils::error::{AppError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("pagewatch/", env!("CARGO_PKG_VERSION"));

/// Fetches the raw text of a page. Failures carry the offending URL so
/// the orchestrator can say which target broke.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher over a shared client. No retries here; the next
/// scheduled cycle is the retry.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let timeout = if timeout_secs > 0 {
            timeout_secs
        } else {
            DEFAULT_TIMEOUT_SECS
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let wrap = |source: reqwest::Error| AppError::Fetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(wrap)?;
        let response = response.error_for_status().map_err(wrap)?;
        let body = response.text().await.map_err(wrap)?;
        debug!("fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}
