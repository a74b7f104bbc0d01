//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the API token and user agent
//! - Bounded retries over connection-level failures
//! - Owning the long-lived connection context and rebuilding it on demand

use crate::config::{ApiConfig, CrawlerConfig};
use crate::crawler::sleeper::Sleeper;
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Result of a resilient fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered; any HTTP status is left to the classifier
    Response(Response),

    /// Every attempt failed at the connection level
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Description of the last failure
        error: String,
    },
}

/// Builds an HTTP client for the remote API
///
/// Every request carries the user agent, a JSON `Accept` header and, when a
/// token is configured, `Authorization: token <value>`.
///
/// # Example
///
/// ```no_run
/// use user_harvest::config::{ApiConfig, CrawlerConfig};
/// use user_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(api: &ApiConfig, crawler: &CrawlerConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = &api.token {
        let mut value = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
            ConfigError::Validation("API token contains invalid header characters".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
        .user_agent(api.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(crawler.request_timeout))
        .connect_timeout(Duration::from_secs(crawler.request_timeout))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Performs GET requests with a bounded retry budget
///
/// After the n-th connection failure the fetcher waits `backoff_base * n`
/// seconds before trying again.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    max_attempts: u32,
    backoff_base: u64,
    sleeper: Sleeper,
}

impl ResilientFetcher {
    pub fn new(max_attempts: u32, backoff_base: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            sleeper: Sleeper::default(),
        }
    }

    /// Replaces the backoff wait policy
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_connect_attempts, config.connect_backoff_base)
    }

    /// Fetches `url`, retrying connection failures
    ///
    /// Returns [`FetchOutcome::Exhausted`] when the budget runs out. The
    /// caller should discard the client in that case; the connection pool
    /// may be broken.
    pub async fn fetch(&self, client: &Client, url: &Url) -> FetchOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match client.get(url.clone()).send().await {
                Ok(response) => return FetchOutcome::Response(response),
                Err(e) => {
                    let kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection refused"
                    } else {
                        "transport error"
                    };
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        kind,
                        error = %e,
                        "Connection error"
                    );
                    last_error = e.to_string();
                    self.sleeper.sleep(self.backoff_base * u64::from(attempt)).await;
                }
            }
        }

        tracing::error!(url = %url, "Connection failed after {} attempts", self.max_attempts);
        FetchOutcome::Exhausted {
            attempts: self.max_attempts,
            error: last_error,
        }
    }
}

/// Connection reuse context shared by every request of a crawl
///
/// Owns the pooled [`Client`] and the settings needed to rebuild it.
pub struct HttpSession {
    client: Client,
    api: ApiConfig,
    crawler: CrawlerConfig,
    fetcher: ResilientFetcher,
    sleeper: Sleeper,
}

impl HttpSession {
    pub fn new(api: &ApiConfig, crawler: &CrawlerConfig) -> Result<Self, HarvestError> {
        Self::with_sleeper(api, crawler, Sleeper::default())
    }

    /// Builds a session whose quota waits and backoff go through `sleeper`
    pub fn with_sleeper(
        api: &ApiConfig,
        crawler: &CrawlerConfig,
        sleeper: Sleeper,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(api, crawler)?;
        Ok(Self::from_parts(client, api, crawler, sleeper))
    }

    /// Wraps an already built client; `api` is only used on reconnect
    pub(crate) fn from_parts(
        client: Client,
        api: &ApiConfig,
        crawler: &CrawlerConfig,
        sleeper: Sleeper,
    ) -> Self {
        Self {
            client,
            api: api.clone(),
            crawler: crawler.clone(),
            fetcher: ResilientFetcher::from_config(crawler).with_sleeper(sleeper.clone()),
            sleeper,
        }
    }

    /// Fetches a URL through the resilient fetcher
    pub async fn get(&self, url: &Url) -> FetchOutcome {
        self.fetcher.fetch(&self.client, url).await
    }

    /// Drops the current client and its pooled connections, then builds a
    /// fresh one
    pub fn reconnect(&mut self) -> Result<(), HarvestError> {
        tracing::info!("Recreating HTTP connection");
        self.client = build_http_client(&self.api, &self.crawler)?;
        Ok(())
    }

    /// Crawler settings this session was built with
    pub fn settings(&self) -> &CrawlerConfig {
        &self.crawler
    }

    pub fn sleeper(&self) -> &Sleeper {
        &self.sleeper
    }
}
