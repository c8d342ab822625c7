//! HTTP client for the portal.
//!
//! All requests pass through the rate limiter; transient failures are
//! retried with a fixed delay. The portal occasionally serves a 200 with an
//! empty body, which is treated as retryable.

use std::time::Duration;

use tracing::debug;

use crate::config::PortalConfig;
use crate::error::ScrapeError;
use crate::retry::{retry, RetryConfig};
use crate::scraper::cache::{Cache, CacheCategory};
use crate::scraper::RateLimiter;

/// Client for fetching portal pages
pub struct PortalClient {
    http: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryConfig,
    cache: Cache,
    /// When set, cached pages are ignored and refetched
    refresh: bool,
}

impl PortalClient {
    /// Build a client from portal configuration
    pub fn new(config: &PortalConfig, refresh: bool) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nuliga-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScrapeError::Transport {
                url: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            http,
            limiter: RateLimiter::new(
                config.requests_per_minute,
                config.min_delay_secs,
                config.max_delay_secs,
            ),
            retry: RetryConfig::portal(),
            cache: Cache::new(config.cache_dir.clone().into()),
            refresh,
        })
    }

    /// Fetch a page, going through the cache first.
    pub async fn fetch_cached(
        &self,
        category: CacheCategory,
        key: &str,
        url: &str,
    ) -> Result<String, ScrapeError> {
        if !self.refresh {
            if let Some(html) = self.cache.get(category, key) {
                debug!("cache hit for {} key {}", category.dir_name(), key);
                return Ok(html);
            }
        }

        let html = self.fetch(url).await?;
        if let Err(e) = self.cache.set(category, key, &html) {
            debug!("failed to write cache entry for {}: {}", key, e);
        }
        Ok(html)
    }

    /// Fetch a page with rate limiting and bounded retries.
    pub async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        retry(&self.retry, url, ScrapeError::is_retryable, || async {
            self.limiter.acquire().await;
            self.get_once(url).await
        })
        .await
    }

    /// Submit a form POST (club search) with the same politeness rules.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, ScrapeError> {
        retry(&self.retry, url, ScrapeError::is_retryable, || async {
            self.limiter.acquire().await;
            let response = self
                .http
                .post(url)
                .form(form)
                .send()
                .await
                .map_err(|e| ScrapeError::Transport {
                    url: url.to_string(),
                    source: e,
                })?;
            Self::read_body(url, response).await
        })
        .await
    }

    async fn get_once(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        Self::read_body(url, response).await
    }

    async fn read_body(url: &str, response: reqwest::Response) -> Result<String, ScrapeError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| ScrapeError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        if body.trim().is_empty() || !body.contains('<') {
            return Err(ScrapeError::EmptyPage {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}
