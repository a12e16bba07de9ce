//! Shared per-retailer plumbing every adapter composes in: one configured
//! HTTP client, the request pacer, metrics, and cached product URLs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use restock_core::{AppConfig, RetailerConfig, RetailerKind};
use serde::de::DeserializeOwned;

use crate::error::RetailerError;
use crate::metrics::MetricsRecorder;
use crate::rate_limit::{retry_with_backoff, RateDecision, RateLimiter};

pub const DEFAULT_API_USER_AGENT: &str = "restock-core/0.1 (+availability monitor)";
pub const DEFAULT_BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// User agents for the two client flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_user_agent: String,
    pub browser_user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_user_agent: DEFAULT_API_USER_AGENT.to_string(),
            browser_user_agent: DEFAULT_BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl From<&AppConfig> for ClientSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_user_agent: config.api_user_agent.clone(),
            browser_user_agent: config.browser_user_agent.clone(),
        }
    }
}

/// Builds the HTTP client for one retailer.
///
/// `api` and `affiliate` retailers get minimal JSON headers and a
/// descriptive user agent; `scraping` retailers look like a browser.
///
/// # Errors
///
/// Returns [`RetailerError::Server`] if the client cannot be constructed.
pub fn build_client(
    config: &RetailerConfig,
    settings: &ClientSettings,
) -> Result<Client, RetailerError> {
    let mut headers = HeaderMap::new();
    let user_agent = match config.kind {
        RetailerKind::Api | RetailerKind::Affiliate => {
            headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
            &settings.api_user_agent
        }
        RetailerKind::Scraping => {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(
                header::ACCEPT_LANGUAGE,
                HeaderValue::from_static("en-US,en;q=0.9"),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            &settings.browser_user_agent
        }
    };

    Client::builder()
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent.as_str())
        .default_headers(headers)
        .build()
        .map_err(|e| RetailerError::server(&config.id, format!("failed to build HTTP client: {e}")))
}

/// A fetched page and the URL it was finally served from, after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

pub struct Scaffold {
    config: RetailerConfig,
    client: Client,
    limiter: RateLimiter,
    metrics: MetricsRecorder,
    /// Catalog product id → known-good product page URL.
    url_hints: Mutex<HashMap<String, String>>,
}

impl Scaffold {
    /// # Errors
    ///
    /// Returns [`RetailerError::Server`] if the HTTP client cannot be built.
    pub fn new(config: RetailerConfig, settings: &ClientSettings) -> Result<Self, RetailerError> {
        let client = build_client(&config, settings)?;
        Ok(Self {
            limiter: RateLimiter::new(config.kind, config.rate_limit),
            metrics: MetricsRecorder::new(&config.id),
            url_hints: Mutex::new(HashMap::new()),
            client,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RetailerConfig {
        &self.config
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Waits for this retailer's next request slot.
    ///
    /// A wait counts as a rate-limit hit. An exhausted hourly budget fails
    /// with [`RetailerError::RateLimited`] without sleeping.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::RateLimited`] when the hourly budget is spent.
    pub async fn throttle(&self) -> Result<(), RetailerError> {
        match self.limiter.reserve() {
            RateDecision::Ready => Ok(()),
            RateDecision::Wait(delay) => {
                self.metrics.record_rate_limit_hit();
                tracing::debug!(
                    retailer = %self.config.id,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "pacing request"
                );
                tokio::time::sleep(delay).await;
                Ok(())
            }
            RateDecision::HourlyExhausted { retry_after } => {
                self.metrics.record_rate_limit_hit();
                Err(RetailerError::RateLimited {
                    retailer: self.config.id.clone(),
                    retry_after_secs: retry_after.as_secs().max(1),
                })
            }
        }
    }

    /// Sends the request produced by `build`, paced and retried per this
    /// retailer's policy, and returns the response body.
    ///
    /// Every attempt is one metrics sample.
    ///
    /// # Errors
    ///
    /// Returns the classified [`RetailerError`] of the last attempt.
    pub async fn send<F>(&self, build: F) -> Result<String, RetailerError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        self.send_page(build).await.map(|page| page.body)
    }

    async fn send_page<F>(&self, build: F) -> Result<FetchedPage, RetailerError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let retry = self.config.retry;
        let build = &build;
        retry_with_backoff(retry.max_retries, retry.backoff_ms, move || async move {
            self.throttle().await?;
            let started = Instant::now();
            let result = self.send_once(build).await;
            match &result {
                Ok(_) => self.metrics.record_success(started.elapsed()),
                Err(_) => self.metrics.record_failure(started.elapsed()),
            }
            result
        })
        .await
    }

    async fn send_once<F>(&self, build: &F) -> Result<FetchedPage, RetailerError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let id = &self.config.id;
        let response = build(&self.client)
            .send()
            .await
            .map_err(|e| RetailerError::from_reqwest(id, &e))?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(RetailerError::from_status(
                id,
                status.as_u16(),
                response.url().as_str(),
                retry_after_secs,
            ));
        }

        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| RetailerError::from_reqwest(id, &e))?;
        Ok(FetchedPage { url, body })
    }

    /// [`Self::send`], then decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Transport errors as for [`Self::send`]; an undecodable body is a
    /// [`RetailerError::Server`] and is not retried.
    pub async fn send_json<T, F>(&self, build: F) -> Result<T, RetailerError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let body = self.send(build).await?;
        serde_json::from_str(&body)
            .map_err(|e| RetailerError::server(&self.config.id, format!("malformed JSON: {e}")))
    }

    /// GETs an HTML page.
    ///
    /// # Errors
    ///
    /// As for [`Self::send`].
    pub async fn get_html(&self, url: &str) -> Result<String, RetailerError> {
        self.send(|client| client.get(url)).await
    }

    /// GETs an HTML page and reports where redirects ended up.
    ///
    /// # Errors
    ///
    /// As for [`Self::send`].
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage, RetailerError> {
        self.send_page(|client| client.get(url)).await
    }

    /// One paced GET without retries, for health probing. Any answer below
    /// 500 other than 401/403/429 means the retailer is reachable. Probes are
    /// kept out of the request metrics.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the retailer is unreachable or
    /// answers with a failure status.
    pub async fn probe(&self, url: &str) -> Result<Duration, RetailerError> {
        self.throttle().await?;
        let started = Instant::now();
        let id = &self.config.id;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetailerError::from_reqwest(id, &e))?;
        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        if status >= 500 || matches!(status, 401 | 403 | 429) {
            return Err(RetailerError::from_status(id, status, url, None));
        }
        Ok(elapsed)
    }

    pub fn remember_url(&self, product_id: &str, url: &str) {
        self.url_hints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id.to_string(), url.to_string());
    }

    #[must_use]
    pub fn url_hint(&self, product_id: &str) -> Option<String> {
        self.url_hints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .cloned()
    }
}

impl std::fmt::Debug for Scaffold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scaffold")
            .field("retailer", &self.config.id)
            .field("kind", &self.config.kind)
            .finish_non_exhaustive()
    }
}
