//! HTTP session shared by every request of one crawl
//!
//! A session holds two clients that differ only in certificate verification,
//! both sending the configured browser User-Agent and following a bounded
//! number of redirects, plus the retry policy applied to every request.

use crate::config::{clamped_duration, HttpConfig};
use crate::crawler::fetcher::{classify_error, FetchError};
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client, Method, Proxy, Response};
use std::time::Duration;
use tracing::debug;

/// Upper bound of the delay before one retry (seconds)
const MAX_RETRY_DELAY_SECS: f64 = 300.0;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retries: u32,

    /// Delay before retry `n` is `backoff_factor * 2^(n-1)` seconds
    pub backoff_factor: f64,

    /// Response statuses that are retried
    pub status_forcelist: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            retries: config.retries,
            backoff_factor: config.backoff_factor,
            status_forcelist: config.status_forcelist.clone(),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff_factor: 0.0,
            status_forcelist: Vec::new(),
        }
    }

    /// Delay before the given retry (1-based), at most five minutes
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        clamped_duration(self.backoff_factor * 2f64.powi(exponent), MAX_RETRY_DELAY_SECS)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

/// Builds one HTTP client of a session
///
/// # Arguments
///
/// * `config` - User-Agent, redirect and proxy settings
/// * `verify` - Whether TLS certificates are verified
pub fn build_http_client(config: &HttpConfig, verify: bool) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::limited(config.max_redirects))
        .danger_accept_invalid_certs(!verify)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Clients, retry policy and default timeout of one crawl
#[derive(Debug, Clone)]
pub struct HttpSession {
    verified: Client,
    unverified: Client,
    retry: RetryPolicy,
    timeout: Duration,
    probe_timeout: Duration,
}

impl HttpSession {
    /// Creates a session whose requests time out after `timeout` unless overridden
    pub fn new(config: &HttpConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            verified: build_http_client(config, true)?,
            unverified: build_http_client(config, false)?,
            retry: RetryPolicy::from_config(config),
            timeout,
            probe_timeout: config.probe_timeout_duration(),
        })
    }

    /// The client to use for the given verification mode
    pub fn client(&self, verify: bool) -> &Client {
        if verify {
            &self.verified
        } else {
            &self.unverified
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout of a scheme probe
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Sends a request, retrying transient failures and forced statuses
    ///
    /// Timeouts and refused connections are retried, as are responses whose
    /// status is in the force list. Once the retries are used up the last
    /// response (or error) is returned.
    pub async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        verify: bool,
        headers: &HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Response, FetchError> {
        let timeout = timeout.unwrap_or(self.timeout);
        let mut retry = 0;

        loop {
            let request = self
                .client(verify)
                .request(method.clone(), url)
                .headers(headers.clone())
                .timeout(timeout);

            let retry_reason = match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if retry >= self.retry.retries || !self.retry.should_retry_status(status) {
                        return Ok(response);
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    let error = classify_error(&e);
                    if retry >= self.retry.retries || !error.is_transient() {
                        return Err(error);
                    }
                    error.to_string()
                }
            };

            retry += 1;
            let delay = self.retry.delay_for(retry);
            debug!(
                "Retry {}/{} for {} {} after {:?} ({})",
                retry, self.retry.retries, method, url, delay, retry_reason
            );
            tokio::time::sleep(delay).await;
        }
    }
}
