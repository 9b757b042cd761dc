//! Page fetching
//!
//! This module handles:
//! - Fetching one page with the session's retry policy
//! - Classifying transport failures into `FetchError`
//! - The tolerant `get_page_from_url` that turns failures into "no page"
//! - The `PageSource` seam used by the crawler (and wrapped by the cache)

use crate::config::HttpConfig;
use crate::crawler::session::HttpSession;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Timeout of a fetch without session or explicit timeout
const ONE_OFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Message fragments that identify a TLS failure in an error chain
const TLS_MARKERS: &[&str] = &["certificate", "tls", "ssl", "handshake"];

/// A fetched page
///
/// Pages with any status are returned; the crawler only searches pages that
/// answered 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Transport-level failure of a probe or fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionRefused(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionRefused(_))
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Maps a reqwest error onto a `FetchError`
pub fn classify_error(err: &reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else if err.is_redirect() {
        FetchError::TooManyRedirects
    } else if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(message) = tls_failure(err) {
        FetchError::Tls(message)
    } else if err.is_connect() {
        FetchError::ConnectionRefused(root_cause(err))
    } else if err.is_decode() || err.is_body() {
        FetchError::Body(root_cause(err))
    } else {
        FetchError::Other(root_cause(err))
    }
}

/// Finds a TLS failure in the source chain of `err`
///
/// The top-level message is skipped because it contains the request URL.
fn tls_failure(err: &reqwest::Error) -> Option<String> {
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        let lowered = message.to_lowercase();
        if TLS_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            return Some(message);
        }
        source = cause.source();
    }
    None
}

/// Message of the innermost error in the chain
fn root_cause(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message = cause.to_string();
        source = cause.source();
    }
    message
}

/// Per-request options of a fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Overrides the session timeout
    pub timeout: Option<Duration>,

    /// Whether the TLS certificate is verified
    pub verify: bool,

    /// Extra request headers
    pub headers: HeaderMap,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            verify: true,
            headers: HeaderMap::new(),
        }
    }
}

/// Performs one GET (with the session's retries) and reads the body
pub async fn fetch_page(
    session: &HttpSession,
    url: &str,
    options: &FetchOptions,
) -> Result<Page, FetchError> {
    let response = session
        .send_with_retry(
            Method::GET,
            url,
            options.verify,
            &options.headers,
            options.timeout,
        )
        .await?;

    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(|e| classify_error(&e))?;

    Ok(Page {
        url: final_url,
        status_code,
        content_type,
        body,
    })
}

/// Fetches a page, tolerating transport failures
///
/// Without a session a one-off session without retries is used. Any failure
/// is logged and reported as `Ok(None)` unless `raise_errors` is set.
///
/// # Returns
///
/// * `Ok(Some(Page))` - The server answered (with any status)
/// * `Ok(None)` - The fetch failed and errors are not raised
/// * `Err(FetchError)` - The fetch failed and `raise_errors` was set
pub async fn get_page_from_url(
    session: Option<&HttpSession>,
    url: &str,
    options: &FetchOptions,
    raise_errors: bool,
) -> Result<Option<Page>, FetchError> {
    let one_off;
    let session = match session {
        Some(session) => session,
        None => {
            let config = HttpConfig {
                retries: 0,
                ..HttpConfig::default()
            };
            let timeout = options.timeout.unwrap_or(ONE_OFF_TIMEOUT);
            match HttpSession::new(&config, timeout) {
                Ok(session) => {
                    one_off = session;
                    &one_off
                }
                Err(e) => {
                    let error = FetchError::Other(e.to_string());
                    warn!("Could not create HTTP session for {}: {}", url, error);
                    return if raise_errors { Err(error) } else { Ok(None) };
                }
            }
        }
    };

    match fetch_page(session, url, options).await {
        Ok(page) => Ok(Some(page)),
        Err(e) if raise_errors => Err(e),
        Err(e) => {
            warn!("Failed to fetch {}: {}", url, e);
            Ok(None)
        }
    }
}

/// Something that turns a URL into a page
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

/// Fetches pages over HTTP through a shared session
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    session: Arc<HttpSession>,
    options: FetchOptions,
}

impl HttpPageSource {
    pub fn new(session: Arc<HttpSession>, options: FetchOptions) -> Self {
        Self { session, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        fetch_page(&self.session, url, &self.options).await
    }
}
