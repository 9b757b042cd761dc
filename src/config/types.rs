use crate::search::{Preset, SearchSpec};
use crate::url::Scheme;
use serde::Deserialize;
use std::time::Duration;

/// Browser User-Agent sent with every probe and page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/61.0.3163.100 Safari/537.36";

/// Upper bound of the page and probe timeouts (seconds)
pub const MAX_TIMEOUT_SECS: f64 = 3600.0;

/// Upper bound of `backoff-factor`
pub const MAX_BACKOFF_FACTOR: f64 = 60.0;

/// Converts seconds into a `Duration`, clamped to `0..=max_secs`
///
/// NaN becomes zero.
pub fn clamped_duration(secs: f64, max_secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0).min(max_secs)).unwrap_or(Duration::ZERO)
}

/// Main configuration structure for cbs-scrape
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub search: Vec<SearchEntry>,
}

impl Config {
    /// Compiles the `[[search]]` entries in file order
    pub fn search_spec(&self) -> Result<SearchSpec, regex::Error> {
        SearchSpec::new(
            self.search
                .iter()
                .map(|entry| (entry.name.clone(), entry.pattern_str().to_string())),
        )
    }
}

/// The site to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Host or URL of the site
    pub url: String,

    /// Known scheme; skips scheme probing when given together with `ssl-valid`
    #[serde(default)]
    pub scheme: Option<Scheme>,

    /// Known certificate validity of the site
    #[serde(rename = "ssl-valid", default)]
    pub ssl_valid: Option<bool>,

    /// Probe the target even though scheme and certificate flag are known
    #[serde(rename = "validate-url", default)]
    pub validate_url: Option<bool>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Timeout per page fetch (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Maximum number of frames followed during one crawl
    #[serde(rename = "max-frames", default = "default_max_frames")]
    pub max_frames: usize,

    /// Maximum number of links followed during one crawl
    #[serde(rename = "max-hrefs", default = "default_max_hrefs")]
    pub max_hrefs: usize,

    /// Maximum number of path sections of an internal link
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of links classified per first path section; 0 disables the quota
    #[serde(rename = "max-branch-count", default = "default_max_branch_count")]
    pub max_branch_count: usize,

    /// When false the crawl is configured but no network I/O happens
    #[serde(default = "default_true")]
    pub scrape: bool,

    /// Extensions of links that may be followed (a link without extension always may)
    #[serde(rename = "valid-extensions", default = "default_valid_extensions")]
    pub valid_extensions: Vec<String>,

    /// Links matching any of these patterns are followed first
    #[serde(rename = "rank-keywords", default)]
    pub rank_keywords: Vec<String>,

    /// Search keys that end link following as soon as they have a match
    #[serde(rename = "stop-on-found", default)]
    pub stop_on_found: Vec<String>,
}

impl CrawlerConfig {
    pub fn timeout_duration(&self) -> Duration {
        clamped_duration(self.timeout, MAX_TIMEOUT_SECS)
    }

    /// The branch quota, `None` when disabled
    pub fn branch_quota(&self) -> Option<usize> {
        match self.max_branch_count {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_frames: default_max_frames(),
            max_hrefs: default_max_hrefs(),
            max_depth: default_max_depth(),
            max_branch_count: default_max_branch_count(),
            scrape: true,
            valid_extensions: default_valid_extensions(),
            rank_keywords: Vec::new(),
            stop_on_found: Vec::new(),
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Number of retries after a failed attempt
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before retry `n` is `backoff-factor * 2^(n-1)` seconds
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Response statuses that are retried
    #[serde(rename = "status-forcelist", default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,

    /// Timeout of a scheme probe (seconds)
    #[serde(rename = "probe-timeout", default = "default_timeout")]
    pub probe_timeout: f64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy URL used for every request
    #[serde(default)]
    pub proxy: Option<String>,
}

impl HttpConfig {
    pub fn probe_timeout_duration(&self) -> Duration {
        clamped_duration(self.probe_timeout, MAX_TIMEOUT_SECS)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_factor: default_backoff_factor(),
            status_forcelist: default_status_forcelist(),
            probe_timeout: default_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            proxy: None,
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Stop writing new entries once the directory holds this many bytes
    #[serde(rename = "max-size", default)]
    pub max_size: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_cache_directory(),
            max_size: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

/// One named search
///
/// Either `pattern` or `preset` must be given.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    pub name: String,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub preset: Option<Preset>,
}

impl SearchEntry {
    /// The regular expression of this search, an explicit pattern taking precedence
    pub fn pattern_str(&self) -> &str {
        match (&self.pattern, self.preset) {
            (Some(pattern), _) => pattern,
            (None, Some(preset)) => preset.pattern(),
            (None, None) => "",
        }
    }
}

fn default_timeout() -> f64 {
    5.0
}

fn default_max_frames() -> usize {
    10
}

fn default_max_hrefs() -> usize {
    1000
}

fn default_max_depth() -> usize {
    2
}

fn default_max_branch_count() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_valid_extensions() -> Vec<String> {
    vec![".html".to_string()]
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    0.3
}

fn default_status_forcelist() -> Vec<u16> {
    vec![500, 502, 503, 504]
}

fn default_max_redirects() -> usize {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_cache_directory() -> String {
    "cache".to_string()
}
