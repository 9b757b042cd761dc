use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, HttpConfig, SearchEntry, TargetConfig, MAX_BACKOFF_FACTOR,
    MAX_TIMEOUT_SECS,
};
use crate::url::clean_url;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use url::Url;

/// Upper bound of `max-redirects`
const MAX_REDIRECT_LIMIT: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_cache_config(&config.cache)?;
    validate_search_entries(&config.search)?;
    validate_stop_keys(&config.crawler, &config.search)?;
    Ok(())
}

/// Validates the target site
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = config.url.trim();

    if url.is_empty() {
        return Err(ConfigError::InvalidUrl("target url cannot be empty".to_string()));
    }

    if clean_url(url).is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "target url '{}' has no host",
            config.url
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_timeout("timeout", config.timeout)?;

    for ext in &config.valid_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "valid extensions must look like '.html', got '{}'",
                ext
            )));
        }
    }

    for keyword in &config.rank_keywords {
        RegexBuilder::new(keyword)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::InvalidPattern(format!("rank keyword '{}': {}", keyword, e))
            })?;
    }

    Ok(())
}

/// A timeout must be a positive, finite number of seconds below the upper bound
fn validate_timeout(name: &str, secs: f64) -> Result<(), ConfigError> {
    if !(secs > 0.0 && secs <= MAX_TIMEOUT_SECS) {
        return Err(ConfigError::Validation(format!(
            "{} must be > 0 and at most {} seconds, got {}",
            name, MAX_TIMEOUT_SECS, secs
        )));
    }
    Ok(())
}

/// Validates HTTP session configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    validate_timeout("probe-timeout", config.probe_timeout)?;

    if !(0.0..=MAX_BACKOFF_FACTOR).contains(&config.backoff_factor) {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be between 0 and {}, got {}",
            MAX_BACKOFF_FACTOR, config.backoff_factor
        )));
    }

    if let Some(code) = config
        .status_forcelist
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "status-forcelist contains invalid HTTP status {}",
            code
        )));
    }

    if config.max_redirects > MAX_REDIRECT_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be at most {}, got {}",
            MAX_REDIRECT_LIMIT, config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy).map_err(|e| {
            ConfigError::InvalidUrl(format!("proxy '{}' is not a valid URL: {}", proxy, e))
        })?;
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty when the cache is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Validates the `[[search]]` entries
fn validate_search_entries(entries: &[SearchEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search name cannot be empty".to_string(),
            ));
        }

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "search name '{}' is used more than once",
                entry.name
            )));
        }

        match (&entry.pattern, entry.preset) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(format!(
                    "search '{}' has both a pattern and a preset",
                    entry.name
                )))
            }
            (None, None) => {
                return Err(ConfigError::Validation(format!(
                    "search '{}' needs a pattern or a preset",
                    entry.name
                )))
            }
            _ => {}
        }

        Regex::new(entry.pattern_str()).map_err(|e| {
            ConfigError::InvalidPattern(format!("search '{}': {}", entry.name, e))
        })?;
    }

    Ok(())
}

/// Every stop key must name a search
fn validate_stop_keys(crawler: &CrawlerConfig, entries: &[SearchEntry]) -> Result<(), ConfigError> {
    for key in &crawler.stop_on_found {
        if !entries.iter().any(|entry| &entry.name == key) {
            return Err(ConfigError::Validation(format!(
                "stop-on-found key '{}' is not a search name",
                key
            )));
        }
    }
    Ok(())
}
