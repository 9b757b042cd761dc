//! URL handling module for cbs-scrape
//!
//! This module provides scheme handling, registrable-domain extraction and the
//! href decomposition used by the link classifier.

mod domain;
mod normalize;

use crate::UrlError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

// Re-export main functions
pub use domain::{clean_url, extract_domain, registrable_domain, registrable_domain_of};
pub use normalize::{
    add_scheme_to_url, href_extension, href_sections, is_url, strip_url_scheme,
};

/// The two schemes a site can be reached on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Returns the scheme as it appears in a URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Returns the scheme of an absolute URL string, if it is http(s)
    ///
    /// # Examples
    ///
    /// ```
    /// use cbs_scrape::url::Scheme;
    ///
    /// assert_eq!(Scheme::of_url("https://example.com/"), Some(Scheme::Https));
    /// assert_eq!(Scheme::of_url("http://example.com/"), Some(Scheme::Http));
    /// assert_eq!(Scheme::of_url("example.com"), None);
    /// ```
    pub fn of_url(url: &str) -> Option<Self> {
        if url.starts_with("https://") {
            Some(Self::Https)
        } else if url.starts_with("http://") {
            Some(Self::Http)
        } else {
            None
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(UrlError::InvalidScheme(format!(
                "Only http and https are supported, got: {}",
                other
            ))),
        }
    }
}
