//! Link classification
//!
//! Decides whether an href found on a page is worth following and, if so,
//! resolves it into a `CrawlTarget`.
//!
//! # Rejection rules (in order)
//!
//! 1. self references: `#`, `/`, `-`
//! 2. fragments and queries: any `#` or `?`
//! 3. an extension outside the allow-list (no extension is always allowed)
//! 4. a `:` once the scheme is stripped (`mailto:`, `tel:`, ports)
//! 5. branch quota: too many links classified under the same first section
//! 6. depth: too many sections for an internal link (a trailing `.html`
//!    section does not count)

use crate::config::CrawlerConfig;
use crate::crawler::resolver::resolve_scheme;
use crate::crawler::session::HttpSession;
use crate::state::BranchCounter;
use crate::url::{
    clean_url, href_extension, href_sections, is_url, registrable_domain, strip_url_scheme, Scheme,
};
use std::fmt;
use tracing::debug;
use url::Url;

/// Why a link is not followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    SelfReference,
    FragmentOrQuery,
    Extension,
    ColonInPath,
    BranchQuota,
    TooDeep,
    Unresolvable,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfReference => "self reference",
            Self::FragmentOrQuery => "fragment or query",
            Self::Extension => "extension not allowed",
            Self::ColonInPath => "colon in path",
            Self::BranchQuota => "branch quota exceeded",
            Self::TooDeep => "maximum depth exceeded",
            Self::Unresolvable => "unresolvable",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link the crawler decided it may visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The href as found on the page
    pub href: String,
    /// Absolute URL of the link
    pub url: String,
    pub scheme: Option<Scheme>,
    /// Resolved against the site's base URL
    pub relative: bool,
    /// Points to another site
    pub external: bool,
    /// Host of an absolute link (subdomain and registrable domain)
    pub clean_host: Option<String>,
    /// Path sections relative to the site
    pub sections: Vec<String>,
    /// Branch depth as used by the depth rule
    pub depth: usize,
}

/// Classification result of one href
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkVerdict {
    Valid(CrawlTarget),
    Invalid(Rejection),
}

impl LinkVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn target(&self) -> Option<&CrawlTarget> {
        match self {
            Self::Valid(target) => Some(target),
            Self::Invalid(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(rejection) => Some(*rejection),
        }
    }
}

/// Path properties of an href that passed the rules
struct HrefPath {
    sections: Vec<String>,
    depth: usize,
}

/// Classifies the links of one site
pub struct LinkClassifier<'a> {
    base_url: String,
    base_domain: String,
    valid_extensions: Vec<String>,
    max_depth: usize,
    max_branch_count: Option<usize>,
    scheme: Option<Scheme>,
    ssl_valid: bool,
    validate: bool,
    session: &'a HttpSession,
}

impl<'a> LinkClassifier<'a> {
    /// Creates a classifier for the site at `base_url`
    pub fn new(base_url: &str, config: &CrawlerConfig, session: &'a HttpSession) -> Self {
        let base_domain = clean_url(base_url)
            .map(|host| registrable_domain(&host))
            .unwrap_or_default();

        Self {
            base_url: base_url.to_string(),
            base_domain,
            valid_extensions: config
                .valid_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            max_depth: config.max_depth,
            max_branch_count: config.branch_quota(),
            scheme: Scheme::of_url(base_url),
            ssl_valid: true,
            validate: false,
            session,
        }
    }

    /// Sets how absolute links are resolved
    pub fn with_resolution(mut self, scheme: Option<Scheme>, ssl_valid: bool, validate: bool) -> Self {
        self.scheme = scheme;
        self.ssl_valid = ssl_valid;
        self.validate = validate;
        self
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Applies the rejection rules to `href`
    ///
    /// The branch counter is incremented for every href that reaches the
    /// branch rule, whether or not it is rejected there.
    pub fn check_href(&self, href: &str, branches: &mut BranchCounter) -> Result<(), Rejection> {
        self.check_rules(href, branches).map(|_| ())
    }

    fn check_rules(&self, href: &str, branches: &mut BranchCounter) -> Result<HrefPath, Rejection> {
        if matches!(href, "#" | "/" | "-") {
            return Err(Rejection::SelfReference);
        }

        if href.contains('#') || href.contains('?') {
            return Err(Rejection::FragmentOrQuery);
        }

        if let Some(ext) = href_extension(href) {
            if !self.valid_extensions.contains(&ext) {
                return Err(Rejection::Extension);
            }
        }

        if strip_url_scheme(href).contains(':') {
            return Err(Rejection::ColonInPath);
        }

        let sections = href_sections(href, &self.base_url);

        if let Some(max_branch_count) = self.max_branch_count {
            let branch = sections.first().map(String::as_str).unwrap_or_default();
            if branches.increment(branch) > max_branch_count {
                return Err(Rejection::BranchQuota);
            }
        }

        let mut depth = sections.len();
        if self.is_internal(href) {
            if sections.last().map_or(false, |s| s.ends_with(".html")) {
                depth -= 1;
            }
            if depth > self.max_depth {
                return Err(Rejection::TooDeep);
            }
        }

        Ok(HrefPath { sections, depth })
    }

    /// An href without a host, or with a host of the same site
    fn is_internal(&self, href: &str) -> bool {
        match clean_url(href) {
            Some(host) => registrable_domain(&host) == self.base_domain,
            None => true,
        }
    }

    /// Checks and resolves `href`
    ///
    /// Relative hrefs are joined to the base URL. Absolute hrefs are resolved
    /// with the site's scheme (probing only when validation is on) and are
    /// external when their registrable domain differs from the site's.
    pub async fn classify(&self, href: &str, branches: &mut BranchCounter) -> LinkVerdict {
        let path = match self.check_rules(href, branches) {
            Ok(path) => path,
            Err(rejection) => {
                debug!("Skipping href {}: {}", href, rejection);
                return LinkVerdict::Invalid(rejection);
            }
        };

        let relative = href.starts_with('/') || href.starts_with("./") || !is_url(href);

        if relative {
            let joined = Url::parse(&self.base_url).and_then(|base| base.join(href));
            return match joined {
                Ok(url) => LinkVerdict::Valid(CrawlTarget {
                    href: href.to_string(),
                    scheme: Scheme::of_url(url.as_str()),
                    url: url.to_string(),
                    relative: true,
                    external: false,
                    clean_host: None,
                    sections: path.sections,
                    depth: path.depth,
                }),
                Err(e) => {
                    debug!("Could not join {} to {}: {}", href, self.base_url, e);
                    LinkVerdict::Invalid(Rejection::Unresolvable)
                }
            };
        }

        let known = self.scheme.map(|scheme| (scheme, self.ssl_valid));
        let resolved = resolve_scheme(self.session, href, known, self.validate).await;

        let Some(url) = resolved.url else {
            debug!("Could not resolve {}", href);
            return LinkVerdict::Invalid(Rejection::Unresolvable);
        };
        let Some(host) = clean_url(&url) else {
            debug!("No host in resolved href {}", url);
            return LinkVerdict::Invalid(Rejection::Unresolvable);
        };

        let external = registrable_domain(&host) != self.base_domain;
        debug!(
            "Absolute href {} resolved to {} (external: {})",
            href, url, external
        );

        LinkVerdict::Valid(CrawlTarget {
            href: href.to_string(),
            scheme: resolved.scheme,
            url,
            relative: false,
            external,
            clean_host: Some(host),
            sections: path.sections,
            depth: path.depth,
        })
    }
}
