//! Crawler coordinator - site search orchestration
//!
//! This module contains the depth-first crawl of one site:
//! - Resolving the scheme of the target
//! - Choosing the page source (plain HTTP or disk cached)
//! - Visiting pages recursively, searching their text and following frames
//! - Building the ranked link table from the first page and following it
//! - Stopping link following once a designated search key has matched

use crate::cache::{CachedFetcher, DiskBlobStore, DiskCache};
use crate::config::{CacheConfig, Config, CrawlerConfig, HttpConfig};
use crate::crawler::classifier::{LinkClassifier, LinkVerdict};
use crate::crawler::fetcher::{FetchOptions, HttpPageSource, PageSource};
use crate::crawler::links::{HrefRecord, HrefTable};
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::crawler::resolver::{resolve_scheme, ResolvedUrl};
use crate::crawler::session::HttpSession;
use crate::search::{MatchRecord, RankKeywords, SearchSpec};
use crate::state::{CrawlPhase, CrawlSession, CrawlStats};
use crate::url::{clean_url, is_url, Scheme};
use crate::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

type VisitFuture<'s> = Pin<Box<dyn Future<Output = ()> + Send + 's>>;

/// Everything that shapes one crawl besides the target and the searches
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub cache: CacheConfig,

    /// Known scheme of the target; probing is skipped when `ssl_valid` is known too
    pub scheme: Option<Scheme>,
    pub ssl_valid: Option<bool>,

    /// Probe the target even with a known scheme. Defaults to probing only
    /// when scheme or certificate flag is missing.
    pub validate_url: Option<bool>,
}

impl CrawlOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            crawler: config.crawler.clone(),
            http: config.http.clone(),
            cache: config.cache.clone(),
            scheme: config.target.scheme,
            ssl_valid: config.target.ssl_valid,
            validate_url: config.target.validate_url,
        }
    }

    fn known_scheme(&self) -> Option<(Scheme, bool)> {
        self.scheme.zip(self.ssl_valid)
    }

    fn validate(&self) -> bool {
        self.validate_url
            .unwrap_or_else(|| self.known_scheme().is_none())
    }
}

/// The result of searching one site
///
/// The crawl runs to completion inside [`SiteSearch::new`]; afterwards the
/// value only exposes what was found.
#[derive(Debug)]
pub struct SiteSearch {
    target: String,
    search_spec: SearchSpec,
    options: CrawlOptions,
    resolved: Option<ResolvedUrl>,
    exists: Option<bool>,
    matches: MatchRecord,
    external_links: Vec<String>,
    href_table: Option<HrefTable>,
    stats: CrawlStats,
    processed_at: DateTime<Utc>,
}

impl SiteSearch {
    /// Searches the site at `target` (a host or URL)
    ///
    /// Only invalid options are errors. An unreachable site or failing pages
    /// are logged and reflected in [`exists`](Self::exists) and
    /// [`stats`](Self::stats).
    pub async fn new(
        target: impl Into<String>,
        search_spec: SearchSpec,
        options: CrawlOptions,
    ) -> Result<Self> {
        let target = target.into();

        if let Some(key) = options
            .crawler
            .stop_on_found
            .iter()
            .find(|key| !search_spec.contains_key(key))
        {
            return Err(ScrapeError::Validation(format!(
                "stop key '{}' is not one of the search keys",
                key
            )));
        }
        let rank_keywords = RankKeywords::new(&options.crawler.rank_keywords)?;

        let mut session = CrawlSession::new(search_spec.keys());

        let (resolved, exists) = if options.crawler.scrape {
            let resolved =
                Self::crawl(&target, &search_spec, &rank_keywords, &options, &mut session).await?;
            (Some(resolved), Some(session.page_found))
        } else {
            info!("Scraping disabled, skipping {}", target);
            session.enter(CrawlPhase::Done);
            (None, None)
        };

        Ok(Self {
            target,
            search_spec,
            options,
            resolved,
            exists,
            matches: session.matches,
            external_links: session.external_links,
            href_table: session.href_table,
            stats: session.stats,
            processed_at: Utc::now(),
        })
    }

    /// Searches the site configured in `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let search_spec = config.search_spec()?;
        Self::new(
            config.target.url.clone(),
            search_spec,
            CrawlOptions::from_config(config),
        )
        .await
    }

    async fn crawl(
        target: &str,
        search_spec: &SearchSpec,
        rank_keywords: &RankKeywords,
        options: &CrawlOptions,
        session: &mut CrawlSession,
    ) -> Result<ResolvedUrl> {
        session.enter(CrawlPhase::ResolvingScheme);

        let http = Arc::new(HttpSession::new(
            &options.http,
            options.crawler.timeout_duration(),
        )?);

        let resolved =
            resolve_scheme(&http, target, options.known_scheme(), options.validate()).await;
        debug!("Resolved {}\n{}", target, resolved);

        let base_url = match &resolved.url {
            Some(url) if resolved.is_reachable() => url.clone(),
            _ => {
                warn!("Could not reach {}, nothing to search", target);
                session.enter(CrawlPhase::Done);
                return Ok(resolved);
            }
        };

        let source = page_source(Arc::clone(&http), &resolved, options);
        let crawl = Crawl {
            base_url: &base_url,
            http: &http,
            source: source.as_ref(),
            search_spec,
            rank_keywords,
            crawler: &options.crawler,
            resolved: &resolved,
            validate: options.validate(),
        };

        info!("Searching {}", base_url);
        session.mark_followed(&base_url);
        crawl
            .recursive_pattern_search(session, base_url.clone(), true)
            .await;
        session.enter(CrawlPhase::Done);

        info!(
            "Finished {}: {} pages visited, {} failed, {} matches",
            base_url,
            session.stats.pages_visited,
            session.stats.pages_failed,
            session.matches.total()
        );

        Ok(resolved)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The resolved URL of the site, or the target when it was not resolved
    pub fn url(&self) -> &str {
        self.resolved
            .as_ref()
            .and_then(|resolved| resolved.url.as_deref())
            .unwrap_or(&self.target)
    }

    /// `None` when scraping was disabled, otherwise whether any page answered 200
    pub fn exists(&self) -> Option<bool> {
        self.exists
    }

    pub fn search_spec(&self) -> &SearchSpec {
        &self.search_spec
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn resolved(&self) -> Option<&ResolvedUrl> {
        self.resolved.as_ref()
    }

    pub fn matches(&self) -> &MatchRecord {
        &self.matches
    }

    /// Hosts of external links, in discovery order
    pub fn external_links(&self) -> &[String] {
        &self.external_links
    }

    pub fn href_table(&self) -> Option<&HrefTable> {
        self.href_table.as_ref()
    }

    pub fn stats(&self) -> CrawlStats {
        self.stats
    }

    /// Completion time of the crawl
    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }
}

impl fmt::Display for SiteSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matches in {}", self.url())?;
        for (key, found) in self.matches.iter() {
            write!(f, "\n{} : {:?}", key, found)?;
        }
        Ok(())
    }
}

/// Picks the page source of a crawl, wrapped by the disk cache when enabled
fn page_source(
    http: Arc<HttpSession>,
    resolved: &ResolvedUrl,
    options: &CrawlOptions,
) -> Box<dyn PageSource> {
    let fetch_options = FetchOptions {
        timeout: Some(options.crawler.timeout_duration()),
        verify: resolved.verify,
        headers: HeaderMap::new(),
    };
    let source = HttpPageSource::new(http, fetch_options);

    if !options.cache.enabled {
        return Box::new(source);
    }

    debug!("Caching pages in {}", options.cache.directory);
    let store = DiskBlobStore::new(options.cache.directory.as_str());
    Box::new(CachedFetcher::new(
        source,
        DiskCache::new(store, options.cache.max_size),
    ))
}

/// Read-only context of a running crawl
struct Crawl<'a> {
    base_url: &'a str,
    http: &'a HttpSession,
    source: &'a dyn PageSource,
    search_spec: &'a SearchSpec,
    rank_keywords: &'a RankKeywords,
    crawler: &'a CrawlerConfig,
    resolved: &'a ResolvedUrl,
    /// Probe absolute hrefs before adding them to the link table
    validate: bool,
}

impl<'a> Crawl<'a> {
    /// Visits `url`, searches it and follows its frames and (if `follow`) the link table
    fn recursive_pattern_search<'s>(
        &'s self,
        session: &'s mut CrawlSession,
        url: String,
        follow: bool,
    ) -> VisitFuture<'s> {
        Box::pin(async move {
            session.enter(CrawlPhase::VisitingPage);

            info!("Fetching {}", url);
            let page = match self.source.fetch(&url).await {
                Ok(page) if page.is_ok() => page,
                Ok(page) => {
                    warn!("Page not found: {} (status {})", url, page.status_code);
                    session.stats.pages_failed += 1;
                    return;
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", url, e);
                    session.stats.pages_failed += 1;
                    return;
                }
            };
            session.page_found = true;
            session.stats.pages_visited += 1;

            let parsed = parse_html(&page.body);

            for (key, regex) in self.search_spec.iter() {
                let found = parsed.find_patterns(regex);
                if !found.is_empty() {
                    debug!("Found {} matches for {} on {}", found.len(), key, url);
                    session.matches.record(key, found, &url);
                }
            }

            if !parsed.frames.is_empty() {
                self.follow_frames(session, &page.url, &parsed.frames, follow)
                    .await;
            }

            if follow {
                self.follow_hrefs(session, &parsed).await;
            }
        })
    }

    async fn follow_frames(
        &self,
        session: &mut CrawlSession,
        page_url: &str,
        frames: &[String],
        follow: bool,
    ) {
        session.enter(CrawlPhase::FollowingFrames);

        for src in frames {
            if !session.next_frame(self.crawler) {
                warn!(
                    "Maximum number of {} frames reached, skipping the rest of {}",
                    self.crawler.max_frames, page_url
                );
                break;
            }

            let frame_url = match Url::parse(page_url).and_then(|base| base.join(src)) {
                Ok(frame_url) => frame_url.to_string(),
                Err(e) => {
                    debug!("Could not resolve frame {} on {}: {}", src, page_url, e);
                    continue;
                }
            };

            debug!("Following frame {}", frame_url);
            self.recursive_pattern_search(session, frame_url, follow)
                .await;
            session.stats.frames_followed += 1;
        }
    }

    async fn follow_hrefs(&self, session: &mut CrawlSession, parsed: &ParsedPage) {
        if session.stop {
            return;
        }
        session.enter(CrawlPhase::FollowingLinks);

        if session.href_table.is_none() {
            let table = self.build_href_table(session, &parsed.hrefs).await;
            debug!("Built link table with {} records", table.len());
            session.href_table = Some(table);
        }

        let records: Vec<HrefRecord> = session
            .href_table
            .as_ref()
            .map(|table| table.records().to_vec())
            .unwrap_or_default();

        for record in records {
            if record.external || session.is_followed(&record.url) {
                continue;
            }

            if !session.next_href(self.crawler) {
                warn!(
                    "Maximum number of {} links reached, not following {}",
                    self.crawler.max_hrefs, record.url
                );
                break;
            }

            session.mark_followed(&record.url);
            if let Some(table) = session.href_table.as_mut() {
                table.record_click(&record.url);
            }

            self.recursive_pattern_search(session, record.url.clone(), false)
                .await;
            session.stats.hrefs_followed += 1;

            if let Some(key) = session.check_stop(&self.crawler.stop_on_found) {
                info!("Found a match for {}, stopping the search", key);
                break;
            }
        }
    }

    /// Classifies the hrefs of the first page into the ranked link table
    async fn build_href_table(&self, session: &mut CrawlSession, hrefs: &[String]) -> HrefTable {
        let classifier = LinkClassifier::new(self.base_url, self.crawler, self.http)
            .with_resolution(self.resolved.scheme, self.resolved.ssl_valid, self.validate);

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for href in hrefs {
            if seen.contains(href) {
                continue;
            }

            if is_url(href) {
                if let Some(host) = clean_url(href) {
                    if session.is_external_link(&host) {
                        debug!("Skipping href {} to known external host", href);
                        continue;
                    }
                }
            }

            let verdict = classifier.classify(href, &mut session.branch_count).await;
            seen.insert(href.clone());

            let LinkVerdict::Valid(target) = verdict else {
                continue;
            };

            if target.external {
                if let Some(host) = &target.clean_host {
                    if session.add_external_link(host) {
                        debug!("External link to {}", host);
                    }
                }
            }

            let ranking = if target.external {
                0
            } else {
                self.rank_keywords.rank(href)
            };

            seen.insert(target.url.clone());
            records.push(HrefRecord {
                href: target.href,
                url: target.url,
                external: target.external,
                relative: target.relative,
                ranking,
                clicks: 0,
            });
        }

        HrefTable::from_records(records)
    }
}
