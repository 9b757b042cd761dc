//! Integration tests for the site search
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! searches against them end-to-end.

use cbs_scrape::cache::{make_cache_file_name, DiskBlobStore, DiskCache, FETCH_FUNCTION_NAME};
use cbs_scrape::config::{CacheConfig, CrawlerConfig, HttpConfig};
use cbs_scrape::crawler::{get_page_from_url, FetchError, FetchOptions, Page};
use cbs_scrape::{CrawlOptions, Scheme, SearchSpec, SiteSearch};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZIP: &str = r"[1-9]\d{3}\s?[A-Z]{2}";

/// Options for a server whose scheme is known, so nothing is probed
fn create_test_options() -> CrawlOptions {
    CrawlOptions {
        crawler: CrawlerConfig {
            timeout: 2.0,
            ..CrawlerConfig::default()
        },
        http: HttpConfig {
            retries: 0,
            backoff_factor: 0.0,
            probe_timeout: 2.0,
            ..HttpConfig::default()
        },
        scheme: Some(Scheme::Http),
        ssl_valid: Some(true),
        ..CrawlOptions::default()
    }
}

fn zip_spec() -> SearchSpec {
    SearchSpec::new([("zip", ZIP)]).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Paths of all GET requests the server received, in order
async fn get_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.to_string() == "GET")
        .map(|request| request.url.path().to_string())
        .collect()
}

fn cache_files(directory: &Path) -> usize {
    match std::fs::read_dir(directory) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn test_search_finds_postcodes() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<h1>Welkom</h1><a href="/contact">Contact</a><a href="/about">Over ons</a>"#,
    )
    .await;
    mount_page(&mock_server, "/contact", "<p>Kerkstraat 1</p><p>2613 AB Delft</p>").await;
    mount_page(&mock_server, "/about", "<p>Sinds 1999</p>").await;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), create_test_options())
        .await
        .unwrap();

    let base_url = format!("{}/", mock_server.uri());
    assert_eq!(search.exists(), Some(true));
    assert_eq!(search.url(), base_url);
    assert_eq!(search.resolved().and_then(|r| r.scheme), Some(Scheme::Http));
    assert_eq!(search.matches().get("zip"), ["2613 AB"]);
    assert_eq!(
        search.matches().url_for("zip", "2613 AB"),
        Some(format!("{}contact", base_url).as_str())
    );
    assert_eq!(search.stats().pages_visited, 3);
    assert_eq!(
        search.to_string(),
        format!("Matches in {}\nzip : [\"2613 AB\"]", base_url)
    );
}

#[tokio::test]
async fn test_ranked_links_are_visited_first() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/catalog">Catalog</a><a href="/products">Products</a><a href="/about-us">About</a>"#,
    )
    .await;
    mount_page(&mock_server, "/catalog", "").await;
    mount_page(&mock_server, "/products", "").await;
    mount_page(&mock_server, "/about-us", "").await;

    let mut options = create_test_options();
    options.crawler.rank_keywords = vec!["ABOUT".to_string()];

    SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(
        get_paths(&mock_server).await,
        vec!["/", "/about-us", "/catalog", "/products"]
    );
}

#[tokio::test]
async fn test_stop_on_found() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/products">Products</a><a href="/contact">Contact</a>"#,
    )
    .await;
    mount_page(&mock_server, "/contact", "<p>1234 AB Dorp</p>").await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(html("<p>5678 CD</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.crawler.rank_keywords = vec!["contact".to_string()];
    options.crawler.stop_on_found = vec!["zip".to_string()];

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.matches().get("zip"), ["1234 AB"]);
    assert_eq!(search.stats().hrefs_followed, 1);
}

#[tokio::test]
async fn test_external_links_are_recorded_not_followed() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="https://www.other.nl/">Partner</a>
           <a href="https://shop.other.nl/">Shop</a>
           <a href="/contact">Contact</a>"#,
    )
    .await;
    mount_page(&mock_server, "/contact", "").await;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), create_test_options())
        .await
        .unwrap();

    assert_eq!(search.external_links(), ["www.other.nl", "shop.other.nl"]);
    assert_eq!(get_paths(&mock_server).await, vec!["/", "/contact"]);

    let table = search.href_table().unwrap();
    assert_eq!(table.iter().filter(|record| record.external).count(), 2);
    assert!(table
        .iter()
        .filter(|record| record.external)
        .all(|record| record.clicks == 0));
}

#[tokio::test]
async fn test_depth_limit() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/a/b">Shallow</a><a href="/a/b/c">Deep</a><a href="/a/b/page.html">Page</a>"#,
    )
    .await;
    mount_page(&mock_server, "/a/b", "").await;
    mount_page(&mock_server, "/a/b/page.html", "").await;
    Mock::given(method("GET"))
        .and(path("/a/b/c"))
        .respond_with(html(""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), create_test_options())
        .await
        .unwrap();

    assert_eq!(search.stats().hrefs_followed, 2);
}

#[tokio::test]
async fn test_branch_quota() {
    let mock_server = MockServer::start().await;

    let links: String = (1..=20)
        .map(|n| format!(r#"<a href="/cars/{}">Car {}</a>"#, n, n))
        .collect();
    mount_page(&mock_server, "/", &format!(r#"{}<a href="/boats">Boats</a>"#, links)).await;
    mount_page(&mock_server, "/boats", "").await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/cars/\d+$"))
        .respond_with(html(""))
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.crawler.max_branch_count = 5;

    SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    let paths = get_paths(&mock_server).await;
    assert_eq!(paths.iter().filter(|p| p.starts_with("/cars/")).count(), 5);
    assert!(paths.contains(&"/boats".to_string()));
}

#[tokio::test]
async fn test_link_budget() {
    let mock_server = MockServer::start().await;

    let links: String = (1..=5)
        .map(|n| format!(r#"<a href="/page{}">Page {}</a>"#, n, n))
        .collect();
    mount_page(&mock_server, "/", &links).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/page\d$"))
        .respond_with(html(""))
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.crawler.max_hrefs = 3;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(get_paths(&mock_server).await.len(), 4);
    assert_eq!(search.stats().hrefs_followed, 3);
}

#[tokio::test]
async fn test_frame_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><frameset cols="33%,33%,33%">
                        <frame src="left.html">
                        <frame src="middle.html">
                        <frame src="right.html">
                    </frameset></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/left.html", "<p>1111 AA</p>").await;
    mount_page(&mock_server, "/middle.html", "<p>2222 BB</p>").await;
    Mock::given(method("GET"))
        .and(path("/right.html"))
        .respond_with(html("<p>3333 CC</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.crawler.max_frames = 2;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.matches().get("zip"), ["1111 AA", "2222 BB"]);
    assert_eq!(search.stats().frames_followed, 2);
}

#[tokio::test]
async fn test_scrape_disabled_makes_no_requests() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<p>1234 AB</p>").await;

    let mut options = create_test_options();
    options.crawler.scrape = false;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.exists(), None);
    assert!(search.matches().is_empty());
    assert!(get_paths(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_unreachable_target() {
    let mut options = create_test_options();
    options.scheme = None;
    options.ssl_valid = None;

    let search = SiteSearch::new("127.0.0.1:1", zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.exists(), Some(false));
    assert!(search.resolved().unwrap().url.is_none());
    assert!(search.matches().is_empty());
    assert_eq!(search.stats().pages_visited, 0);
}

#[tokio::test]
async fn test_scheme_falls_back_to_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "<p>1234 AB</p>").await;

    let mut options = create_test_options();
    options.scheme = None;
    options.ssl_valid = None;

    let target = mock_server.uri().trim_start_matches("http://").to_string();
    let search = SiteSearch::new(target, zip_spec(), options).await.unwrap();

    let resolved = search.resolved().unwrap();
    assert_eq!(resolved.scheme, Some(Scheme::Http));
    assert_eq!(resolved.url, Some(format!("{}/", mock_server.uri())));
    assert_eq!(search.exists(), Some(true));
}

/// Routes every request for www.example.nl (and elsewhere) through the mock server
fn proxied_options(mock_server: &MockServer) -> CrawlOptions {
    let mut options = create_test_options();
    options.http.proxy = Some(mock_server.uri());
    options
}

/// Paths of all HEAD requests the server received, in order
async fn head_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.to_string() == "HEAD")
        .map(|request| request.url.path().to_string())
        .collect()
}

async fn mount_site_with_absolute_links(mock_server: &MockServer) {
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(mock_server)
        .await;
    mount_page(
        mock_server,
        "/",
        r#"<a href="http://www.example.nl/contact">Contact</a>
           <a href="http://www.example.nl/go">Partner</a>"#,
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/contact/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(mock_server)
        .await;
    mount_page(mock_server, "/contact/", "<p>Postbus 1234 AB</p>").await;

    Mock::given(method("HEAD"))
        .and(path("/go/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "http://partner.test/landing"),
        )
        .mount(mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200))
        .mount(mock_server)
        .await;
    mount_page(mock_server, "/go/", "<p>9999 ZZ</p>").await;
}

#[tokio::test]
async fn test_absolute_links_are_resolved_when_scheme_is_unknown() {
    let mock_server = MockServer::start().await;
    mount_site_with_absolute_links(&mock_server).await;

    let mut options = proxied_options(&mock_server);
    options.scheme = None;
    options.ssl_valid = None;

    let search = SiteSearch::new("www.example.nl", zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.url(), "http://www.example.nl/");
    let heads = head_paths(&mock_server).await;
    assert!(heads.contains(&"/contact/".to_string()));
    assert!(heads.contains(&"/go/".to_string()));

    // the redirect lands on another site, so the link is external
    assert_eq!(search.external_links(), ["partner.test"]);
    assert_eq!(get_paths(&mock_server).await, vec!["/", "/contact/"]);
    assert_eq!(search.matches().get("zip"), ["1234 AB"]);
}

#[tokio::test]
async fn test_absolute_links_are_not_resolved_with_known_scheme() {
    let mock_server = MockServer::start().await;
    mount_site_with_absolute_links(&mock_server).await;

    let search = SiteSearch::new("www.example.nl", zip_spec(), proxied_options(&mock_server))
        .await
        .unwrap();

    assert!(head_paths(&mock_server).await.is_empty());
    assert!(search.external_links().is_empty());
    assert_eq!(get_paths(&mock_server).await, vec!["/", "/contact/", "/go/"]);
}

#[tokio::test]
async fn test_unbounded_timeouts_do_not_abort_the_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<p>1234 AB</p>").await;

    let mut options = create_test_options();
    options.crawler.timeout = f64::INFINITY;
    options.http.probe_timeout = f64::NAN;
    options.http.backoff_factor = 1e308;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.exists(), Some(true));
    assert_eq!(search.matches().get("zip"), ["1234 AB"]);
}

#[tokio::test]
async fn test_cached_pages_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/contact">Contact</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html("<p>2613 AB</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut options = create_test_options();
    options.cache = CacheConfig {
        enabled: true,
        directory: dir.path().to_string_lossy().to_string(),
        max_size: None,
    };

    let first = SiteSearch::new(mock_server.uri(), zip_spec(), options.clone())
        .await
        .unwrap();
    let second = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(first.matches(), second.matches());
    assert_eq!(second.matches().get("zip"), ["2613 AB"]);
    assert_eq!(cache_files(dir.path()), 2);
}

#[tokio::test]
async fn test_zero_cache_budget_writes_nothing() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let cache_dir = dir.path().join("pages");

    mount_page(&mock_server, "/", "<p>2613 AB</p>").await;

    let mut options = create_test_options();
    options.cache = CacheConfig {
        enabled: true,
        directory: cache_dir.to_string_lossy().to_string(),
        max_size: Some(0),
    };

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.matches().get("zip"), ["2613 AB"]);
    assert_eq!(cache_files(&cache_dir), 0);
}

#[tokio::test]
async fn test_zero_cache_budget_serves_existing_entries() {
    let mock_server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(html("<p>9999 ZZ</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let base_url = format!("{}/", mock_server.uri());
    let cache = DiskCache::new(DiskBlobStore::new(dir.path()), None);
    let key = make_cache_file_name(FETCH_FUNCTION_NAME, &[base_url.as_str()]);
    cache
        .persist(
            &key,
            &Page {
                url: base_url.clone(),
                status_code: 200,
                content_type: Some("text/html".to_string()),
                body: "<p>2613 AB</p>".to_string(),
            },
        )
        .unwrap();

    let mut options = create_test_options();
    options.cache = CacheConfig {
        enabled: true,
        directory: dir.path().to_string_lossy().to_string(),
        max_size: Some(0),
    };

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.exists(), Some(true));
    assert_eq!(search.matches().get("zip"), ["2613 AB"]);
}

#[tokio::test]
async fn test_retry_on_forcelisted_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "<p>2613 AB</p>").await;

    let mut options = create_test_options();
    options.http.retries = 1;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), options)
        .await
        .unwrap();

    assert_eq!(search.exists(), Some(true));
    assert_eq!(search.matches().get("zip"), ["2613 AB"]);
}

#[tokio::test]
async fn test_page_not_found_is_not_fatal() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/gone">Gone</a><a href="/contact">Contact</a>"#,
    )
    .await;
    mount_page(&mock_server, "/contact", "<p>2613 AB</p>").await;

    let search = SiteSearch::new(mock_server.uri(), zip_spec(), create_test_options())
        .await
        .unwrap();

    assert_eq!(search.stats().pages_failed, 1);
    assert_eq!(search.matches().get("zip"), ["2613 AB"]);
}

#[tokio::test]
async fn test_tolerant_fetcher() {
    let options = FetchOptions {
        timeout: Some(Duration::from_secs(2)),
        ..FetchOptions::default()
    };

    let tolerated = get_page_from_url(None, "http://127.0.0.1:1/", &options, false).await;
    assert_eq!(tolerated, Ok(None));

    let raised = get_page_from_url(None, "http://127.0.0.1:1/", &options, true).await;
    assert!(matches!(raised, Err(FetchError::ConnectionRefused(_))));
}

#[tokio::test]
async fn test_fetcher_returns_missing_pages() {
    let mock_server = MockServer::start().await;

    let url = format!("{}/missing", mock_server.uri());
    let page = get_page_from_url(None, &url, &FetchOptions::default(), true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page.status_code, 404);
    assert!(!page.is_ok());
}
