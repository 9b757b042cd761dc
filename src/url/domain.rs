use std::net::IpAddr;
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use cbs_scrape::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain ("site identity") of a host
///
/// The public suffix list decides where the registrable part starts, so
/// `www.example.co.uk` and `shop.example.co.uk` both map to `example.co.uk`.
/// IP addresses and hosts without a registrable part (such as `localhost`)
/// map to themselves.
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::registrable_domain;
///
/// assert_eq!(registrable_domain("www.example.co.uk"), "example.co.uk");
/// assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();

    if host.parse::<IpAddr>().is_ok() {
        return host;
    }

    let registrable = psl::domain_str(&host).map(|domain| domain.to_string());
    registrable.unwrap_or(host)
}

/// Returns the registrable domain of an absolute URL or bare host string
///
/// Returns None for relative references, which have no host of their own.
pub fn registrable_domain_of(url: &str) -> Option<String> {
    clean_url(url).map(|host| registrable_domain(&host))
}

/// Returns the host of a URL without scheme or path (subdomain + registrable domain)
///
/// Both absolute URLs and bare hosts such as `www.example.nl/contact` are
/// accepted. Relative references yield None.
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::clean_url;
///
/// assert_eq!(clean_url("https://www.Example.nl/contact"), Some("www.example.nl".to_string()));
/// assert_eq!(clean_url("www.example.nl"), Some("www.example.nl".to_string()));
/// assert_eq!(clean_url("/contact"), None);
/// ```
pub fn clean_url(url: &str) -> Option<String> {
    let url = url.trim();

    if url.contains("://") {
        return Url::parse(url).ok().as_ref().and_then(extract_domain);
    }

    let host = url.split('/').next().unwrap_or_default();
    if host.is_empty() || !host.contains('.') || host.starts_with('.') || host.contains(' ') {
        return None;
    }

    Url::parse(&format!("http://{}", host))
        .ok()
        .as_ref()
        .and_then(extract_domain)
}
