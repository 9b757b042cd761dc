use super::Scheme;
use url::Url;

/// Removes every `http://` and `https://` occurrence from a URL string
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::strip_url_scheme;
///
/// assert_eq!(strip_url_scheme("https://www.example.com/page"), "www.example.com/page");
/// assert_eq!(strip_url_scheme("www.example.com"), "www.example.com");
/// ```
pub fn strip_url_scheme(url: &str) -> String {
    url.replace("https://", "").replace("http://", "")
}

/// Builds a full URL from a scheme-less host (optionally with a path)
///
/// A trailing slash is always appended, and a doubled trailing slash is
/// collapsed into one.
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::{add_scheme_to_url, Scheme};
///
/// assert_eq!(add_scheme_to_url("www.example.com", Scheme::Https), "https://www.example.com/");
/// assert_eq!(add_scheme_to_url("www.example.com/", Scheme::Http), "http://www.example.com/");
/// ```
pub fn add_scheme_to_url(clean_url: &str, scheme: Scheme) -> String {
    let full_url = format!("{}://{}/", scheme, clean_url);

    match full_url.strip_suffix("//") {
        Some(head) => format!("{}/", head),
        None => full_url,
    }
}

/// Checks whether a string is an absolute URL (has both a scheme and a host)
pub fn is_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.has_host(),
        Err(_) => false,
    }
}

/// Returns the lower-cased file extension of an href, including the dot
///
/// The extension is taken from the last path segment only, so the top-level
/// domain of an absolute href is never mistaken for an extension.
/// Leading dots of a segment (hidden files) do not start an extension.
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::href_extension;
///
/// assert_eq!(href_extension("/img/logo.PNG"), Some(".png".to_string()));
/// assert_eq!(href_extension("https://www.example.com"), None);
/// assert_eq!(href_extension("/contact"), None);
/// ```
pub fn href_extension(href: &str) -> Option<String> {
    let path = if is_url(href) {
        Url::parse(href)
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    } else {
        href.to_string()
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    let segment = segment.trim_start_matches('.');

    segment.rfind('.').map(|idx| segment[idx..].to_lowercase())
}

/// Splits an href into its branch sections relative to the crawl's base URL
///
/// Both URLs are stripped of their scheme, every occurrence of the base is
/// removed from the href, one leading and one trailing slash are dropped and
/// the remainder is split on `/`. The first section is the branch.
///
/// # Examples
///
/// ```
/// use cbs_scrape::url::href_sections;
///
/// assert_eq!(
///     href_sections("https://www.example.com/cars/42", "https://www.example.com/"),
///     vec!["cars", "42"]
/// );
/// assert_eq!(href_sections("/about/", "https://www.example.com/"), vec!["about"]);
/// ```
pub fn href_sections(href: &str, base_url: &str) -> Vec<String> {
    let base = strip_url_scheme(base_url);
    let href = strip_url_scheme(href);

    let relative = if base.is_empty() {
        href
    } else {
        href.replace(&base, "")
    };

    let relative = relative.strip_prefix('/').unwrap_or(&relative);
    let relative = relative.strip_suffix('/').unwrap_or(relative);

    relative.split('/').map(str::to_string).collect()
}
