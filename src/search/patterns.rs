//! Predefined patterns for Dutch company registration data
//!
//! The patterns can be used directly in a search, either by name through
//! [`Preset`] in the configuration file or as plain strings.

use regex::Regex;
use serde::Deserialize;

/// Dutch postcode: four digits (1000-9999), an optional space, two capitals
pub const ZIP_REGEXP: &str = r"[1-9]\d{3}\s{0,1}[A-Z]{2}";

/// BTW (VAT) number such as `NL001234567B01`, optionally with a dot after each digit
pub const BTW_REGEXP: &str = r"\bNL([\d][\.]{0,1}){9}B[\.]{0,1}([\d][\.]{0,1}){1}\d\b";

/// KvK (chamber of commerce) number: eight digits, optionally dotted
///
/// The number must not touch a hyphen or a word character on either side,
/// so `A-12345678` and `A12345678` do not match. The boundaries are part of
/// the match; the number itself is the `hit` group.
pub const KVK_REGEXP: &str = r"(?:^|\s)(?P<hit>(?:\d\.?){7}\d)(?:[^-\w]|$)";

/// Named patterns selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Postcode,
    Btw,
    Kvk,
}

impl Preset {
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Postcode => ZIP_REGEXP,
            Self::Btw => BTW_REGEXP,
            Self::Kvk => KVK_REGEXP,
        }
    }
}

/// Checks whether a string starts with a postcode (case-insensitive letters)
///
/// # Examples
///
/// ```
/// use cbs_scrape::search::is_postcode;
///
/// assert!(is_postcode("2613 ab"));
/// assert!(!is_postcode("Delft"));
/// ```
pub fn is_postcode(postcode: &str) -> bool {
    Regex::new(r"^\d{4}\s?[a-zA-Z]{2}")
        .map(|re| re.is_match(postcode))
        .unwrap_or(false)
}

/// Brings a postcode in its standard form: no whitespace, upper case
///
/// # Examples
///
/// ```
/// use cbs_scrape::search::standard_postcode;
///
/// assert_eq!(standard_postcode("2613 ab"), "2613AB");
/// ```
pub fn standard_postcode(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}
