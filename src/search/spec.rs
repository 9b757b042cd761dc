use regex::{Regex, RegexBuilder};

/// Name of the capture group that designates the reported part of a match
const HIT_GROUP: &str = "hit";

/// Named search patterns applied to every visited page
///
/// Keys keep the order in which they were supplied; supplying a key twice
/// replaces the earlier pattern in place.
#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    patterns: Vec<(String, Regex)>,
}

impl SearchSpec {
    /// Compiles a set of (name, pattern) pairs
    ///
    /// # Examples
    ///
    /// ```
    /// use cbs_scrape::SearchSpec;
    ///
    /// let spec = SearchSpec::new([("zip", r"\d{4}\s?[A-Z]{2}")]).unwrap();
    /// assert_eq!(spec.find("zip", "Kerkstraat 1, 1234 AB Dorp"), vec!["1234 AB"]);
    /// ```
    pub fn new<I, K, P>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let mut spec = Self::default();
        for (key, pattern) in patterns {
            spec.insert(key.into(), Regex::new(pattern.as_ref())?);
        }
        Ok(spec)
    }

    /// Adds a compiled pattern under `key`
    pub fn insert(&mut self, key: String, regex: Regex) {
        match self.patterns.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = regex,
            None => self.patterns.push((key, regex)),
        }
    }

    /// Search keys in caller order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(key, _)| key.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.patterns.iter().any(|(existing, _)| existing == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Regex)> {
        self.patterns.iter().map(|(key, regex)| (key.as_str(), regex))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Runs the pattern stored under `key` against `text`
    ///
    /// Returns an empty list for unknown keys.
    pub fn find(&self, key: &str, text: &str) -> Vec<String> {
        self.patterns
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, regex)| find_matches(regex, text))
            .unwrap_or_default()
    }
}

/// Finds every match of `regex` in `text`, in order of appearance
///
/// When the pattern has a capture group named `hit`, only that group is
/// reported; otherwise the whole match. Reported strings are trimmed.
pub fn find_matches(regex: &Regex, text: &str) -> Vec<String> {
    let has_hit_group = regex.capture_names().flatten().any(|name| name == HIT_GROUP);

    if !has_hit_group {
        return regex
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .collect();
    }

    regex
        .captures_iter(text)
        .filter_map(|caps| caps.name(HIT_GROUP).or_else(|| caps.get(0)))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Keywords used to rank discovered links
///
/// A link whose href matches any keyword (case-insensitively) gets rank 1,
/// all other links rank 0.
#[derive(Debug, Clone, Default)]
pub struct RankKeywords {
    keywords: Vec<Regex>,
}

impl RankKeywords {
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|keyword| {
                RegexBuilder::new(keyword.as_ref())
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keywords })
    }

    pub fn rank(&self, href: &str) -> u8 {
        if self.keywords.iter().any(|keyword| keyword.is_match(href)) {
            1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
