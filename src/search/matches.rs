use std::collections::HashMap;

/// Matches accumulated over one crawl
///
/// For every search key the matched strings are kept in discovery order
/// (duplicates included). A side table remembers the last page on which each
/// distinct match was seen. The record only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRecord {
    keys: Vec<String>,
    matches: HashMap<String, Vec<String>>,
    url_per_match: HashMap<String, HashMap<String, String>>,
}

impl MatchRecord {
    /// Creates an empty record with one (empty) entry per key
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = Self::default();
        for key in keys {
            record.ensure_key(key.into());
        }
        record
    }

    fn ensure_key(&mut self, key: String) {
        if !self.matches.contains_key(&key) {
            self.matches.insert(key.clone(), Vec::new());
            self.url_per_match.insert(key.clone(), HashMap::new());
            self.keys.push(key);
        }
    }

    /// Appends the matches found for `key` on the page at `url`
    pub fn record(&mut self, key: &str, found: Vec<String>, url: &str) {
        self.ensure_key(key.to_string());

        if let Some(urls) = self.url_per_match.get_mut(key) {
            for m in &found {
                urls.insert(m.clone(), url.to_string());
            }
        }

        if let Some(list) = self.matches.get_mut(key) {
            list.extend(found);
        }
    }

    /// Matches for `key` in discovery order
    pub fn get(&self, key: &str) -> &[String] {
        self.matches.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_any(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    /// The last page on which `matched` was found for `key`
    pub fn url_for(&self, key: &str, matched: &str) -> Option<&str> {
        self.url_per_match
            .get(key)
            .and_then(|urls| urls.get(matched))
            .map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// (key, matches) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.keys.iter().map(|key| (key.as_str(), self.get(key)))
    }

    /// Total number of matches over all keys
    pub fn total(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
