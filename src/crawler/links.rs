//! Ranked link table of a crawl

/// One classified link of the seed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrefRecord {
    pub href: String,
    pub url: String,
    pub external: bool,
    pub relative: bool,
    /// 1 when the href matched a rank keyword, else 0
    pub ranking: u8,
    /// Number of times the link was followed
    pub clicks: u32,
}

/// De-duplicated links in the order they are followed
///
/// Records are unique by URL. When a relative and an absolute href lead to
/// the same URL the absolute one is kept. Ranked records come first; within
/// a rank the records are ordered by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HrefTable {
    records: Vec<HrefRecord>,
}

impl HrefTable {
    pub fn from_records(mut records: Vec<HrefRecord>) -> Self {
        records.sort_by(|a, b| {
            a.url
                .cmp(&b.url)
                .then_with(|| b.relative.cmp(&a.relative))
        });

        let mut deduped: Vec<HrefRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(last) if last.url == record.url => *last = record,
                _ => deduped.push(record),
            }
        }

        // stable, so equal ranks stay in URL order
        deduped.sort_by(|a, b| b.ranking.cmp(&a.ranking));

        Self { records: deduped }
    }

    pub fn records(&self) -> &[HrefRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &HrefRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&HrefRecord> {
        self.records.iter().find(|record| record.url == url)
    }

    /// Counts one visit of the record with `url`
    pub fn record_click(&mut self, url: &str) {
        if let Some(record) = self.records.iter_mut().find(|record| record.url == url) {
            record.clicks += 1;
        }
    }
}
