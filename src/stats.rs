use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::client::ResolutionRecord;
use crate::domain::{self, IocKind};

/// Occurrence counts keyed by a domain part (public suffix or registered domain).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<String, u32>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of `key`, zero when it was never seen.
    pub fn get(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, key: &str) {
        let next = self.get(key) + 1;
        self.counts.insert(key.to_string(), next);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Highest count, ties going to the lexicographically smallest key.
    pub fn most_common(&self) -> Option<&str> {
        self.iter()
            .min_by(|a, b| rank_order(*a, *b))
            .map(|(key, _)| key)
    }
}

/// One line of a ranked breakdown: key, count and share of all records.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub key: String,
    pub count: u32,
    pub percentage: f64,
}

/// Resolutions and their breakdown for one IOC over one period.
#[derive(Debug, Clone)]
pub struct IocReport {
    pub records: Vec<ResolutionRecord>,
    pub top_level: FrequencyTable,
    pub second_level: FrequencyTable,
}

impl IocReport {
    pub fn from_records(records: Vec<ResolutionRecord>) -> Self {
        let (top_level, second_level) = aggregate(&records);
        Self {
            records,
            top_level,
            second_level,
        }
    }

    pub fn resolutions(&self) -> usize {
        self.records.len()
    }
}

/// Outcome kept for one IOC and period.
#[derive(Debug, Clone)]
pub enum PeriodResult {
    Resolved(IocReport),
    /// Provider refused the lookup; holds the human readable reason.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct IocResult {
    pub ioc: String,
    pub kind: IocKind,
    pub periods: BTreeMap<u32, PeriodResult>,
}

#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub iocs: Vec<IocResult>,
}

fn rank_order(a: (&str, u32), b: (&str, u32)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Counts public suffixes and registered domains across the owner names.
/// Names without a listed suffix are counted under the empty key.
pub fn aggregate(records: &[ResolutionRecord]) -> (FrequencyTable, FrequencyTable) {
    let mut top_level = FrequencyTable::new();
    let mut second_level = FrequencyTable::new();

    for record in records {
        let parts = domain::split_host(&record.rrname);
        top_level.increment(&parts.suffix);
        second_level.increment(&parts.registered_domain());
    }

    (top_level, second_level)
}

/// Sorts by count descending, then key ascending.
pub fn ranked_with_share(table: &FrequencyTable, total_records: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<(&str, u32)> = table.iter().collect();
    entries.sort_by(|a, b| rank_order(*a, *b));

    entries
        .into_iter()
        .map(|(key, count)| RankedEntry {
            key: key.to_string(),
            count,
            percentage: if total_records == 0 {
                0.0
            } else {
                f64::from(count) / total_records as f64 * 100.0
            },
        })
        .collect()
}

/// Renders the leading entries as `key (count, pct%)` lines.
///
/// Note: shows `top + 1` entries.
pub fn format_top_n(ranked: &[RankedEntry], top: usize) -> String {
    ranked
        .iter()
        .take(top.saturating_add(1))
        .map(|entry| format!("{} ({}, {:.2}%)", entry.key, entry.count, entry.percentage))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(names: &[&str]) -> Vec<ResolutionRecord> {
        names.iter().map(|name| ResolutionRecord::named(name)).collect()
    }

    #[test]
    fn frequency_table_defaults_to_zero() {
        let mut table = FrequencyTable::new();
        assert_eq!(table.get("com"), 0);
        table.increment("com");
        table.increment("com");
        table.increment("net");
        assert_eq!(table.get("com"), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn aggregate_counts_every_record_once() {
        let input = records(&[
            "www.example.com.",
            "mail.example.com.",
            "shop.example.co.uk.",
            "cdn.other.net.",
            "localhost.",
        ]);
        let (top, second) = aggregate(&input);

        assert_eq!(top.total(), 5);
        assert_eq!(second.total(), 5);
        assert_eq!(top.get("com"), 2);
        assert_eq!(top.get("co.uk"), 1);
        assert_eq!(top.get(""), 1);
        assert_eq!(second.get("example.com"), 2);
        assert_eq!(second.get("example.co.uk"), 1);
        assert_eq!(second.get(""), 1);
    }

    #[test]
    fn ranking_breaks_ties_by_key() {
        let input = records(&["a.net", "b.com", "c.org", "d.com", "e.net"]);
        let (top, _) = aggregate(&input);
        let ranked = ranked_with_share(&top, input.len());

        let keys: Vec<&str> = ranked.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["com", "net", "org"]);
        assert_eq!(top.most_common(), Some("com"));

        let share: f64 = ranked.iter().map(|e| e.percentage).sum();
        assert!((share - 100.0).abs() < 1e-9);
        assert!((ranked[2].percentage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_with_no_records() {
        let ranked = ranked_with_share(&FrequencyTable::new(), 0);
        assert!(ranked.is_empty());
        assert_eq!(format_top_n(&ranked, 10), "");
        assert_eq!(FrequencyTable::new().most_common(), None);
    }

    #[test]
    fn format_top_n_takes_one_extra_entry() {
        let input = records(&["a.com", "b.com", "c.com", "d.net", "e.net", "f.org"]);
        let (top, _) = aggregate(&input);
        let ranked = ranked_with_share(&top, input.len());

        assert_eq!(format_top_n(&ranked, 0), "com (3, 50.00%)");
        assert_eq!(
            format_top_n(&ranked, 1),
            "com (3, 50.00%)\nnet (2, 33.33%)"
        );
        assert_eq!(format_top_n(&ranked, 10).lines().count(), 3);
    }

    #[test]
    fn formatting_is_deterministic() {
        let input = records(&["x.io", "y.dev", "z.app", "w.io", "v.dev"]);
        let render = || {
            let (_, second) = aggregate(&input);
            format_top_n(&ranked_with_share(&second, input.len()), 10)
        };
        let first = render();
        for _ in 0..5 {
            assert_eq!(render(), first);
        }
        assert!(first.starts_with("v.dev (1, 20.00%)"));
    }
}
