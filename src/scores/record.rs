use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One CVE's EPSS score as published on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub cve: String,
    pub epss: f64,
    pub percentile: f64,
    pub date: NaiveDate,
}

/// All records published for a single day, in provider order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub records: Vec<ScoreRecord>,
}

impl Snapshot {
    pub fn new(date: NaiveDate, records: Vec<ScoreRecord>) -> Self {
        Self { date, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoreRecord> {
        self.records.iter()
    }

    /// Distinct identifiers, newest CVE first.
    pub fn cve_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.iter().map(|r| r.cve.clone()).collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();
        ids
    }
}

impl IntoIterator for Snapshot {
    type Item = ScoreRecord;
    type IntoIter = std::vec::IntoIter<ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
