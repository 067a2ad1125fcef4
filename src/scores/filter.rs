use crate::pattern::PatternSet;
use crate::scores::record::{ScoreRecord, Snapshot};

/// Record selection applied to each day's snapshot. All bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ScoreFilter {
    pub cve_ids: Vec<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub min_percentile: Option<f64>,
    pub max_percentile: Option<f64>,
    pub case_sensitive: bool,
}

impl ScoreFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cve_ids<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cve_ids = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn min_score(mut self, value: f64) -> Self {
        self.min_score = Some(value);
        self
    }

    pub fn max_score(mut self, value: f64) -> Self {
        self.max_score = Some(value);
        self
    }

    pub fn min_percentile(mut self, value: f64) -> Self {
        self.min_percentile = Some(value);
        self
    }

    pub fn max_percentile(mut self, value: f64) -> Self {
        self.max_percentile = Some(value);
        self
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    /// True when no criterion is set; case sensitivity alone selects nothing.
    pub fn is_empty(&self) -> bool {
        self.cve_ids.is_empty()
            && self.min_score.is_none()
            && self.max_score.is_none()
            && self.min_percentile.is_none()
            && self.max_percentile.is_none()
    }

    /// Compile the CVE patterns; fails on the first one that cannot be used.
    pub fn patterns(&self) -> crate::Result<PatternSet> {
        PatternSet::new(&self.cve_ids, self.case_sensitive)
    }

    pub fn apply(&self, snapshot: Snapshot) -> crate::Result<Snapshot> {
        let patterns = self.patterns()?;
        Ok(self.apply_with(snapshot, &patterns))
    }

    /// Like [`ScoreFilter::apply`], reusing patterns compiled by [`ScoreFilter::patterns`].
    pub fn apply_with(&self, snapshot: Snapshot, patterns: &PatternSet) -> Snapshot {
        let date = snapshot.date;
        let records = snapshot
            .into_iter()
            .filter(|record| self.accepts(record, patterns))
            .collect();
        Snapshot::new(date, records)
    }

    fn accepts(&self, record: &ScoreRecord, patterns: &PatternSet) -> bool {
        if !self.cve_ids.is_empty() && !patterns.is_match(&record.cve) {
            return false;
        }
        within(record.epss, self.min_score, self.max_score)
            && within(record.percentile, self.min_percentile, self.max_percentile)
    }
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}
