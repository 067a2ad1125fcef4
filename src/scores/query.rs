use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::cache::{Executor, ScoreCache};
use crate::dates::{enumerate_dates, resolve_date_range, resolve_max_date, resolve_min_date};
use crate::pattern::PatternSet;
use crate::remote::{EpssHttpClient, ScoreSource};
use crate::scores::{ScoreFilter, ScoreRecord, Snapshot};
use crate::settings::Settings;

/// Answers score queries by date, date range and CVE on top of [`ScoreCache`].
pub struct EpssClient {
    cache: ScoreCache,
    min_date: NaiveDate,
    case_sensitive: bool,
}

impl EpssClient {
    pub fn new(cache: ScoreCache, min_date: NaiveDate) -> Self {
        Self {
            cache,
            min_date,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Production wiring: HTTP source, pooled downloads, cache under `settings.workdir`.
    pub fn from_settings(settings: &Settings) -> crate::Result<Self> {
        let source: Arc<dyn ScoreSource> = Arc::new(EpssHttpClient::from_settings(settings)?);
        let executor = Executor::with_workers(settings.workers)?;
        debug!(
            "Using {} download workers, cache at {}",
            executor.workers(),
            settings.scores_by_date_dir()
        );

        let cache = ScoreCache::new(settings.scores_by_date_dir(), source, executor)
            .with_progress(settings.show_progress);

        Ok(Self::new(cache, settings.min_date).case_sensitive(settings.case_sensitive))
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    pub fn min_date(&self, check: bool) -> crate::Result<NaiveDate> {
        resolve_min_date(self.cache.source(), self.min_date, check)
    }

    pub fn max_date(&self) -> crate::Result<NaiveDate> {
        resolve_max_date(self.cache.source())
    }

    pub fn date_range(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    ) -> crate::Result<(NaiveDate, NaiveDate)> {
        resolve_date_range(self.cache.source(), self.min_date, min_date, max_date)
    }

    fn resolve_date(&self, date: Option<NaiveDate>) -> crate::Result<NaiveDate> {
        match date {
            Some(date) => Ok(date),
            None => self.max_date(),
        }
    }

    /// One day's snapshot (latest when `date` is `None`), fetched on demand.
    /// An empty filter returns the table untouched.
    pub fn load_snapshot(
        &self,
        date: Option<NaiveDate>,
        filter: &ScoreFilter,
    ) -> crate::Result<Snapshot> {
        let patterns = filter.patterns()?;
        let date = self.resolve_date(date)?;
        self.load_filtered(date, filter, &patterns)
    }

    fn load_filtered(
        &self,
        date: NaiveDate,
        filter: &ScoreFilter,
        patterns: &PatternSet,
    ) -> crate::Result<Snapshot> {
        let snapshot = self.cache.load(date)?;
        if filter.is_empty() {
            return Ok(snapshot);
        }
        Ok(filter.apply_with(snapshot, patterns))
    }

    /// Download every missing date in the range up front.
    pub fn download_range(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
    ) -> crate::Result<usize> {
        let (min_date, max_date) = self.date_range(min_date, max_date)?;
        self.cache.ensure_cached_range(min_date, max_date)
    }

    /// Filtered snapshots for each date in the range, in ascending date order.
    ///
    /// Missing dates are downloaded before the iterator is returned; each
    /// date is then read and filtered once, lazily. Dates left with no
    /// records after filtering are skipped. The iterator keeps its own copy
    /// of `filter`.
    pub fn query_range(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
        filter: &ScoreFilter,
    ) -> crate::Result<impl Iterator<Item = crate::Result<(NaiveDate, Snapshot)>> + '_> {
        let filter = filter.clone();
        let patterns = filter.patterns()?;
        let (min_date, max_date) = self.date_range(min_date, max_date)?;
        self.cache.ensure_cached_range(min_date, max_date)?;

        Ok(
            enumerate_dates(min_date, max_date).filter_map(move |date| {
                match self.load_filtered(date, &filter, &patterns) {
                    Ok(snapshot) if snapshot.is_empty() => None,
                    Ok(snapshot) => Some(Ok((date, snapshot))),
                    Err(e) => Some(Err(e)),
                }
            }),
        )
    }

    /// All matching records across the range, concatenated in date order.
    pub fn scores_by_date_range(
        &self,
        min_date: Option<NaiveDate>,
        max_date: Option<NaiveDate>,
        filter: &ScoreFilter,
    ) -> crate::Result<Vec<ScoreRecord>> {
        let mut records = Vec::new();
        for item in self.query_range(min_date, max_date, filter)? {
            let (_, snapshot) = item?;
            records.extend(snapshot);
        }
        Ok(records)
    }

    /// Score for one CVE on `date` (latest when `None`).
    pub fn single_score(
        &self,
        cve_id: &str,
        date: Option<NaiveDate>,
    ) -> crate::Result<Option<ScoreRecord>> {
        let filter = ScoreFilter::new()
            .cve_ids([cve_id])
            .case_sensitive(self.case_sensitive);
        let snapshot = self.load_snapshot(date, &filter)?;

        let record = snapshot.into_iter().next();
        if record.is_none() {
            debug!("No EPSS score for {}", cve_id);
        }
        Ok(record)
    }

    /// Distinct CVE IDs published on `date` (latest when `None`), newest first.
    pub fn list_identifiers(&self, date: Option<NaiveDate>) -> crate::Result<Vec<String>> {
        let snapshot = self.load_snapshot(date, &ScoreFilter::new())?;
        Ok(snapshot.cve_ids())
    }
}
