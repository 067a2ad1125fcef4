#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use epss_scores::error::EpssError;
use epss_scores::remote::ScoreSource;
use epss_scores::{EpssClient, Executor, ScoreCache, ScoreRecord, Snapshot};
use tempfile::TempDir;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn snapshot(day: &str, rows: &[(&str, f64, f64)]) -> Snapshot {
    let day = date(day);
    let records = rows
        .iter()
        .map(|(cve, epss, percentile)| ScoreRecord {
            cve: cve.to_string(),
            epss: *epss,
            percentile: *percentile,
            date: day,
        })
        .collect();
    Snapshot::new(day, records)
}

/// In-memory provider that counts fetches.
#[derive(Default)]
pub struct StubSource {
    snapshots: HashMap<NaiveDate, Snapshot>,
    current: Option<NaiveDate>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
    probes: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.current = Some(self.current.map_or(snapshot.date, |d| d.max(snapshot.date)));
        self.snapshots.insert(snapshot.date, snapshot);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl ScoreSource for StubSource {
    fn download_url(&self, date: NaiveDate) -> String {
        format!("stub://epss_scores-{}.csv.gz", date)
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> epss_scores::Result<Snapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.snapshots
            .get(&date)
            .cloned()
            .ok_or_else(|| EpssError::UpstreamNotFound {
                date,
                url: self.download_url(date),
            })
    }

    fn snapshot_exists(&self, date: NaiveDate) -> epss_scores::Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshots.contains_key(&date))
    }

    fn current_date(&self) -> epss_scores::Result<NaiveDate> {
        self.current.ok_or_else(|| {
            EpssError::MalformedUpstreamResponse("stub has no snapshots".to_string())
        })
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub source: Arc<StubSource>,
}

impl Fixture {
    pub fn new(source: StubSource) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            source: Arc::new(source),
        }
    }

    pub fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("by").join("date"))
            .expect("Invalid UTF-8 in path")
    }

    pub fn cache(&self, executor: Executor) -> ScoreCache {
        ScoreCache::new(self.root(), self.source.clone(), executor)
    }

    pub fn client(&self) -> EpssClient {
        EpssClient::new(self.cache(Executor::inline()), date("2022-07-15"))
    }
}
