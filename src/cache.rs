pub mod executor;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::dates::{check_range, enumerate_dates};
use crate::error::EpssError;
use crate::remote::ScoreSource;
use crate::scores::{ScoreRecord, Snapshot};

pub use executor::Executor;

/// On-disk store of daily snapshots at `<root>/<YYYY-MM-DD>.csv.gz`.
///
/// An existing non-empty file is trusted and never fetched again. Entries are
/// written to a temporary file beside the target and renamed into place, so a
/// failed download never leaves a file at the canonical path.
pub struct ScoreCache {
    root: Utf8PathBuf,
    source: Arc<dyn ScoreSource>,
    executor: Executor,
    in_flight: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
    show_progress: bool,
}

impl ScoreCache {
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        source: Arc<dyn ScoreSource>,
        executor: Executor,
    ) -> Self {
        Self {
            root: root.into(),
            source,
            executor,
            in_flight: Mutex::new(HashMap::new()),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source(&self) -> &dyn ScoreSource {
        self.source.as_ref()
    }

    pub fn path_for_date(&self, date: NaiveDate) -> Utf8PathBuf {
        self.root.join(format!("{}.csv.gz", date.format("%Y-%m-%d")))
    }

    pub fn is_cached(&self, date: NaiveDate) -> bool {
        fs::metadata(self.path_for_date(date))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Make sure `date` is on disk, fetching it if needed. Returns its path.
    ///
    /// Concurrent callers for the same date wait on one another, and all but
    /// the first find the entry already written.
    pub fn ensure_cached(&self, date: NaiveDate) -> crate::Result<Utf8PathBuf> {
        let path = self.path_for_date(date);
        if self.is_cached(date) {
            debug!("Skipping {} (already cached)", path);
            return Ok(path);
        }

        let slot = self.slot(date);
        let result = {
            let _guard = lock(&slot);
            if self.is_cached(date) {
                debug!("{} was cached by a concurrent request", path);
                Ok(())
            } else {
                self.fetch_into(date, &path)
            }
        };
        self.release_slot(date, slot);

        result.map(|()| path)
    }

    fn fetch_into(&self, date: NaiveDate, path: &Utf8Path) -> crate::Result<()> {
        let snapshot = self.source.fetch_snapshot(date)?;
        write_snapshot(path, &snapshot)?;
        info!("Cached {} records for {} at {}", snapshot.len(), date, path);
        Ok(())
    }

    /// Download every uncached date in `[min_date, max_date]` on the executor.
    ///
    /// All dates are attempted even if some fail. Failures are logged as they
    /// happen; if any occurred, `EpssError::Download` names every failed date
    /// and carries the earliest one's error. Returns the number of dates fetched.
    pub fn ensure_cached_range(
        &self,
        min_date: NaiveDate,
        max_date: NaiveDate,
    ) -> crate::Result<usize> {
        check_range(min_date, max_date)?;

        let missing: Vec<NaiveDate> = enumerate_dates(min_date, max_date)
            .filter(|date| !self.is_cached(*date))
            .collect();

        if missing.is_empty() {
            debug!("All dates from {} to {} already cached", min_date, max_date);
            return Ok(0);
        }

        let total = missing.len();
        info!(
            "Downloading {} {} containing EPSS scores from {} to {}",
            total,
            if total > 1 { "files" } else { "file" },
            min_date,
            max_date
        );

        let progress = self.progress_bar(total);

        let results = self.executor.map(&missing, |date| {
            let result = self.ensure_cached(*date);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            if let Err(ref e) = result {
                error!("Failed to download scores for {}: {}", date, e);
            }
            result
        });

        if let Some(pb) = progress {
            pb.finish_with_message("EPSS download complete");
        }

        let mut failed = Vec::new();
        let mut first_error = None;
        for (date, result) in missing.iter().zip(results) {
            if let Err(e) = result {
                failed.push(*date);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => Ok(total),
            Some(source) => Err(EpssError::Download {
                failed,
                source: Box::new(source),
            }),
        }
    }

    /// Read a cached entry back.
    pub fn read(&self, date: NaiveDate) -> crate::Result<Snapshot> {
        read_snapshot(&self.path_for_date(date), date)
    }

    /// `ensure_cached` followed by `read`.
    pub fn load(&self, date: NaiveDate) -> crate::Result<Snapshot> {
        let path = self.ensure_cached(date)?;
        read_snapshot(&path, date)
    }

    fn slot(&self, date: NaiveDate) -> Arc<Mutex<()>> {
        lock(&self.in_flight).entry(date).or_default().clone()
    }

    fn release_slot(&self, date: NaiveDate, slot: Arc<Mutex<()>>) {
        let mut in_flight = lock(&self.in_flight);
        // The map and our handle; anyone else still waiting keeps the entry.
        if Arc::strong_count(&slot) == 2 {
            in_flight.remove(&date);
        }
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(total as u64);
        let template = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Downloading EPSS scores");
        Some(pb)
    }
}

// A poisoned lock only means another download panicked; the data is `()` or
// a map that is never left half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Gzip CSV with header `cve,epss,percentile,date`, written atomically.
pub fn write_snapshot(path: &Utf8Path, snapshot: &Snapshot) -> crate::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        EpssError::Io(std::io::Error::other(format!("no parent for {}", path)))
    })?;
    fs::create_dir_all(parent)?;

    let tmp = tempfile::Builder::new()
        .prefix(".epss-")
        .suffix(".tmp")
        .tempfile_in(parent)?;

    {
        let encoder = GzEncoder::new(BufWriter::new(tmp.as_file()), Compression::default());
        let mut writer = csv::Writer::from_writer(encoder);
        if snapshot.is_empty() {
            writer.write_record(["cve", "epss", "percentile", "date"])?;
        }
        for record in snapshot.iter() {
            writer.serialize(record)?;
        }
        let encoder = writer
            .into_inner()
            .map_err(|e| EpssError::Io(e.into_error()))?;
        encoder.finish()?.flush()?;
    }
    tmp.as_file().sync_all()?;

    persist(tmp, path)
}

fn persist(tmp: NamedTempFile, path: &Utf8Path) -> crate::Result<()> {
    tmp.persist(path.as_std_path())?;
    Ok(())
}

pub fn read_snapshot(path: &Utf8Path, date: NaiveDate) -> crate::Result<Snapshot> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(MultiGzDecoder::new(BufReader::new(file)));

    let records = reader
        .deserialize::<ScoreRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EpssError::MalformedUpstreamResponse(format!("{}: {}", path, e)))?;

    Ok(Snapshot::new(date, records))
}
