pub mod http;
pub mod parse;

use chrono::NaiveDate;

use crate::scores::Snapshot;

pub use http::EpssHttpClient;
pub use parse::parse_snapshot;

/// Where daily snapshots come from. The HTTP client is the production
/// implementation; tests substitute in-memory sources.
pub trait ScoreSource: Send + Sync {
    /// Download URL for `date`'s snapshot.
    fn download_url(&self, date: NaiveDate) -> String;

    /// Fetch and parse one day's snapshot, stamping every record with `date`.
    fn fetch_snapshot(&self, date: NaiveDate) -> crate::Result<Snapshot>;

    /// Cheap existence probe for `date`'s snapshot.
    fn snapshot_exists(&self, date: NaiveDate) -> crate::Result<bool>;

    /// Date of the most recently published snapshot.
    fn current_date(&self) -> crate::Result<NaiveDate>;
}
