pub mod filter;
pub mod query;
pub mod record;

pub use filter::ScoreFilter;
pub use query::EpssClient;
pub use record::{ScoreRecord, Snapshot};
