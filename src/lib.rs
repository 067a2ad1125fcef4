pub mod cache;
pub mod cli;
pub mod dates;
pub mod error;
pub mod pattern;
pub mod remote;
pub mod scores;
pub mod settings;

pub use cache::{Executor, ScoreCache};
pub use error::{EpssError, Result};
pub use scores::{EpssClient, ScoreFilter, ScoreRecord, Snapshot};
pub use settings::Settings;
