use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpssError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to persist cache entry: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDateFormat(String),

    #[error("Invalid date range: min_date {min} is after max_date {max}")]
    InvalidRange { min: NaiveDate, max: NaiveDate },

    #[error("Invalid CVE pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("No EPSS scores published for {date} ({url})")]
    UpstreamNotFound { date: NaiveDate, url: String },

    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Failed to download {} of the requested dates (first: {})", .failed.len(), .source)]
    Download {
        failed: Vec<NaiveDate>,
        #[source]
        source: Box<EpssError>,
    },

    #[error("Executor error: {0}")]
    Executor(String),
}

pub type Result<T> = std::result::Result<T, EpssError>;
