use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::dates::DEFAULT_MIN_DATE;

pub const DEFAULT_BASE_URL: &str = "https://epss.cyentia.com";

/// Runtime configuration shared by the HTTP client, cache and query engine.
///
/// Sources, lowest precedence first: built-in defaults, an optional config
/// file, then `EPSS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub workdir: Utf8PathBuf,
    pub base_url: String,
    pub min_date: NaiveDate,
    pub case_sensitive: bool,
    /// Download pool size, 0 lets rayon pick one thread per core.
    pub workers: usize,
    pub timeout_secs: u64,
    pub show_progress: bool,
}

impl Settings {
    pub fn load(path: Option<&Utf8Path>) -> crate::Result<Self> {
        let mut builder = defaults_builder()?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path.as_str()).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix("EPSS").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }

    /// Settings from an inline TOML document layered over the defaults.
    pub fn from_toml(toml: &str) -> crate::Result<Self> {
        let settings = defaults_builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    /// Directory holding one gzip CSV per date.
    pub fn scores_by_date_dir(&self) -> Utf8PathBuf {
        self.workdir.join("by").join("date")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            base_url: DEFAULT_BASE_URL.to_string(),
            min_date: DEFAULT_MIN_DATE,
            case_sensitive: false,
            workers: 0,
            timeout_secs: 60,
            show_progress: true,
        }
    }
}

fn defaults_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Settings::default();
    Config::builder()
        .set_default("workdir", defaults.workdir.as_str())?
        .set_default("base_url", defaults.base_url.as_str())?
        .set_default("min_date", defaults.min_date.to_string())?
        .set_default("case_sensitive", defaults.case_sensitive)?
        .set_default("workers", defaults.workers as i64)?
        .set_default("timeout_secs", defaults.timeout_secs as i64)?
        .set_default("show_progress", defaults.show_progress)
}

fn default_workdir() -> Utf8PathBuf {
    let tmp = std::env::temp_dir().join("epss-scores");
    Utf8PathBuf::from_path_buf(tmp).unwrap_or_else(|_| Utf8PathBuf::from("epss-scores"))
}
