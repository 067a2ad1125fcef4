use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use crate::cli::{
    dates::{date_range_command, max_date_command, min_date_command, MinDateArgs},
    download::{download_command, DownloadArgs},
    ids::{cve_ids_command, CveIdsArgs},
    score::{get_score_command, GetScoreArgs},
    scores::{count_scores_command, list_scores_command, ScoreArgs},
};
use crate::scores::EpssClient;
use crate::settings::Settings;

pub mod dates;
pub mod download;
pub mod ids;
pub mod output;
pub mod score;
pub mod scores;

#[derive(Parser)]
#[command(name = "epss")]
#[command(about = "Exploit Prediction Scoring System (EPSS) scores")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Cache directory (overrides the configured workdir)
    #[arg(long, global = true)]
    workdir: Option<Utf8PathBuf>,
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,
    /// Number of concurrent downloads
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Match CVE ID patterns case-sensitively
    #[arg(long, global = true)]
    case_sensitive: bool,
    /// Suppress the download progress bar
    #[arg(long, global = true)]
    no_progress: bool,
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl GlobalArgs {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    pub fn settings(&self) -> crate::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(workdir) = &self.workdir {
            settings.workdir = workdir.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if self.case_sensitive {
            settings.case_sensitive = true;
        }
        if self.no_progress {
            settings.show_progress = false;
        }
        Ok(settings)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List known CVE IDs (latest first)
    CveIds(CveIdsArgs),
    /// Get the EPSS score for a CVE ID
    GetScore(GetScoreArgs),
    /// List EPSS scores
    ListScores(ScoreArgs),
    /// Count EPSS scores
    CountScores(ScoreArgs),
    /// Download EPSS scores into the local cache
    DownloadScores(DownloadArgs),
    /// Earliest date for which EPSS scores are available
    MinDate(MinDateArgs),
    /// Latest date for which EPSS scores are available
    MaxDate,
    /// Range of dates for which EPSS scores are available
    DateRange,
}

/// Which dates a command covers. `--date` picks one day and cannot be
/// combined with `--min-date`/`--max-date`. Either bound, or `--all`, selects
/// a range whose open ends default to the first and latest published dates.
/// With none of these flags only the latest date is covered.
#[derive(Args, Debug, Clone)]
pub struct DateSelection {
    /// Single date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg, conflicts_with_all = ["min_date", "max_date"])]
    date: Option<NaiveDate>,
    /// First date of the range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    min_date: Option<NaiveDate>,
    /// Last date of the range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    max_date: Option<NaiveDate>,
    /// Cover the whole range instead of only the latest date
    #[arg(long)]
    all: bool,
}

impl DateSelection {
    pub fn resolve(&self, client: &EpssClient) -> crate::Result<(NaiveDate, NaiveDate)> {
        if let Some(date) = self.date {
            return Ok((date, date));
        }
        if !self.all && self.min_date.is_none() && self.max_date.is_none() {
            let latest = client.max_date()?;
            return Ok((latest, latest));
        }
        client.date_range(self.min_date, self.max_date)
    }
}

pub(crate) fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    crate::dates::parse_date(value).map_err(|e| e.to_string())
}

pub fn run_cli(cli: Cli) -> crate::Result<()> {
    let settings = cli.global.settings()?;
    let client = EpssClient::from_settings(&settings)?;

    match cli.command {
        Commands::CveIds(args) => cve_ids_command(&client, args),
        Commands::GetScore(args) => get_score_command(&client, args),
        Commands::ListScores(args) => list_scores_command(&client, args),
        Commands::CountScores(args) => count_scores_command(&client, args),
        Commands::DownloadScores(args) => download_command(&client, args),
        Commands::MinDate(args) => min_date_command(&client, args),
        Commands::MaxDate => max_date_command(&client),
        Commands::DateRange => date_range_command(&client),
    }
}
