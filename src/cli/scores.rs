use std::io::Write;

use clap::Args;
use tracing::info;

use crate::cli::output::{write_records, TableFormat};
use crate::cli::DateSelection;
use crate::scores::{EpssClient, ScoreFilter};

#[derive(Args)]
pub struct ScoreArgs {
    /// CVE ID patterns (shell-style globs, e.g. CVE-2023-*)
    cve_ids: Vec<String>,
    #[command(flatten)]
    dates: DateSelection,
    #[arg(long, value_enum, default_value_t = TableFormat::Json)]
    output_format: TableFormat,
    #[arg(long)]
    min_score: Option<f64>,
    #[arg(long)]
    max_score: Option<f64>,
    #[arg(long)]
    min_percentile: Option<f64>,
    #[arg(long)]
    max_percentile: Option<f64>,
}

impl ScoreArgs {
    fn filter(&self, case_sensitive: bool) -> ScoreFilter {
        ScoreFilter {
            cve_ids: self.cve_ids.clone(),
            min_score: self.min_score,
            max_score: self.max_score,
            min_percentile: self.min_percentile,
            max_percentile: self.max_percentile,
            case_sensitive,
        }
    }
}

pub fn list_scores_command(client: &EpssClient, args: ScoreArgs) -> crate::Result<()> {
    let (min_date, max_date) = args.dates.resolve(client)?;
    let filter = args.filter(client.is_case_sensitive());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in client.query_range(Some(min_date), Some(max_date), &filter)? {
        let (date, snapshot) = item?;
        info!("{} matching scores on {}", snapshot.len(), date);
        write_records(&mut out, &snapshot.records, args.output_format)?;
    }
    out.flush()?;
    Ok(())
}

pub fn count_scores_command(client: &EpssClient, args: ScoreArgs) -> crate::Result<()> {
    let (min_date, max_date) = args.dates.resolve(client)?;
    let filter = args.filter(client.is_case_sensitive());

    let mut total = 0;
    for item in client.query_range(Some(min_date), Some(max_date), &filter)? {
        let (_, snapshot) = item?;
        total += snapshot.len();
    }
    println!("{}", total);
    Ok(())
}
