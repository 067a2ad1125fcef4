use chrono::NaiveDate;
use clap::Args;
use tracing::warn;

use crate::cli::output::IdFormat;
use crate::cli::parse_date_arg;
use crate::scores::EpssClient;

#[derive(Args)]
pub struct GetScoreArgs {
    /// CVE ID to look up
    cve_id: String,
    /// Date of the score (defaults to the latest available)
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = IdFormat::Plain)]
    output_format: IdFormat,
}

pub fn get_score_command(client: &EpssClient, args: GetScoreArgs) -> crate::Result<()> {
    let Some(record) = client.single_score(&args.cve_id, args.date)? else {
        warn!("No EPSS score found for {}", args.cve_id);
        return Ok(());
    };

    match args.output_format {
        IdFormat::Json => println!("{}", serde_json::to_string(&record)?),
        IdFormat::Plain => println!("{}", record.epss),
    }
    Ok(())
}
