use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use crate::cli::output::{write_ids, IdFormat};
use crate::cli::parse_date_arg;
use crate::scores::EpssClient;

#[derive(Args)]
pub struct CveIdsArgs {
    /// Date to list (defaults to the latest available)
    #[arg(value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = IdFormat::Plain)]
    output_format: IdFormat,
}

pub fn cve_ids_command(client: &EpssClient, args: CveIdsArgs) -> crate::Result<()> {
    let ids = client.list_identifiers(args.date)?;
    info!("Found {} CVE IDs", ids.len());

    let stdout = std::io::stdout();
    write_ids(&mut stdout.lock(), &ids, args.output_format)
}
