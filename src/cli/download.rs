use clap::Args;
use tracing::info;

use crate::cli::DateSelection;
use crate::scores::EpssClient;

#[derive(Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    dates: DateSelection,
}

pub fn download_command(client: &EpssClient, args: DownloadArgs) -> crate::Result<()> {
    let (min_date, max_date) = args.dates.resolve(client)?;
    let fetched = client.download_range(Some(min_date), Some(max_date))?;

    info!(
        "{} new file(s) for {} to {} in {}",
        fetched,
        min_date,
        max_date,
        client.cache().root()
    );
    Ok(())
}
