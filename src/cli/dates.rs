use clap::Args;

use crate::scores::EpssClient;

#[derive(Args)]
pub struct MinDateArgs {
    /// Probe the provider day by day instead of using the known first date
    #[arg(long)]
    check: bool,
}

pub fn min_date_command(client: &EpssClient, args: MinDateArgs) -> crate::Result<()> {
    println!("{}", client.min_date(args.check)?);
    Ok(())
}

pub fn max_date_command(client: &EpssClient) -> crate::Result<()> {
    println!("{}", client.max_date()?);
    Ok(())
}

pub fn date_range_command(client: &EpssClient) -> crate::Result<()> {
    let (min_date, max_date) = client.date_range(None, None)?;
    println!("{} {}", min_date, max_date);
    Ok(())
}
