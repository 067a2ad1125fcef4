use clap::Parser;
use epss_scores::cli::{run_cli, Cli};
use tracing::{debug, error};
use tracing_subscriber::fmt;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries command output
    fmt()
        .with_max_level(cli.global.log_level())
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting epss");

    if let Err(e) = run_cli(cli) {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}
