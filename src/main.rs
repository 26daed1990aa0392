use anyhow::Result;
use cardikit::cli::{run_cli, Cli};
use cardikit::logging::{init_logging, LogConfig};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_env())?;
    run_cli(cli)
}
