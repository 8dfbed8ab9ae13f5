//! `kwik` binary entry point.

use clap::Parser;
use kwik_rs::cli::{Cli, run};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kwik_rs::init_logging();
    let cli = Cli::parse();
    info!(
        "starting kwik (config_set={}, data_dir_set={})",
        cli.config.is_some(),
        cli.data_dir.is_some()
    );
    run(cli).await
}
