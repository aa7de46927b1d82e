#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use std::process::ExitCode;

use clap::Parser;
use mailshot::{Cli, Config};
use mailshot_common::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();

    let cli = Cli::parse();
    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply(&cli);

    let connector = config.connector();
    let delivered = mailshot::run(&config, &connector, &mut std::io::stdout().lock()).await?;

    Ok(if delivered {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
