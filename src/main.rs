use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    formharvest::logging::init().context("init logging")?;

    let cli = formharvest::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        formharvest::cli::Command::Run(args) => {
            formharvest::harvest::run(args).await.context("run")?;
        }
        formharvest::cli::Command::Discover(args) => {
            formharvest::harvest::discover(args).await.context("discover")?;
        }
    }

    Ok(())
}
