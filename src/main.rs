//! CLI entry point for qbench-sync.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use qbench_sync_core::{Config, Sweep};
use tracing::{debug, error, info};

mod cli;
mod exit_handler;

use cli::Args;
use exit_handler::{ProcessExit, determine_exit_outcome};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            error!("{error:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let mut config =
        Config::from_env_with(|key| args.config_override(key)).context("invalid configuration")?;
    // Keep the exact path; the lookup only carries a lossy string.
    if let Some(download_dir) = args.download_dir {
        config.download_dir = download_dir;
    }

    let today = chrono::Utc::now().date_naive();
    info!(
        base_url = %config.base_url,
        download_dir = %config.download_dir.display(),
        date_from = %config.date_from(today),
        skip_policy = %config.skip_policy,
        "qbench-sync starting"
    );

    let sweep = Sweep::from_config(&config, today)?;
    let stats = sweep.run().await.context("sweep aborted")?;
    let exit = determine_exit_outcome(&stats);
    if exit != ProcessExit::Success {
        error!(failed = stats.failed, succeeded = stats.succeeded(), "some reports failed");
    }
    Ok(exit)
}

/// Priority: `RUST_LOG` > `--quiet` > `-v`/`-vv` > info.
fn init_tracing(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
