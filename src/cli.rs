//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use qbench_sync_core::SkipPolicy;
use qbench_sync_core::config::{ENV_DAYS_BACK, ENV_DOWNLOAD_DIR, ENV_SKIP_POLICY};

/// Download new report artifacts from the LIMS API.
///
/// Lists reports created in the last `QB_DAYS_BACK` days, downloads each
/// report's artifact into `DOWNLOAD_DIR`, and records it in
/// `download_log.json` so later runs skip unchanged files. Credentials and
/// the API root come from the environment (`QB_USERNAME`, `QB_SECRET`,
/// `BASE_URL`).
#[derive(Parser, Debug)]
#[command(name = "qbench-sync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// List reports created within this many days (overrides QB_DAYS_BACK)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=36500))]
    pub days_back: Option<u32>,

    /// Destination directory for artifacts and the ledger (overrides DOWNLOAD_DIR)
    #[arg(long, value_name = "PATH")]
    pub download_dir: Option<PathBuf>,

    /// How already-downloaded reports are detected: verify or ledger (overrides QB_SKIP_POLICY)
    #[arg(long, value_name = "POLICY")]
    pub skip_policy: Option<SkipPolicy>,
}

impl Args {
    /// Returns the flag value that replaces configuration variable `key`.
    pub fn config_override(&self, key: &str) -> Option<String> {
        match key {
            ENV_DAYS_BACK => self.days_back.map(|days| days.to_string()),
            ENV_DOWNLOAD_DIR => self
                .download_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            ENV_SKIP_POLICY => self.skip_policy.map(|policy| policy.to_string()),
            _ => None,
        }
    }
}
