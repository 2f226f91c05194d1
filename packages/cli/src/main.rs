#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the bucket-bridge migration.
//!
//! Takes no arguments: the run is fully described by environment
//! variables (see [`bucket_bridge_migrate::config`] for the `BRIDGE_*`
//! variables and the client crates for credentials). Runs the pipeline
//! to completion, prints the final counters, and exits 1 after logging
//! any fatal error.
//!
//! Uses `indicatif-log-bridge` (via
//! [`bucket_bridge_cli_utils::init_logger`]) to route `log` output
//! through `indicatif::MultiProgress` so that log lines and progress
//! bars never fight for the terminal.

use bucket_bridge_cli_utils::{IndicatifProgress, MultiProgress};
use bucket_bridge_gcs::GcsClient;
use bucket_bridge_migrate::MigrateError;
use bucket_bridge_migrate::config::MigrateConfig;
use bucket_bridge_migrate::run::run_migration;
use bucket_bridge_r2::R2Client;

#[tokio::main]
async fn main() {
    let multi = bucket_bridge_cli_utils::init_logger();

    if let Err(e) = run(&multi).await {
        log::error!("Migration failed: {e}");
        std::process::exit(1);
    }
}

async fn run(multi: &MultiProgress) -> Result<(), MigrateError> {
    let config = MigrateConfig::from_env()?;

    log::info!(
        "bucket-bridge: gs://{}/{} -> s3://{} ({}, concurrency {})",
        config.source_bucket,
        config.source_prefix,
        config.dest_bucket,
        config.strategy.as_str(),
        config.concurrency
    );
    if let Some(cutoff) = config.cutoff {
        log::info!(
            "  selecting folders whose {} was created at or after {cutoff}",
            config.marker_file
        );
    } else {
        log::info!("  no cutoff set, migrating every folder");
    }

    let source = GcsClient::from_env(&config.source_bucket);
    let dest = R2Client::from_env(&config.dest_bucket)?;

    let progress = IndicatifProgress::transfer_bar(multi, "scanning source bucket...");
    let stats = run_migration(&config, &source, &dest, &progress).await?;

    println!("{stats}");
    if !stats.is_clean() {
        log::warn!(
            "Some objects were skipped or failed; re-run with the full-diff \
             strategy to transfer what is still missing"
        );
    }

    Ok(())
}
