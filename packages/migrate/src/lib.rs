#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Folder discovery and idempotent transfer pipeline.
//!
//! Copies logical "folders" (key prefixes) of objects from a Google
//! Cloud Storage bucket into a Cloudflare R2 bucket:
//!
//! 1. **Scan** — page through the source listing under the root prefix.
//! 2. **Classify** — group flat keys into folders and select the ones
//!    to migrate, either every folder or only folders whose marker file
//!    was created on or after a cutoff instant ([`classify`]).
//! 3. **Diff** — per folder, compute what the destination is still
//!    missing ([`diff`]), with a choice of strategies.
//! 4. **Transfer** — copy the delta through a bounded worker pool with
//!    limited download retries ([`pool`]).
//!
//! The pipeline is generic over the [`store::SourceObjects`] and
//! [`store::DestObjects`] seams; [`run::run_migration`] drives one full
//! pass. All state lives in memory for a single run — the destination
//! bucket itself is the only durable record of progress, which is why
//! the differ re-derives "already done" from an actual destination
//! listing instead of a local log.

pub mod classify;
pub mod config;
pub mod diff;
pub mod pool;
pub mod progress;
pub mod run;
pub mod store;

pub use bucket_bridge_migrate_models as models;

use bucket_bridge_gcs::GcsError;
use bucket_bridge_r2::R2Error;

/// Errors that abort a migration run.
///
/// Per-object download and upload failures never surface here; they
/// are absorbed into [`models::TaskOutcome`]s by the worker pool. What
/// remains fatal is listing (either side) and bad configuration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// A configuration value could not be parsed.
    #[error("Invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Source bucket operation failed.
    #[error("Source error: {0}")]
    Source(#[from] GcsError),

    /// Destination bucket operation failed.
    #[error("Destination error: {0}")]
    Dest(#[from] R2Error),
}
