//! Static per-run configuration, read once from the environment.
//!
//! There are no CLI flags and no config files: a run is fully described
//! by environment variables, read at startup. Credential variables for
//! the two stores are documented on their client crates
//! ([`bucket_bridge_gcs`], [`bucket_bridge_r2`]).
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `BRIDGE_SOURCE_BUCKET` | Yes | GCS bucket to migrate from |
//! | `BRIDGE_DEST_BUCKET` | Yes | R2 bucket to migrate into |
//! | `BRIDGE_SOURCE_PREFIX` | No | Root prefix to scan (default: whole bucket) |
//! | `BRIDGE_MARKER_FILE` | No | Marker leaf filename (default `manifest.json`) |
//! | `BRIDGE_CUTOFF` | No | RFC 3339 instant; set → only folders with a marker at/after it, unset → migrate every folder |
//! | `BRIDGE_PAGE_SIZE` | No | Source listing page size (default 1000) |
//! | `BRIDGE_CONCURRENCY` | No | Max transfers in flight (default 8) |
//! | `BRIDGE_STRATEGY` | No | `full-diff` (default) or `presence-check` (legacy) |

use bucket_bridge_migrate_models::{ClassifyPolicy, DiffStrategy};
use chrono::{DateTime, Utc};

use crate::MigrateError;

/// Default source listing page size.
const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Default number of transfers in flight per folder.
const DEFAULT_CONCURRENCY: usize = 8;

/// Default marker leaf filename.
const DEFAULT_MARKER_FILE: &str = "manifest.json";

/// Everything one migration run needs to know, static for the run.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// GCS bucket to migrate from.
    pub source_bucket: String,
    /// Root prefix to scan under (may be empty for the whole bucket).
    pub source_prefix: String,
    /// R2 bucket to migrate into.
    pub dest_bucket: String,
    /// Marker leaf filename whose creation time dates a folder.
    pub marker_file: String,
    /// Inclusive cutoff instant; `None` migrates every folder.
    pub cutoff: Option<DateTime<Utc>>,
    /// Source listing page size.
    pub page_size: u32,
    /// Max transfers in flight per folder.
    pub concurrency: usize,
    /// Destination differ strategy.
    pub strategy: DiffStrategy,
}

impl MigrateConfig {
    /// Reads the run configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MissingEnv`] when a required variable is
    /// unset and [`MigrateError::Config`] when a value fails to parse.
    pub fn from_env() -> Result<Self, MigrateError> {
        let source_bucket = require_env("BRIDGE_SOURCE_BUCKET")?;
        let dest_bucket = require_env("BRIDGE_DEST_BUCKET")?;
        let source_prefix = std::env::var("BRIDGE_SOURCE_PREFIX").unwrap_or_default();
        let marker_file = std::env::var("BRIDGE_MARKER_FILE")
            .unwrap_or_else(|_| DEFAULT_MARKER_FILE.to_string());

        let cutoff = match std::env::var("BRIDGE_CUTOFF") {
            Ok(value) => Some(parse_cutoff(&value)?),
            Err(_) => None,
        };

        let page_size = match std::env::var("BRIDGE_PAGE_SIZE") {
            Ok(value) => value.parse().map_err(|_| MigrateError::Config {
                message: format!("BRIDGE_PAGE_SIZE must be a positive integer, got '{value}'"),
            })?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let concurrency = match std::env::var("BRIDGE_CONCURRENCY") {
            Ok(value) => value.parse().map_err(|_| MigrateError::Config {
                message: format!("BRIDGE_CONCURRENCY must be a positive integer, got '{value}'"),
            })?,
            Err(_) => DEFAULT_CONCURRENCY,
        };

        let strategy = match std::env::var("BRIDGE_STRATEGY") {
            Ok(value) => DiffStrategy::parse(&value).ok_or_else(|| MigrateError::Config {
                message: format!(
                    "BRIDGE_STRATEGY must be 'full-diff' or 'presence-check', got '{value}'"
                ),
            })?,
            Err(_) => DiffStrategy::default(),
        };

        Ok(Self {
            source_bucket,
            source_prefix,
            dest_bucket,
            marker_file,
            cutoff,
            page_size,
            concurrency,
            strategy,
        })
    }

    /// The folder selection policy implied by this configuration.
    #[must_use]
    pub fn classify_policy(&self) -> ClassifyPolicy {
        self.cutoff.map_or(ClassifyPolicy::FullMigration, |cutoff| {
            ClassifyPolicy::DateFiltered {
                marker: self.marker_file.clone(),
                cutoff,
            }
        })
    }
}

/// Parses the cutoff as an RFC 3339 instant, normalised to UTC.
fn parse_cutoff(value: &str) -> Result<DateTime<Utc>, MigrateError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MigrateError::Config {
            message: format!("BRIDGE_CUTOFF must be RFC 3339 (e.g. 2025-03-10T00:00:00Z): {e}"),
        })
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String, MigrateError> {
    std::env::var(name).map_err(|_| MigrateError::MissingEnv {
        name: name.to_string(),
    })
}
