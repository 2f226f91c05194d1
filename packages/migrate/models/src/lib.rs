#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the bucket-bridge migration pipeline.
//!
//! This crate contains the plain data types passed between the source
//! lister, folder classifier, destination differ, and transfer worker
//! pool. It has no I/O and no awareness of either storage backend.

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Listing types
// ---------------------------------------------------------------------------

/// One object from a source bucket listing.
///
/// Produced by the source lister, one per object; held only as long as
/// needed to classify the object and later re-fetch it for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Full object key (the complete path within the bucket).
    pub key: String,
    /// Creation timestamp as reported by the backend, if any.
    pub created_at: Option<DateTime<Utc>>,
    /// MIME content type as reported by the backend, if any.
    pub content_type: Option<String>,
    /// Object size in bytes, if the backend reported one.
    pub size: Option<u64>,
}

/// One page of a paginated listing.
///
/// Both listers return this envelope; the pagination loop terminates
/// when `next_token` is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Opaque continuation token for the next page, if there is one.
    pub next_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Transfer types
// ---------------------------------------------------------------------------

/// One object that needs to be copied to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    /// Key to download from the source and write to the destination.
    pub source_key: String,
    /// Content type to upload with (falls back to a generic binary type
    /// when absent).
    pub content_type: Option<String>,
}

/// Terminal state of a single transfer task.
///
/// Every task submitted to the worker pool resolves to exactly one of
/// these; the pool driver collects and tallies them rather than letting
/// workers fail silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Downloaded and uploaded successfully.
    Transferred {
        /// The object key.
        key: String,
    },
    /// Every download attempt failed; the object was skipped.
    SkippedDownload {
        /// The object key.
        key: String,
        /// Number of download attempts made.
        attempts: u32,
    },
    /// Download succeeded but the destination write failed.
    FailedUpload {
        /// The object key.
        key: String,
    },
}

impl TaskOutcome {
    /// The object key this outcome refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Transferred { key }
            | Self::SkippedDownload { key, .. }
            | Self::FailedUpload { key } => key,
        }
    }
}

// ---------------------------------------------------------------------------
// Run counters
// ---------------------------------------------------------------------------

/// Counters for one migration run.
#[derive(Debug, Default, Clone, Copy)]
pub struct MigrateStats {
    /// Folders that completed their transfer phase (including folders
    /// that needed no work).
    pub folders_migrated: u64,
    /// Folders selected for migration.
    pub folders_total: u64,
    /// Objects copied to the destination.
    pub files_transferred: u64,
    /// Objects skipped after exhausting download retries.
    pub files_skipped: u64,
    /// Objects whose destination write failed.
    pub files_failed: u64,
}

impl MigrateStats {
    /// Merge another stats into this one.
    pub const fn merge(&mut self, other: Self) {
        self.folders_migrated += other.folders_migrated;
        self.folders_total += other.folders_total;
        self.files_transferred += other.files_transferred;
        self.files_skipped += other.files_skipped;
        self.files_failed += other.files_failed;
    }

    /// Tally a single task outcome.
    pub fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Transferred { .. } => self.files_transferred += 1,
            TaskOutcome::SkippedDownload { .. } => self.files_skipped += 1,
            TaskOutcome::FailedUpload { .. } => self.files_failed += 1,
        }
    }

    /// `true` when every file reached the destination.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.files_skipped == 0 && self.files_failed == 0
    }
}

impl std::fmt::Display for MigrateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} folders migrated, {} files transferred, \
             {} skipped (download failed), {} failed (upload)",
            self.folders_migrated,
            self.folders_total,
            self.files_transferred,
            self.files_skipped,
            self.files_failed
        )
    }
}

// ---------------------------------------------------------------------------
// Policy enums
// ---------------------------------------------------------------------------

/// How the destination differ decides what still needs transferring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffStrategy {
    /// Page through every existing destination key under the folder
    /// prefix and transfer exactly the missing set. Safe to re-run
    /// after a partial failure.
    #[default]
    FullDiff,
    /// Probe for a single existing key under the folder prefix and skip
    /// the whole folder when one exists. One API call per folder, but a
    /// folder interrupted mid-transfer is never resumed. Legacy mode.
    PresenceCheck,
}

impl DiffStrategy {
    /// Returns the configuration string for this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullDiff => "full-diff",
            Self::PresenceCheck => "presence-check",
        }
    }

    /// Parses a configuration string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full-diff" => Some(Self::FullDiff),
            "presence-check" => Some(Self::PresenceCheck),
            _ => None,
        }
    }
}

/// How the folder classifier selects folders for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyPolicy {
    /// A folder is selected iff it contains the marker leaf and the
    /// marker was created at or after the cutoff instant.
    DateFiltered {
        /// Leaf filename whose creation time stands in for the folder's
        /// last-produced time.
        marker: String,
        /// Inclusive cutoff instant (UTC).
        cutoff: DateTime<Utc>,
    },
    /// Every folder with at least one object is selected.
    FullMigration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_record_and_merge() {
        let mut stats = MigrateStats::default();
        stats.record(&TaskOutcome::Transferred {
            key: "a".to_string(),
        });
        stats.record(&TaskOutcome::SkippedDownload {
            key: "b".to_string(),
            attempts: 3,
        });
        stats.record(&TaskOutcome::FailedUpload {
            key: "c".to_string(),
        });

        let mut total = MigrateStats {
            folders_migrated: 1,
            folders_total: 2,
            ..MigrateStats::default()
        };
        total.merge(stats);

        assert_eq!(total.files_transferred, 1);
        assert_eq!(total.files_skipped, 1);
        assert_eq!(total.files_failed, 1);
        assert!(!total.is_clean());
        assert_eq!(
            total.to_string(),
            "1/2 folders migrated, 1 files transferred, \
             1 skipped (download failed), 1 failed (upload)"
        );
    }

    #[test]
    fn strategy_round_trips_config_strings() {
        assert_eq!(
            DiffStrategy::parse("full-diff"),
            Some(DiffStrategy::FullDiff)
        );
        assert_eq!(
            DiffStrategy::parse("presence-check"),
            Some(DiffStrategy::PresenceCheck)
        );
        assert_eq!(DiffStrategy::parse("both"), None);
        assert_eq!(DiffStrategy::default().as_str(), "full-diff");
    }

}
