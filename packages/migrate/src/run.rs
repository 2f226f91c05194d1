//! Migration orchestrator: one pass over
//! `SCAN → CLASSIFY → (per folder: DIFF → TRANSFER) → DONE`.
//!
//! The orchestrator is the only component with cross-cutting knowledge:
//! it drives the source listing to exhaustion, feeds the classifier,
//! then walks the selected folders strictly one at a time: folder K's
//! transfer fully drains before folder K+1's diff starts, so peak
//! memory is one folder's key set plus its in-flight buffers, and the
//! destination listing each diff sees is never racing a transfer.
//!
//! Progress is reported after every page, every folder, and every file;
//! runs are long and operators need live feedback. A listing failure on
//! either side aborts the run; per-object failures are tallied and
//! reported at the end of each folder without stopping anything else.

use std::sync::Arc;

use bucket_bridge_migrate_models::{MigrateStats, TaskOutcome};

use crate::MigrateError;
use crate::classify::FolderScan;
use crate::config::MigrateConfig;
use crate::diff;
use crate::pool;
use crate::progress::ProgressCallback;
use crate::store::{DestObjects, SourceObjects};

/// Runs one full migration pass and returns the final counters.
///
/// No state survives this call: a re-run repeats the scan and relies on
/// the differ's idempotency (full-diff strategy) to avoid redundant
/// uploads.
///
/// # Errors
///
/// Returns [`MigrateError`] on a source or destination listing failure;
/// the run stops at the first such error with no final summary for
/// folders not yet attempted.
pub async fn run_migration<S: SourceObjects, D: DestObjects>(
    config: &MigrateConfig,
    source: &S,
    dest: &D,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<MigrateStats, MigrateError> {
    // ── SCAN + CLASSIFY ─────────────────────────────────────────────
    log::info!(
        "Scanning gs://{}/{}* (page size {})",
        config.source_bucket,
        config.source_prefix,
        config.page_size
    );

    let mut scan = FolderScan::new(&config.source_prefix, config.classify_policy());
    let mut page_token: Option<String> = None;
    let mut pages: u64 = 0;

    loop {
        let page = source
            .list_objects(&config.source_prefix, config.page_size, page_token.as_deref())
            .await?;
        pages += 1;

        for record in page.items {
            scan.observe(record);
        }
        log::info!("  page {pages}: {} objects scanned so far", scan.objects_seen());

        match page.next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    let outcome = scan.finish();
    log::info!(
        "Scan complete: {} objects, {} folders seen, {} selected for migration",
        outcome.objects_seen,
        outcome.folders_total,
        outcome.selected.len()
    );

    let mut stats = MigrateStats {
        folders_total: outcome.selected.len() as u64,
        ..MigrateStats::default()
    };

    if outcome.selected.is_empty() {
        log::info!("No folders to migrate");
        return Ok(stats);
    }

    // ── Per folder: DIFF → TRANSFER ─────────────────────────────────
    for (index, plan) in outcome.selected.iter().enumerate() {
        log::info!(
            "Folder {}/{}: {} ({} objects)",
            index + 1,
            stats.folders_total,
            plan.name,
            plan.objects.len()
        );

        let tasks = diff::folder_delta(dest, config.strategy, plan).await?;

        if tasks.is_empty() {
            stats.folders_migrated += 1;
            log::info!("  {} is up to date", plan.name);
            continue;
        }

        progress.set_message(plan.name.clone());
        progress.set_total(tasks.len() as u64);
        progress.set_position(0);

        let outcomes =
            pool::transfer_folder(source, dest, tasks, config.concurrency, progress).await;

        let mut folder_stats = MigrateStats::default();
        for task_outcome in &outcomes {
            folder_stats.record(task_outcome);
            match task_outcome {
                TaskOutcome::Transferred { .. } => {}
                TaskOutcome::SkippedDownload { key, attempts } => {
                    log::warn!("  SKIPPED {key}: download failed after {attempts} attempts");
                }
                TaskOutcome::FailedUpload { key } => {
                    log::warn!("  FAILED {key}: upload error");
                }
            }
        }

        stats.merge(folder_stats);
        stats.folders_migrated += 1;
        log::info!(
            "  {} done: {} transferred, {} skipped, {} failed",
            plan.name,
            folder_stats.files_transferred,
            folder_stats.files_skipped,
            folder_stats.files_failed
        );
    }

    progress.finish_and_clear();
    log::info!("Migration complete: {stats}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::store::fakes::{MemoryDest, MemorySource, record};
    use bucket_bridge_migrate_models::DiffStrategy;
    use chrono::{DateTime, Utc};

    fn config(cutoff: Option<&str>, strategy: DiffStrategy) -> MigrateConfig {
        MigrateConfig {
            source_bucket: "src".to_string(),
            source_prefix: "exports/".to_string(),
            dest_bucket: "dst".to_string(),
            marker_file: "marker.json".to_string(),
            cutoff: cutoff.map(|value| {
                DateTime::parse_from_rfc3339(value)
                    .unwrap()
                    .with_timezone(&Utc)
            }),
            page_size: 2,
            concurrency: 4,
            strategy,
        }
    }

    fn two_folder_source() -> MemorySource {
        MemorySource::with_objects(vec![
            record(
                "exports/f1/marker.json",
                Some("2025-04-01T00:00:00Z"),
                Some("application/json"),
            ),
            record("exports/f1/data.bin", Some("2025-04-01T00:00:00Z"), None),
            record("exports/f1/index.csv", Some("2025-04-01T00:00:00Z"), None),
            record(
                "exports/f2/marker.json",
                Some("2025-01-01T00:00:00Z"),
                Some("application/json"),
            ),
            record("exports/f2/data.bin", Some("2025-01-01T00:00:00Z"), None),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn migrates_only_folders_with_recent_markers() {
        let source = two_folder_source();
        let dest = MemoryDest::default();
        let config = config(Some("2025-03-10T00:00:00Z"), DiffStrategy::FullDiff);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.folders_total, 1);
        assert_eq!(stats.folders_migrated, 1);
        assert_eq!(stats.files_transferred, 3);
        assert!(stats.is_clean());

        // Destination mirrors f1 exactly, f2 untouched.
        assert_eq!(
            dest.keys(),
            vec![
                "exports/f1/data.bin",
                "exports/f1/index.csv",
                "exports/f1/marker.json",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_after_success_transfers_nothing() {
        let source = two_folder_source();
        let dest = MemoryDest::default();
        let config = config(Some("2025-03-10T00:00:00Z"), DiffStrategy::FullDiff);

        run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();
        let first_puts = dest.put_count();

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.folders_migrated, 1);
        assert_eq!(stats.files_transferred, 0);
        assert_eq!(dest.put_count(), first_puts);
    }

    #[tokio::test(start_paused = true)]
    async fn full_diff_resumes_partial_folder() {
        let source = two_folder_source();
        let dest = MemoryDest::with_existing(&["exports/f1/data.bin"]);
        let config = config(Some("2025-03-10T00:00:00Z"), DiffStrategy::FullDiff);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.files_transferred, 2);
        assert_eq!(dest.keys().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn presence_check_never_resumes_partial_folder() {
        let source = two_folder_source();
        let dest = MemoryDest::with_existing(&["exports/f1/data.bin"]);
        let config = config(Some("2025-03-10T00:00:00Z"), DiffStrategy::PresenceCheck);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        // Legacy semantics: the leftover object hides the rest forever.
        assert_eq!(stats.files_transferred, 0);
        assert_eq!(stats.folders_migrated, 1);
        assert_eq!(dest.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_recent_folders_is_a_clean_zero_run() {
        let source = two_folder_source();
        let dest = MemoryDest::default();
        let config = config(Some("2026-01-01T00:00:00Z"), DiffStrategy::FullDiff);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.folders_total, 0);
        assert_eq!(stats.files_transferred, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn full_migration_takes_every_folder() {
        let source = two_folder_source();
        let dest = MemoryDest::default();
        let config = config(None, DiffStrategy::FullDiff);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.folders_total, 2);
        assert_eq!(stats.files_transferred, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_aborts_the_run() {
        let source = MemorySource {
            fail_listing: true,
            ..MemorySource::default()
        };
        let dest = MemoryDest::default();
        let config = config(None, DiffStrategy::FullDiff);

        let result = run_migration(&config, &source, &dest, &null_progress()).await;
        assert!(matches!(result, Err(MigrateError::Source(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn download_failures_are_tallied_not_fatal() {
        let source = two_folder_source();
        source
            .failures
            .lock()
            .unwrap()
            .insert("exports/f1/data.bin".to_string(), u32::MAX);
        let dest = MemoryDest::default();
        let config = config(Some("2025-03-10T00:00:00Z"), DiffStrategy::FullDiff);

        let stats = run_migration(&config, &source, &dest, &null_progress())
            .await
            .unwrap();

        assert_eq!(stats.files_transferred, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.folders_migrated, 1);
        assert!(!stats.is_clean());
    }
}
