//! Destination differ: what does a folder still need?
//!
//! Two interchangeable strategies, selected by configuration:
//!
//! - [`DiffStrategy::FullDiff`] (default) pages through every existing
//!   destination key under the folder prefix and transfers exactly the
//!   missing set. Costs one listing pass per folder but makes re-runs
//!   idempotent: after a partial failure only the missing objects move.
//! - [`DiffStrategy::PresenceCheck`] probes for a single key and skips
//!   the whole folder when one exists. One API call per folder, but a
//!   folder interrupted mid-transfer is never resumed — a single
//!   leftover object permanently marks it "done". Kept as a legacy
//!   mode; do not use it for resumable migrations.

use std::collections::HashSet;

use bucket_bridge_migrate_models::{DiffStrategy, ObjectRecord, TransferTask};

use crate::MigrateError;
use crate::classify::FolderPlan;
use crate::store::{self, DestObjects};

/// Computes the transfer list `source − existing` on full key strings.
///
/// Pure set difference; running it twice with no transfer in between
/// yields the same list.
#[must_use]
pub fn missing_tasks(objects: &[ObjectRecord], existing: &HashSet<String>) -> Vec<TransferTask> {
    objects
        .iter()
        .filter(|record| !existing.contains(&record.key))
        .map(|record| TransferTask {
            source_key: record.key.clone(),
            content_type: record.content_type.clone(),
        })
        .collect()
}

/// Computes the tasks remaining for one folder under `strategy`.
///
/// An empty result means the folder needs no work: either every object
/// already exists (full diff) or the presence probe found one and the
/// legacy strategy skips the folder wholesale.
///
/// # Errors
///
/// Returns [`MigrateError`] when a destination listing fails; this is
/// fatal to the run.
pub async fn folder_delta<D: DestObjects>(
    dest: &D,
    strategy: DiffStrategy,
    plan: &FolderPlan,
) -> Result<Vec<TransferTask>, MigrateError> {
    match strategy {
        DiffStrategy::PresenceCheck => {
            if store::any_key_under(dest, &plan.prefix).await? {
                log::info!(
                    "  {} already has objects at the destination, skipping folder (presence-check)",
                    plan.name
                );
                return Ok(Vec::new());
            }
            Ok(missing_tasks(&plan.objects, &HashSet::new()))
        }
        DiffStrategy::FullDiff => {
            let existing: HashSet<String> = store::list_all_keys(dest, &plan.prefix)
                .await?
                .into_iter()
                .collect();
            let tasks = missing_tasks(&plan.objects, &existing);
            log::info!(
                "  {}: {} of {} objects missing at the destination",
                plan.name,
                tasks.len(),
                plan.objects.len()
            );
            Ok(tasks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fakes::{MemoryDest, record};

    fn plan(objects: Vec<ObjectRecord>) -> FolderPlan {
        FolderPlan {
            name: "f1".to_string(),
            prefix: "exports/f1/".to_string(),
            objects,
        }
    }

    #[test]
    fn missing_tasks_is_exact_set_difference() {
        let objects = vec![
            record("exports/f1/a", None, Some("application/json")),
            record("exports/f1/b", None, None),
            record("exports/f1/c", None, None),
        ];
        let existing: HashSet<String> = ["exports/f1/b".to_string()].into_iter().collect();

        let tasks = missing_tasks(&objects, &existing);
        let keys: Vec<&str> = tasks.iter().map(|t| t.source_key.as_str()).collect();
        assert_eq!(keys, vec!["exports/f1/a", "exports/f1/c"]);
        assert_eq!(tasks[0].content_type.as_deref(), Some("application/json"));

        // Idempotent: nothing transferred in between, same answer.
        assert_eq!(missing_tasks(&objects, &existing), tasks);
    }

    #[tokio::test]
    async fn full_diff_transfers_only_missing_objects() {
        let dest = MemoryDest::with_existing(&["exports/f1/a"]);
        let plan = plan(vec![
            record("exports/f1/a", None, None),
            record("exports/f1/b", None, None),
        ]);

        let tasks = folder_delta(&dest, DiffStrategy::FullDiff, &plan)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source_key, "exports/f1/b");
    }

    #[tokio::test]
    async fn full_diff_with_complete_destination_is_empty() {
        let dest = MemoryDest::with_existing(&["exports/f1/a", "exports/f1/b"]);
        let plan = plan(vec![
            record("exports/f1/a", None, None),
            record("exports/f1/b", None, None),
        ]);

        let tasks = folder_delta(&dest, DiffStrategy::FullDiff, &plan)
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn presence_check_skips_folder_with_any_object() {
        let dest = MemoryDest::with_existing(&["exports/f1/a"]);
        let plan = plan(vec![
            record("exports/f1/a", None, None),
            record("exports/f1/b", None, None),
        ]);

        // One leftover object hides the missing one — the documented
        // legacy trade-off.
        let tasks = folder_delta(&dest, DiffStrategy::PresenceCheck, &plan)
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn presence_check_transfers_everything_when_empty() {
        let dest = MemoryDest::default();
        let plan = plan(vec![
            record("exports/f1/a", None, None),
            record("exports/f1/b", None, None),
        ]);

        let tasks = folder_delta(&dest, DiffStrategy::PresenceCheck, &plan)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
    }
}
