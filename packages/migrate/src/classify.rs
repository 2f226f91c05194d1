//! Folder classification over a stream of source object records.
//!
//! Pure, no I/O. Source buckets are flat key/value namespaces; the
//! "folders" this pipeline migrates are derived purely from key
//! strings: the folder name is the path segment immediately preceding
//! the final key component, relative to the scan root. Keys with fewer
//! than two segments beyond the root have no folder and are ignored.
//!
//! Selection follows a [`ClassifyPolicy`]: either every folder seen, or
//! only folders whose designated marker file was created at or after a
//! cutoff instant. The cutoff comparison is inclusive and compares
//! absolute UTC instants.

use std::collections::{BTreeMap, BTreeSet};

use bucket_bridge_migrate_models::{ClassifyPolicy, ObjectRecord};

/// Splits a root-relative key into `(folder, leaf)`.
///
/// The folder is the second-to-last `/`-separated segment; returns
/// `None` when the key has fewer than two non-empty segments.
#[must_use]
pub fn split_key(relative_key: &str) -> Option<(&str, &str)> {
    let mut segments = relative_key.rsplit('/');
    let leaf = segments.next()?;
    let folder = segments.next()?;
    if folder.is_empty() || leaf.is_empty() {
        return None;
    }
    Some((folder, leaf))
}

/// A folder selected for migration, with everything the differ and the
/// worker pool need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPlan {
    /// Derived folder name.
    pub name: String,
    /// Destination/source prefix for the folder (`{root}{name}/`).
    pub prefix: String,
    /// Source objects grouped under this folder, in listing order.
    pub objects: Vec<ObjectRecord>,
}

/// Result of a completed scan: the selected folders plus the dual
/// counts operators need to tell a filter problem from a scan problem.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Folders selected by the policy, in lexicographic name order.
    pub selected: Vec<FolderPlan>,
    /// Distinct folders seen regardless of recency.
    pub folders_total: usize,
    /// Objects observed across all pages.
    pub objects_seen: u64,
}

/// Accumulates object records page by page and classifies folders.
pub struct FolderScan {
    root: String,
    policy: ClassifyPolicy,
    folders: BTreeMap<String, Vec<ObjectRecord>>,
    selected: BTreeSet<String>,
    objects_seen: u64,
}

impl FolderScan {
    /// Creates a scan rooted at `root_prefix` (a trailing `/` is added
    /// when missing) classifying under `policy`.
    #[must_use]
    pub fn new(root_prefix: &str, policy: ClassifyPolicy) -> Self {
        let root = if root_prefix.is_empty() || root_prefix.ends_with('/') {
            root_prefix.to_string()
        } else {
            format!("{root_prefix}/")
        };

        Self {
            root,
            policy,
            folders: BTreeMap::new(),
            selected: BTreeSet::new(),
            objects_seen: 0,
        }
    }

    /// Objects observed so far.
    #[must_use]
    pub const fn objects_seen(&self) -> u64 {
        self.objects_seen
    }

    /// Feeds one listed object into the scan.
    ///
    /// Objects outside the root or without a folder are counted but
    /// otherwise ignored.
    pub fn observe(&mut self, record: ObjectRecord) {
        self.objects_seen += 1;

        let Some(relative) = record.key.strip_prefix(&self.root) else {
            return;
        };
        let Some((folder, leaf)) = split_key(relative) else {
            return;
        };

        let is_selected = match &self.policy {
            ClassifyPolicy::FullMigration => true,
            ClassifyPolicy::DateFiltered { marker, cutoff } => {
                leaf == marker && record.created_at.is_some_and(|created| created >= *cutoff)
            }
        };
        if is_selected {
            self.selected.insert(folder.to_string());
        }

        self.folders.entry(folder.to_string()).or_default().push(record);
    }

    /// Completes the scan, yielding selected folders and dual counts.
    #[must_use]
    pub fn finish(self) -> ScanOutcome {
        let folders_total = self.folders.len();
        let objects_seen = self.objects_seen;
        let root = self.root;
        let selected_names = self.selected;

        let selected = self
            .folders
            .into_iter()
            .filter(|(name, _)| selected_names.contains(name))
            .map(|(name, objects)| {
                let prefix = format!("{root}{name}/");
                FolderPlan {
                    name,
                    prefix,
                    objects,
                }
            })
            .collect();

        ScanOutcome {
            selected,
            folders_total,
            objects_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fakes::record;
    use chrono::{DateTime, Utc};

    fn cutoff(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date_filtered(marker: &str, at: &str) -> ClassifyPolicy {
        ClassifyPolicy::DateFiltered {
            marker: marker.to_string(),
            cutoff: cutoff(at),
        }
    }

    #[test]
    fn splits_folder_and_leaf() {
        assert_eq!(split_key("f1/manifest.json"), Some(("f1", "manifest.json")));
        assert_eq!(split_key("f1/sub/data.bin"), Some(("sub", "data.bin")));
        assert_eq!(split_key("loose.txt"), None);
        assert_eq!(split_key("f1/"), None);
        assert_eq!(split_key(""), None);
    }

    #[test]
    fn selects_folders_with_recent_marker_inclusively() {
        let policy = date_filtered("manifest.json", "2025-03-10T00:00:00Z");
        let mut scan = FolderScan::new("exports/", policy);

        // Marker exactly at the cutoff instant: included.
        scan.observe(record(
            "exports/f1/manifest.json",
            Some("2025-03-10T00:00:00Z"),
            None,
        ));
        scan.observe(record("exports/f1/data.bin", None, None));
        // Marker before the cutoff: excluded.
        scan.observe(record(
            "exports/f2/manifest.json",
            Some("2025-01-01T00:00:00Z"),
            None,
        ));

        let outcome = scan.finish();
        assert_eq!(outcome.folders_total, 2);
        assert_eq!(outcome.objects_seen, 3);
        assert_eq!(outcome.selected.len(), 1);
        assert_eq!(outcome.selected[0].name, "f1");
        assert_eq!(outcome.selected[0].prefix, "exports/f1/");
        assert_eq!(outcome.selected[0].objects.len(), 2);
    }

    #[test]
    fn stale_marker_excludes_folder_even_with_newer_objects() {
        let policy = date_filtered("manifest.json", "2025-03-10T00:00:00Z");
        let mut scan = FolderScan::new("exports/", policy);

        scan.observe(record(
            "exports/f1/manifest.json",
            Some("2025-02-01T00:00:00Z"),
            None,
        ));
        // Non-marker objects newer than the cutoff do not count.
        scan.observe(record(
            "exports/f1/data.bin",
            Some("2025-06-01T00:00:00Z"),
            None,
        ));

        let outcome = scan.finish();
        assert_eq!(outcome.folders_total, 1);
        assert!(outcome.selected.is_empty());
    }

    #[test]
    fn marker_without_timestamp_is_not_recent() {
        let policy = date_filtered("manifest.json", "2025-03-10T00:00:00Z");
        let mut scan = FolderScan::new("exports/", policy);

        scan.observe(record("exports/f1/manifest.json", None, None));

        assert!(scan.finish().selected.is_empty());
    }

    #[test]
    fn full_migration_selects_every_folder() {
        let mut scan = FolderScan::new("exports", ClassifyPolicy::FullMigration);

        scan.observe(record("exports/f2/data.bin", None, None));
        scan.observe(record("exports/f1/data.bin", None, None));
        scan.observe(record("exports/loose.txt", None, None));

        let outcome = scan.finish();
        assert_eq!(outcome.folders_total, 2);
        assert_eq!(outcome.objects_seen, 3);
        let names: Vec<&str> = outcome.selected.iter().map(|f| f.name.as_str()).collect();
        // Deterministic lexicographic order.
        assert_eq!(names, vec!["f1", "f2"]);
    }

    #[test]
    fn folderless_and_out_of_root_keys_are_ignored() {
        let mut scan = FolderScan::new("exports/", ClassifyPolicy::FullMigration);

        scan.observe(record("exports/loose.txt", None, None));
        scan.observe(record("elsewhere/f1/data.bin", None, None));

        let outcome = scan.finish();
        assert_eq!(outcome.objects_seen, 2);
        assert_eq!(outcome.folders_total, 0);
        assert!(outcome.selected.is_empty());
    }

    #[test]
    fn empty_root_uses_whole_bucket() {
        let mut scan = FolderScan::new("", ClassifyPolicy::FullMigration);

        scan.observe(record("f1/data.bin", None, None));

        let outcome = scan.finish();
        assert_eq!(outcome.selected[0].prefix, "f1/");
    }
}
