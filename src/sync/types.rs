//! Sync types shared by every stage of the pipeline.
//!
//! Inventories are value snapshots: each stage builds a fresh one and the
//! next stage only reads it. Reports collect per-item results so a single
//! failed file never surfaces as an aborted run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// One file known to an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Root-relative path with forward-slash separators.
    pub relative_path: String,
    /// Hex-encoded content fingerprint.
    pub content_hash: String,
    /// Byte length of the content.
    pub size_bytes: u64,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(relative_path: impl Into<String>, content_hash: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            content_hash: content_hash.into(),
            size_bytes,
        }
    }
}

/// Mapping from relative path to [`FileRecord`].
///
/// Backed by an ordered map, so iteration is sorted by path and every
/// consumer sees the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    records: BTreeMap<String, FileRecord>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any previous record for the same path.
    pub fn insert(&mut self, record: FileRecord) {
        self.records.insert(record.relative_path.clone(), record);
    }

    /// Look up a record by relative path.
    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.records.get(relative_path)
    }

    /// Whether the inventory holds a record for this path.
    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.records.contains_key(relative_path)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the inventory has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Sum of all record sizes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.records.values().map(|r| r.size_bytes).sum()
    }
}

impl FromIterator<FileRecord> for Inventory {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for record in iter {
            inventory.insert(record);
        }
        inventory
    }
}

/// A remote file that must be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    /// Root-relative path with forward-slash separators.
    pub relative_path: String,
    /// Size advertised by the manifest (0 when unknown).
    pub expected_size_bytes: u64,
}

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Scanning,
    FetchingManifest,
    Diffing,
    Downloading,
    Pruning,
    Done,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "scanning"),
            Self::FetchingManifest => write!(f, "fetching_manifest"),
            Self::Diffing => write!(f, "diffing"),
            Self::Downloading => write!(f, "downloading"),
            Self::Pruning => write!(f, "pruning"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Whether per-file failures change the terminal outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// A run that reaches the end succeeds, even if some files failed.
    #[default]
    BestEffort,
    /// Any failed download or deletion makes the run fail.
    Strict,
}

/// A single item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Root-relative path of the item.
    pub relative_path: String,
    /// Human-readable cause.
    pub message: String,
}

/// Result of the download stage.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FetchReport {
    /// Paths written successfully, in fetch order.
    pub downloaded: Vec<String>,
    /// Downloads that failed.
    pub failed: Vec<ItemFailure>,
    /// Bytes written to disk.
    pub bytes_written: u64,
}

impl FetchReport {
    /// Returns true if every entry was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of the prune stage.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PruneReport {
    /// Files removed because the manifest no longer lists them.
    pub files_deleted: Vec<String>,
    /// Directories removed because they were left empty.
    pub directories_deleted: Vec<String>,
    /// Deletions that failed.
    pub failed: Vec<ItemFailure>,
}

/// Per-stage statistics of one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    /// Files found in the local tree before the run.
    pub local_files: usize,
    /// Files listed by the remote manifest.
    pub remote_files: usize,
    /// Entries that had to be fetched.
    pub planned: Vec<DiffEntry>,
    /// Download results.
    pub fetch: FetchReport,
    /// Prune results.
    pub prune: PruneReport,
    /// True when the run stopped after the diff on request.
    pub dry_run: bool,
}

impl SyncReport {
    /// Total bytes the plan expects to download.
    #[must_use]
    pub fn planned_bytes(&self) -> u64 {
        self.planned.iter().map(|e| e.expected_size_bytes).sum()
    }

    /// Number of per-item failures across download and prune.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.fetch.failed.len() + self.prune.failed.len()
    }
}

/// The one value returned per sync invocation.
#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    /// Whether the run succeeded under the configured policy.
    pub succeeded: bool,
    /// Human-readable summary or failure cause.
    pub message: String,
    /// What the run did.
    pub report: SyncReport,
    /// The error that ended the run early, if any.
    ///
    /// `None` when the pipeline ran to the end, including a run that
    /// failed only because of per-file failures under the strict policy.
    #[serde(skip)]
    pub error: Option<SyncError>,
}

impl SyncOutcome {
    pub(crate) fn failure(error: SyncError, report: SyncReport) -> Self {
        Self {
            succeeded: false,
            message: error.to_string(),
            report,
            error: Some(error),
        }
    }
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Manifest or file fetch failed at the network layer.
    #[error("Transport error for {url}: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying cause.
        message: String,
    },

    /// Manifest is unparseable or structurally invalid.
    #[error("Invalid manifest: {0}")]
    ManifestFormat(String),

    /// Read, write or delete failure on a specific path.
    #[error("Filesystem error on {}: {source}", path.display())]
    Filesystem {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Another run holds this root.
    #[error("A sync is already running for {}", root.display())]
    InProgress {
        /// Canonical sync root.
        root: PathBuf,
    },

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn transport(url: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_replaces_same_path() {
        let mut inventory = Inventory::new();
        inventory.insert(FileRecord::new("a.txt", "h1", 1));
        inventory.insert(FileRecord::new("a.txt", "h2", 2));

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get("a.txt").unwrap().content_hash, "h2");
    }

    #[test]
    fn test_inventory_iterates_in_path_order() {
        let inventory: Inventory = [
            FileRecord::new("z.txt", "h", 1),
            FileRecord::new("a/b.txt", "h", 2),
            FileRecord::new("m.txt", "h", 3),
        ]
        .into_iter()
        .collect();

        let paths: Vec<_> = inventory.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a/b.txt", "m.txt", "z.txt"]);
        assert_eq!(inventory.total_bytes(), 6);
    }

    #[test]
    fn test_report_counts() {
        let mut report = SyncReport::default();
        report.planned.push(DiffEntry {
            relative_path: "a".into(),
            expected_size_bytes: 10,
        });
        report.planned.push(DiffEntry {
            relative_path: "b".into(),
            expected_size_bytes: 5,
        });
        report.fetch.failed.push(ItemFailure {
            relative_path: "b".into(),
            message: "404".into(),
        });

        assert_eq!(report.planned_bytes(), 15);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.fetch.is_complete());
    }

    #[test]
    fn test_failure_policy_default() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::BestEffort);
    }
}
