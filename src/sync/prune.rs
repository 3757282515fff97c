//! Prune stage: remove what the manifest no longer lists.
//!
//! Runs after the download stage so freshly fetched files are part of the
//! rescan and can never be mistaken for orphans. Files go first, then
//! directories children-first, so a directory emptied by removing its last
//! child is itself removed in the same pass. The root is never removed.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::sync::events::{EventSink, SyncEvent};
use crate::sync::inventory::{list_files, relative_path};
use crate::sync::types::{Inventory, ItemFailure, PruneReport};

/// Delete local files absent from `remote`, then empty directories.
pub fn prune(root: &Path, remote: &Inventory, events: &EventSink) -> PruneReport {
    let mut report = PruneReport::default();
    delete_orphan_files(root, remote, events, &mut report);
    delete_empty_directories(root, events, &mut report);
    debug!(
        files = report.files_deleted.len(),
        directories = report.directories_deleted.len(),
        failed = report.failed.len(),
        "Prune complete"
    );
    report
}

fn delete_orphan_files(root: &Path, remote: &Inventory, events: &EventSink, report: &mut PruneReport) {
    for (path, relative) in list_files(root) {
        if remote.contains(&relative) {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %relative, "File deleted");
                events.emit(&SyncEvent::FileDeleted(&relative));
                report.files_deleted.push(relative);
            }
            Err(e) => {
                warn!(path = %relative, error = %e, "Failed to delete file");
                report.failed.push(ItemFailure {
                    relative_path: relative,
                    message: e.to_string(),
                });
            }
        }
    }
}

fn delete_empty_directories(root: &Path, events: &EventSink, report: &mut PruneReport) {
    if !root.is_dir() {
        return;
    }

    let directories = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir());

    for entry in directories {
        let path = entry.path();
        let Some(relative) = relative_path(root, path) else {
            continue;
        };

        let is_empty = match fs::read_dir(path) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                warn!(path = %relative, error = %e, "Failed to read directory");
                continue;
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                info!(path = %relative, "Directory deleted");
                events.emit(&SyncEvent::DirectoryDeleted(&relative));
                report.directories_deleted.push(relative);
            }
            Err(e) => {
                warn!(path = %relative, error = %e, "Failed to delete directory");
                report.failed.push(ItemFailure {
                    relative_path: relative,
                    message: e.to_string(),
                });
            }
        }
    }
}
