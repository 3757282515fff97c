//! Local inventory: recursive scan of the sync root.
//!
//! Every regular file under the root is read in full, hashed and keyed by
//! its root-relative, forward-slash path. Files that cannot be read are
//! skipped with a warning; one bad file never blocks the rest of the tree.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::sync::hash::{content_hash, HashAlgorithm};
use crate::sync::types::{FileRecord, Inventory, SyncError, SyncResult};

/// Scan `root` and build a fresh inventory.
///
/// A missing root yields an empty inventory.
#[must_use]
pub fn scan(root: &Path, algorithm: HashAlgorithm) -> Inventory {
    let mut inventory = Inventory::new();

    for (path, relative_path) in list_files(root) {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };

        let hash = content_hash(&bytes, algorithm);
        inventory.insert(FileRecord::new(relative_path, hash, bytes.len() as u64));
    }

    debug!(root = %root.display(), files = inventory.len(), "Local inventory built");
    inventory
}

/// List every regular file under `root` with its relative path.
///
/// Symlinks are not followed. Entries that cannot be listed, or whose
/// names are not valid UTF-8, are skipped with a warning.
#[must_use]
pub fn list_files(root: &Path) -> Vec<(PathBuf, String)> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match relative_path(root, entry.path()) {
            Some(relative) => files.push((entry.into_path(), relative)),
            None => warn!(path = %entry.path().display(), "Skipping file with non UTF-8 path"),
        }
    }

    files
}

/// Root-relative path of `path` with forward-slash separators.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let stripped = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Normalize a manifest key and reject anything that could escape the root.
///
/// Backslashes become forward slashes. Empty keys, absolute paths and
/// `.`/`..` segments are rejected.
///
/// # Errors
///
/// Returns a description of the problem when the key is not a plain
/// relative path.
pub fn normalize_relative(key: &str) -> Result<String, String> {
    let normalized = key.replace('\\', "/");
    if normalized.is_empty() {
        return Err("empty path".to_string());
    }
    if normalized.starts_with('/') || normalized.as_bytes().get(1) == Some(&b':') {
        return Err(format!("absolute path not allowed: {key}"));
    }

    let mut parts = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(format!("path escapes the sync root: {key}")),
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(format!("path names no file: {key}"));
    }
    Ok(parts.join("/"))
}

/// Join a normalized relative path onto the root.
///
/// # Errors
///
/// Returns [`SyncError::ManifestFormat`] if the path is not a plain
/// relative path.
pub fn resolve(root: &Path, relative_path: &str) -> SyncResult<PathBuf> {
    let normalized = normalize_relative(relative_path).map_err(SyncError::ManifestFormat)?;
    let mut path = root.to_path_buf();
    for segment in normalized.split('/') {
        path.push(segment);
    }
    Ok(path)
}
