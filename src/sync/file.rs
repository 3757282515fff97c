//! Safe file operations for sync.
//!
//! Downloads land in a temporary sibling first and are renamed into place
//! only once complete, so an interrupted transfer never replaces a valid
//! file. Leftover temporaries are not in any manifest and get pruned.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::sync::types::{SyncError, SyncResult};

/// Suffix appended to in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".httpsync-part";

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary sibling file
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> SyncResult<()> {
    let temp_path = partial_path(path);

    ensure_parent(path)?;

    {
        let file = File::create(&temp_path).map_err(|e| SyncError::filesystem(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|()| writer.flush())
            .and_then(|()| writer.get_ref().sync_all())
            .map_err(|e| SyncError::filesystem(&temp_path, e))?;
    }

    commit(&temp_path, path)
}

/// Temporary sibling used while `dest` is being written.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing.
///
/// # Errors
///
/// Returns a filesystem error if the directory cannot be created, for
/// example because a file occupies one of the parent components.
pub fn ensure_parent(path: &Path) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::filesystem(parent, e))?;
    }
    Ok(())
}

/// Move a finished temporary file over its destination.
///
/// On failure the temporary file is removed.
///
/// # Errors
///
/// Returns a filesystem error if the rename fails.
pub fn commit(temp_path: &Path, dest: &Path) -> SyncResult<()> {
    fs::rename(temp_path, dest).map_err(|e| {
        discard(temp_path);
        SyncError::filesystem(dest, e)
    })
}

/// Remove a temporary file, ignoring one that does not exist.
pub fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}

/// Create `root` if missing.
///
/// # Errors
///
/// Returns a filesystem error if the root cannot be created or exists but
/// is not a directory.
pub fn ensure_root(root: &Path) -> SyncResult<()> {
    if root.exists() && !root.is_dir() {
        return Err(SyncError::filesystem(
            root,
            std::io::Error::other("sync root exists but is not a directory"),
        ));
    }
    fs::create_dir_all(root).map_err(|e| SyncError::filesystem(root, e))
}
