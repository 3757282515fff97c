//! Diff between the local inventory and the remote manifest.
//!
//! Only "what to fetch" is computed here. Files present locally but not
//! remotely are the pruner's concern.

use crate::sync::hash::has_changed;
use crate::sync::types::{DiffEntry, Inventory};

/// Remote entries that are missing locally or whose hash differs.
///
/// The hash is the only change signal: a size mismatch with an equal hash
/// is not fetched. Order follows the remote inventory.
#[must_use]
pub fn diff(local: &Inventory, remote: &Inventory) -> Vec<DiffEntry> {
    remote
        .iter()
        .filter(|record| {
            let local_hash = local.get(&record.relative_path).map(|r| r.content_hash.as_str());
            has_changed(&record.content_hash, local_hash)
        })
        .map(|record| DiffEntry {
            relative_path: record.relative_path.clone(),
            expected_size_bytes: record.size_bytes,
        })
        .collect()
}
