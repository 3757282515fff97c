//! Remote manifest parsing and rendering.
//!
//! The manifest is a JSON object keyed by relative path:
//!
//! ```json
//! {
//!   "a.txt": { "hash": "900150983cd24fb0d6963f7d28e17f72", "size": "3" },
//!   "maps/level1.bin": { "hash": "...", "size": 4096 }
//! }
//! ```
//!
//! A bare string value is taken as the hash with an unknown size, which is
//! the flat `path -> md5` form served by simple manifest producers.

use serde_json::{Map, Value};

use crate::sync::inventory::normalize_relative;
use crate::sync::types::{FileRecord, Inventory, SyncError, SyncResult};

/// Parse manifest text into a fresh inventory.
///
/// # Errors
///
/// Returns [`SyncError::ManifestFormat`] if the text is not valid JSON, the
/// top level is not an object, or any entry is missing its hash, has an
/// invalid size, or names a path outside the sync root. Two keys that
/// normalize to the same path are also rejected.
pub fn parse(json_text: &str) -> SyncResult<Inventory> {
    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| SyncError::ManifestFormat(format!("not valid JSON: {e}")))?;

    let Value::Object(entries) = value else {
        return Err(SyncError::ManifestFormat(
            "top level must be an object of path -> {hash, size}".to_string(),
        ));
    };

    let mut inventory = Inventory::new();
    for (key, entry) in entries {
        let relative_path = normalize_relative(&key).map_err(SyncError::ManifestFormat)?;
        if inventory.contains(&relative_path) {
            return Err(SyncError::ManifestFormat(format!(
                "duplicate entry for {relative_path} (key {key:?})"
            )));
        }
        let (hash, size) = parse_entry(&key, &entry)?;
        inventory.insert(FileRecord::new(relative_path, hash, size));
    }

    Ok(inventory)
}

fn parse_entry(key: &str, entry: &Value) -> SyncResult<(String, u64)> {
    match entry {
        Value::String(hash) => Ok((non_empty_hash(key, hash)?, 0)),
        Value::Object(fields) => {
            let hash = fields
                .get("hash")
                .or_else(|| fields.get("md5"))
                .ok_or_else(|| SyncError::ManifestFormat(format!("entry '{key}' has no hash")))?;
            let Value::String(hash) = hash else {
                return Err(SyncError::ManifestFormat(format!(
                    "entry '{key}' hash must be a string"
                )));
            };
            let hash = non_empty_hash(key, hash)?;
            let size = parse_size(key, fields.get("size"))?;
            Ok((hash, size))
        }
        _ => Err(SyncError::ManifestFormat(format!(
            "entry '{key}' must be an object or a hash string"
        ))),
    }
}

fn non_empty_hash(key: &str, hash: &str) -> SyncResult<String> {
    let hash = hash.trim();
    if hash.is_empty() {
        return Err(SyncError::ManifestFormat(format!("entry '{key}' has an empty hash")));
    }
    Ok(hash.to_ascii_lowercase())
}

fn parse_size(key: &str, size: Option<&Value>) -> SyncResult<u64> {
    let invalid = || SyncError::ManifestFormat(format!("entry '{key}' has an invalid size"));
    match size {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Render an inventory as manifest JSON, in path order.
///
/// Sizes are written as integers; [`parse`] accepts both integers and
/// decimal strings.
#[must_use]
pub fn render(inventory: &Inventory) -> String {
    let mut entries = Map::new();
    for record in inventory.iter() {
        entries.insert(
            record.relative_path.clone(),
            serde_json::json!({
                "hash": record.content_hash,
                "size": record.size_bytes,
            }),
        );
    }
    // A map of strings and integers always serializes.
    serde_json::to_string_pretty(&Value::Object(entries)).unwrap_or_else(|_| "{}".to_string())
}
