//! Manifest command implementation.
//!
//! The producer side of a sync: fingerprints a directory and emits the
//! JSON manifest a static file server publishes next to the files.

use serde::Serialize;

use crate::cli::ManifestArgs;
use crate::error::{Error, Result};
use crate::sync::{atomic_write, inventory, manifest, Inventory};

#[derive(Serialize)]
struct ManifestOutput<'a> {
    success: bool,
    output: String,
    algorithm: String,
    files: usize,
    total_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    excluded: Option<&'a str>,
}

/// Execute the manifest command.
///
/// # Errors
///
/// Returns an error if the directory does not exist or the manifest cannot
/// be written.
pub fn execute(args: &ManifestArgs, json: bool, quiet: bool) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Not a directory: {}",
            args.dir.display()
        )));
    }

    let scanned = inventory::scan(&args.dir, args.algorithm);

    // A manifest written inside the directory must not list itself.
    let excluded = args
        .output
        .as_deref()
        .and_then(|output| inventory::relative_path(&args.dir, output));
    let inventory: Inventory = scanned
        .iter()
        .filter(|record| Some(&record.relative_path) != excluded.as_ref())
        .cloned()
        .collect();

    let rendered = manifest::render(&inventory);

    let Some(output) = &args.output else {
        println!("{rendered}");
        return Ok(());
    };

    atomic_write(output, &format!("{rendered}\n"))?;

    if json {
        let payload = ManifestOutput {
            success: true,
            output: output.display().to_string(),
            algorithm: args.algorithm.to_string(),
            files: inventory.len(),
            total_bytes: inventory.total_bytes(),
            excluded: excluded.as_deref(),
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else if !quiet {
        println!(
            "Wrote manifest for {} files ({} bytes) to {}",
            inventory.len(),
            inventory.total_bytes(),
            output.display()
        );
    }

    Ok(())
}
