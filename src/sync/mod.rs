//! One-way directory synchronization over HTTP.
//!
//! A run converges a local directory onto the tree described by a remote
//! manifest:
//!
//! - **Scan**: hash every regular file under the root
//! - **Manifest**: fetch and parse the remote `{path: {hash, size}}` map
//! - **Diff**: list remote files that are missing or different locally
//! - **Download**: fetch each listed file, continuing past failures
//! - **Prune**: delete files the manifest no longer lists, then empty directories
//!
//! # Example
//!
//! ```ignore
//! use httpsync::sync::{SyncCoordinator, SyncOptions};
//!
//! let options = SyncOptions::new("http://127.0.0.1:8080/", "./downloaded");
//! let coordinator = SyncCoordinator::new(options)?
//!     .on_event(|event| println!("{event:?}"));
//! let outcome = coordinator.sync().await;
//! println!("{}: {}", outcome.succeeded, outcome.message);
//! ```

mod cancel;
mod coordinator;
mod diff;
mod events;
mod fetch;
mod file;
mod hash;
pub mod inventory;
pub mod manifest;
mod prune;
mod transport;
mod types;

pub use cancel::CancelToken;
pub use coordinator::{SyncCoordinator, SyncOptions, DEFAULT_MANIFEST_PATH, DEFAULT_TIMEOUT};
pub use diff::diff;
pub use events::{EventHandler, EventSink, SyncEvent};
pub use fetch::Fetcher;
pub use file::{atomic_write, PARTIAL_SUFFIX};
pub use hash::{content_hash, has_changed, HashAlgorithm};
pub use prune::prune;
pub use transport::{join_url, HttpTransport, Transport};
pub use types::{
    DiffEntry, FailurePolicy, FetchReport, FileRecord, Inventory, ItemFailure, PruneReport,
    SyncError, SyncOutcome, SyncPhase, SyncReport, SyncResult,
};
