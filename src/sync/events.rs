//! Observer notifications emitted while a sync runs.
//!
//! Handlers are injected by the caller and only observe; nothing they do
//! feeds back into the pipeline.

use crate::sync::types::{DiffEntry, Inventory, SyncPhase};

/// A milestone of a sync run.
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    /// The coordinator entered a new phase.
    PhaseChanged(SyncPhase),
    /// The local tree was scanned.
    LocalInventoryLoaded(&'a Inventory),
    /// The remote manifest was fetched and parsed.
    RemoteInventoryLoaded(&'a Inventory),
    /// The fetch plan was computed.
    DiffComputed(&'a [DiffEntry]),
    /// A file was downloaded and moved into place.
    FileCreated(&'a str),
    /// A file could not be downloaded.
    FileFailed {
        relative_path: &'a str,
        message: &'a str,
    },
    /// A file absent from the manifest was deleted.
    FileDeleted(&'a str),
    /// A directory left empty was removed.
    DirectoryDeleted(&'a str),
}

/// Boxed observer callback.
pub type EventHandler = Box<dyn Fn(&SyncEvent<'_>) + Send + Sync>;

/// The set of handlers a coordinator notifies.
#[derive(Default)]
pub struct EventSink {
    handlers: Vec<EventHandler>,
}

impl EventSink {
    /// Create a sink with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in registration order.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(&SyncEvent<'_>) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Notify every handler.
    pub fn emit(&self, event: &SyncEvent<'_>) {
        for handler in &self.handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
