//! Download stage.
//!
//! Entries are fetched one at a time. A failed entry is logged, recorded in
//! the report and skipped; only cancellation stops the batch.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::sync::cancel::{cancellable, CancelToken};
use crate::sync::events::{EventSink, SyncEvent};
use crate::sync::file;
use crate::sync::inventory;
use crate::sync::transport::{join_url, Transport};
use crate::sync::types::{DiffEntry, FetchReport, ItemFailure, SyncError, SyncResult};

/// Downloads diff entries into the sync root.
pub struct Fetcher<'a, T: Transport> {
    transport: &'a T,
    base_url: &'a str,
    root: &'a Path,
    /// Longest silence tolerated from the server during one download.
    timeout: Duration,
    events: &'a EventSink,
    cancel: &'a CancelToken,
}

impl<'a, T: Transport> Fetcher<'a, T> {
    /// Create a fetcher writing under `root`.
    pub fn new(
        transport: &'a T,
        base_url: &'a str,
        root: &'a Path,
        timeout: Duration,
        events: &'a EventSink,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            transport,
            base_url,
            root,
            timeout,
            events,
            cancel,
        }
    }

    /// Fetch every entry, overwriting existing files.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the run is cancelled. Per-file
    /// failures are reported in the [`FetchReport`] instead.
    pub async fn fetch(&self, entries: &[DiffEntry]) -> SyncResult<FetchReport> {
        let mut report = FetchReport::default();

        for (index, entry) in entries.iter().enumerate() {
            self.cancel.check()?;
            debug!(path = %entry.relative_path, current = index + 1, total = entries.len(), "Downloading");

            match self.fetch_one(entry).await {
                Ok(written) => {
                    info!(path = %entry.relative_path, bytes = written, "File created");
                    report.bytes_written += written;
                    report.downloaded.push(entry.relative_path.clone());
                    self.events.emit(&SyncEvent::FileCreated(&entry.relative_path));
                }
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    let message = e.to_string();
                    warn!(path = %entry.relative_path, error = %message, "Download failed");
                    self.events.emit(&SyncEvent::FileFailed {
                        relative_path: &entry.relative_path,
                        message: &message,
                    });
                    report.failed.push(ItemFailure {
                        relative_path: entry.relative_path.clone(),
                        message,
                    });
                }
            }
        }

        Ok(report)
    }

    async fn fetch_one(&self, entry: &DiffEntry) -> SyncResult<u64> {
        let dest = inventory::resolve(self.root, &entry.relative_path)?;
        file::ensure_parent(&dest)?;

        let url = join_url(self.base_url, &entry.relative_path);
        let partial = file::partial_path(&dest);

        let download = self.transport.download(&url, &partial, self.timeout);
        let written = match cancellable(download, self.cancel).await {
            Ok(written) => written,
            Err(e) => {
                file::discard(&partial);
                return Err(e);
            }
        };

        if entry.expected_size_bytes > 0 && entry.expected_size_bytes != written {
            warn!(
                path = %entry.relative_path,
                expected = entry.expected_size_bytes,
                actual = written,
                "Downloaded size differs from manifest"
            );
        }

        file::commit(&partial, &dest)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::transport::memory::MemoryTransport;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const BASE: &str = "http://server/";

    fn entry(path: &str, size: u64) -> DiffEntry {
        DiffEntry {
            relative_path: path.to_string(),
            expected_size_bytes: size,
        }
    }

    async fn run(transport: &MemoryTransport, root: &Path, entries: &[DiffEntry], events: &EventSink) -> FetchReport {
        let cancel = CancelToken::new();
        Fetcher::new(transport, BASE, root, Duration::from_secs(5), events, &cancel)
            .fetch(entries)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        transport.serve("http://server/a/b/c.txt", "deep");

        let report = run(&transport, temp_dir.path(), &[entry("a/b/c.txt", 4)], &EventSink::new()).await;

        assert_eq!(report.downloaded, vec!["a/b/c.txt"]);
        assert_eq!(report.bytes_written, 4);
        assert_eq!(fs::read_to_string(temp_dir.path().join("a/b/c.txt")).unwrap(), "deep");
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "stale content").unwrap();
        let transport = MemoryTransport::new();
        transport.serve("http://server/a.txt", "new");

        run(&transport, temp_dir.path(), &[entry("a.txt", 3)], &EventSink::new()).await;

        assert_eq!(fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_abort_batch() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        transport.serve("http://server/one.txt", "1");
        transport.fail("http://server/two.txt", "connection reset");
        transport.serve("http://server/three.txt", "3");

        let created = Arc::new(Mutex::new(Vec::new()));
        let failed = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventSink::new();
        {
            let created = Arc::clone(&created);
            let failed = Arc::clone(&failed);
            events.subscribe(move |event| match event {
                SyncEvent::FileCreated(path) => created.lock().unwrap().push((*path).to_string()),
                SyncEvent::FileFailed { relative_path, .. } => {
                    failed.lock().unwrap().push((*relative_path).to_string());
                }
                _ => {}
            });
        }

        let entries = [entry("one.txt", 1), entry("two.txt", 1), entry("three.txt", 1)];
        let report = run(&transport, temp_dir.path(), &entries, &events).await;

        assert_eq!(report.downloaded, vec!["one.txt", "three.txt"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].relative_path, "two.txt");
        assert!(report.failed[0].message.contains("connection reset"));
        assert_eq!(*created.lock().unwrap(), vec!["one.txt", "three.txt"]);
        assert_eq!(*failed.lock().unwrap(), vec!["two.txt"]);
        assert!(!temp_dir.path().join("two.txt").exists());
    }

    #[tokio::test]
    async fn test_failed_download_keeps_previous_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "previous").unwrap();
        let transport = MemoryTransport::new();

        let report = run(&transport, temp_dir.path(), &[entry("a.txt", 3)], &EventSink::new()).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(), "previous");
        assert!(!temp_dir.path().join("a.txt.httpsync-part").exists());
    }

    #[tokio::test]
    async fn test_fetch_blocked_by_file_in_parent_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("dir"), "i am a file").unwrap();
        let transport = MemoryTransport::new();
        transport.serve("http://server/dir/inner.txt", "x");
        transport.serve("http://server/ok.txt", "y");

        let entries = [entry("dir/inner.txt", 1), entry("ok.txt", 1)];
        let report = run(&transport, temp_dir.path(), &entries, &EventSink::new()).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.downloaded, vec!["ok.txt"]);
    }

    #[tokio::test]
    async fn test_fetch_stops_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        transport.serve("http://server/a.txt", "a");
        let cancel = CancelToken::new();
        cancel.cancel();
        let events = EventSink::new();

        let result = Fetcher::new(&transport, BASE, temp_dir.path(), Duration::from_secs(5), &events, &cancel)
            .fetch(&[entry("a.txt", 1)])
            .await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_per_file_failure() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        transport.stall("http://server/slow.bin");
        transport.serve("http://server/fast.bin", "f");
        let cancel = CancelToken::new();
        let events = EventSink::new();

        let report = Fetcher::new(&transport, BASE, temp_dir.path(), Duration::from_millis(30), &events, &cancel)
            .fetch(&[entry("slow.bin", 1), entry("fast.bin", 1)])
            .await
            .unwrap();

        assert_eq!(report.downloaded, vec!["fast.bin"]);
        assert!(report.failed[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_slow_steady_download_outlasts_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        // Twelve bytes, 10ms apart: well past the 50ms bound in total, but
        // never silent for that long.
        transport.trickle("http://server/steady.bin", "slow payload", Duration::from_millis(10));
        let cancel = CancelToken::new();
        let events = EventSink::new();

        let report = Fetcher::new(&transport, BASE, temp_dir.path(), Duration::from_millis(50), &events, &cancel)
            .fetch(&[entry("steady.bin", 12)])
            .await
            .unwrap();

        assert!(report.is_complete(), "{:?}", report.failed);
        assert_eq!(fs::read_to_string(temp_dir.path().join("steady.bin")).unwrap(), "slow payload");
    }

    #[tokio::test]
    async fn test_cancel_interrupts_download() {
        let temp_dir = TempDir::new().unwrap();
        let transport = MemoryTransport::new();
        transport.stall("http://server/slow.bin");
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let events = EventSink::new();

        let fetcher = Fetcher::new(&transport, BASE, temp_dir.path(), Duration::from_secs(30), &events, &cancel);
        let entries = [entry("slow.bin", 1)];
        let (result, ()) = tokio::join!(fetcher.fetch(&entries), async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(!temp_dir.path().join("slow.bin.httpsync-part").exists());
    }
}
