//! Sync coordinator: runs the whole pipeline once per call.
//!
//! Phases run strictly in order:
//! `Scanning -> FetchingManifest -> Diffing -> Downloading -> Pruning -> Done`.
//! A failure before the download stage ends the run without touching any
//! file. Per-file failures during download and prune are absorbed and
//! judged by the [`FailurePolicy`] at the end.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::sync::cancel::{guarded, CancelToken};
use crate::sync::diff::diff;
use crate::sync::events::{EventSink, SyncEvent};
use crate::sync::fetch::Fetcher;
use crate::sync::file::ensure_root;
use crate::sync::hash::HashAlgorithm;
use crate::sync::inventory;
use crate::sync::manifest;
use crate::sync::prune::prune;
use crate::sync::transport::{HttpTransport, Transport};
use crate::sync::types::{
    FailurePolicy, SyncError, SyncOutcome, SyncPhase, SyncReport, SyncResult,
};

/// Manifest path used when none is configured.
pub const DEFAULT_MANIFEST_PATH: &str = "md5";

/// Default bound on each network wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one sync root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Base URL the manifest and files are served under.
    pub base_url: String,
    /// Manifest location relative to `base_url`.
    pub manifest_path: String,
    /// Local directory to converge.
    pub root: PathBuf,
    /// Hash algorithm the manifest uses.
    pub algorithm: HashAlgorithm,
    /// Bound on each network wait: connecting, the whole manifest fetch,
    /// and any silence during a file download.
    pub timeout: Duration,
    /// Whether per-file failures fail the run.
    pub policy: FailurePolicy,
    /// Stop after computing the diff.
    pub dry_run: bool,
}

impl SyncOptions {
    /// Options with defaults for everything but the endpoint and root.
    pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            timeout: DEFAULT_TIMEOUT,
            policy: FailurePolicy::default(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_manifest_path(mut self, manifest_path: impl Into<String>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Full URL of the manifest.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, self.manifest_path.trim_start_matches('/'))
        } else {
            format!("{}/{}", self.base_url, self.manifest_path.trim_start_matches('/'))
        }
    }
}

/// Orchestrates scan, manifest fetch, diff, download and prune.
pub struct SyncCoordinator<T: Transport = HttpTransport> {
    transport: T,
    options: SyncOptions,
    events: EventSink,
    cancel: CancelToken,
}

impl SyncCoordinator<HttpTransport> {
    /// Create a coordinator using the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(options: SyncOptions) -> SyncResult<Self> {
        let transport = HttpTransport::new(options.timeout)?;
        Ok(Self::with_transport(transport, options))
    }
}

impl<T: Transport> SyncCoordinator<T> {
    /// Create a coordinator over any transport.
    pub fn with_transport(transport: T, options: SyncOptions) -> Self {
        Self {
            transport,
            options,
            events: EventSink::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Register an observer for run events.
    #[must_use]
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SyncEvent<'_>) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
        self
    }

    /// Register an observer on an existing coordinator.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(&SyncEvent<'_>) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    /// Token that cancels runs of this coordinator.
    ///
    /// Once cancelled, every later run ends immediately as cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The options this coordinator runs with.
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run the pipeline and invoke `on_complete` exactly once.
    pub async fn sync_with<F>(&self, on_complete: F) -> SyncOutcome
    where
        F: FnOnce(bool, &str),
    {
        let outcome = self.sync().await;
        on_complete(outcome.succeeded, &outcome.message);
        outcome
    }

    /// Run the pipeline once and report the terminal outcome.
    pub async fn sync(&self) -> SyncOutcome {
        let mut report = SyncReport::default();
        info!(
            url = %self.options.base_url,
            root = %self.options.root.display(),
            "Sync started"
        );

        let outcome = match self.run(&mut report).await {
            Ok(()) => self.conclude(report),
            Err(e) => {
                error!(error = %e, "Sync failed");
                SyncOutcome::failure(e, report)
            }
        };

        self.enter(SyncPhase::Done);
        info!(succeeded = outcome.succeeded, message = %outcome.message, "Sync finished");
        outcome
    }

    async fn run(&self, report: &mut SyncReport) -> SyncResult<()> {
        let options = &self.options;
        self.cancel.check()?;

        self.enter(SyncPhase::Scanning);
        ensure_root(&options.root)?;
        let _guard = RootGuard::acquire(&options.root)?;
        let local = inventory::scan(&options.root, options.algorithm);
        report.local_files = local.len();
        self.events.emit(&SyncEvent::LocalInventoryLoaded(&local));

        self.enter(SyncPhase::FetchingManifest);
        let url = options.manifest_url();
        let text = guarded(self.transport.get_text(&url), &url, options.timeout, &self.cancel).await?;
        let remote = manifest::parse(&text)?;
        report.remote_files = remote.len();
        info!(files = remote.len(), "Remote manifest loaded");
        self.events.emit(&SyncEvent::RemoteInventoryLoaded(&remote));

        self.enter(SyncPhase::Diffing);
        let plan = diff(&local, &remote);
        info!(files = plan.len(), "Diff computed");
        self.events.emit(&SyncEvent::DiffComputed(&plan));

        if options.dry_run {
            report.planned = plan;
            report.dry_run = true;
            return Ok(());
        }

        self.cancel.check()?;
        self.enter(SyncPhase::Downloading);
        let fetcher = Fetcher::new(
            &self.transport,
            &options.base_url,
            &options.root,
            options.timeout,
            &self.events,
            &self.cancel,
        );
        let fetched = fetcher.fetch(&plan).await;
        report.planned = plan;
        report.fetch = fetched?;

        self.cancel.check()?;
        self.enter(SyncPhase::Pruning);
        report.prune = prune(&options.root, &remote, &self.events);

        Ok(())
    }

    fn enter(&self, phase: SyncPhase) {
        debug!(%phase, "Entering phase");
        self.events.emit(&SyncEvent::PhaseChanged(phase));
    }

    fn conclude(&self, report: SyncReport) -> SyncOutcome {
        if report.dry_run {
            let message = format!(
                "dry run: {} files ({} bytes) to download",
                report.planned.len(),
                report.planned_bytes()
            );
            return SyncOutcome {
                succeeded: true,
                message,
                report,
                error: None,
            };
        }

        let failures = report.failure_count();
        let mut message = format!(
            "{} downloaded, {} deleted, {} directories removed",
            report.fetch.downloaded.len(),
            report.prune.files_deleted.len(),
            report.prune.directories_deleted.len()
        );
        if failures > 0 {
            message.push_str(&format!(", {failures} failed"));
        }

        let succeeded = failures == 0 || self.options.policy == FailurePolicy::BestEffort;
        SyncOutcome {
            succeeded,
            message,
            report,
            error: None,
        }
    }
}

/// Roots with a run in flight in this process.
fn in_flight() -> &'static Mutex<HashSet<PathBuf>> {
    static IN_FLIGHT: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    IN_FLIGHT.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Single-flight guard keyed by canonical root; released on drop.
struct RootGuard {
    root: PathBuf,
}

impl RootGuard {
    fn acquire(root: &Path) -> SyncResult<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| SyncError::filesystem(root, e))?;
        let mut roots = in_flight().lock().unwrap_or_else(PoisonError::into_inner);
        if !roots.insert(root.clone()) {
            return Err(SyncError::InProgress { root });
        }
        Ok(Self { root })
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        in_flight()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.root);
    }
}
