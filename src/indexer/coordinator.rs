//! Indexing coordinator: owns the graph store, a queue of pending files and
//! one watcher per project root.
//!
//! The queue is drained in fixed-size batches. Extraction of a batch runs in
//! parallel on a blocking thread; the results are then applied to the store
//! one file at a time in queue order, so the store only ever has one writer.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::index::{CodeIndex, GraphStore, IndexStats, InheritanceInfo, SymbolSummary};
use crate::indexer::extractor::{ExtractionResult, SymbolExtractor};
use crate::indexer::progress::{IndexingProgress, ProgressSnapshot};
use crate::indexer::walker::{FileWalker, PathFilter, RootScan};
use crate::indexer::watcher::{FileEvent, RootWatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Indexing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeSummary {
    pub accepted_file_count: usize,
    pub root_count: usize,
}

#[derive(Clone)]
pub struct IndexCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: IndexerConfig,
    store: RwLock<GraphStore>,
    state: Mutex<CoordinatorState>,
    phase: watch::Sender<Phase>,
    extractor: SymbolExtractor,
    progress: IndexingProgress,
    initialized: AtomicBool,
}

#[derive(Default)]
struct CoordinatorState {
    queue: VecDeque<PathBuf>,
    /// Paths removed since the in-flight batch was drained. Their extracted
    /// symbols are stale and must not reach the store.
    retracted: HashSet<PathBuf>,
    roots: Vec<PathBuf>,
    watchers: Vec<RootWatcher>,
}

impl IndexCoordinator {
    pub fn new(config: IndexerConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                store: RwLock::new(GraphStore::new()),
                state: Mutex::new(CoordinatorState::default()),
                phase,
                extractor: SymbolExtractor::new(),
                progress: IndexingProgress::new(),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.inner.config
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.progress.snapshot()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.inner.lock_state().roots.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_state().queue.len()
    }

    /// Rebuilds the index over `roots`.
    ///
    /// Rejected with `Busy` while a previous run is still indexing. Otherwise
    /// closes every previous watcher, clears the queue and the store, scans
    /// each root and queues the files found. Returns as soon as the files
    /// are queued; use `wait_until_idle` to wait for the index to settle.
    /// A root that cannot be scanned is logged and skipped.
    pub async fn initialize(
        &self,
        roots: &[PathBuf],
        ignore: Option<Vec<String>>,
    ) -> Result<InitializeSummary> {
        let ignore = ignore.unwrap_or_else(|| self.inner.config.ignore.clone());
        let filter = PathFilter::new(&ignore)?;

        let previous_watchers = {
            let mut state = self.inner.lock_state();
            if self.phase() == Phase::Indexing {
                return Err(IndexerError::Busy);
            }
            self.inner.phase.send_replace(Phase::Indexing);
            self.inner.progress.set_active(true);
            state.queue.clear();
            state.retracted.clear();
            state.roots.clear();
            std::mem::take(&mut state.watchers)
        };

        for mut watcher in previous_watchers {
            watcher.close();
        }
        self.inner.write_store().clear();

        let requested = roots.to_vec();
        let scan_filter = filter.clone();
        let scanned = tokio::task::spawn_blocking(move || scan_roots(&requested, scan_filter))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Root scan aborted: {}", e);
                Vec::new()
            });

        let mut accepted_roots = Vec::new();
        let mut files = Vec::new();
        let mut watchers = Vec::new();
        for (root, scan) in scanned {
            tracing::info!("Found {} PHP files under {}", scan.files.len(), root.display());
            files.extend(scan.files);

            // The watcher filters with the same ignore files the scan obeyed.
            if self.inner.config.watch {
                match self.watch_root(&root, filter.clone().with_rules(scan.rules)) {
                    Ok(watcher) => watchers.push(watcher),
                    Err(e) => tracing::warn!("Not watching {}: {}", root.display(), e),
                }
            }
            accepted_roots.push(root);
        }

        let summary = InitializeSummary {
            accepted_file_count: files.len(),
            root_count: accepted_roots.len(),
        };

        {
            let mut state = self.inner.lock_state();
            state.roots = accepted_roots;
            state.watchers = watchers;
            state.queue.extend(files);
            self.inner.progress.start(state.queue.len());
            self.inner.initialized.store(true, Ordering::Release);

            if state.queue.is_empty() {
                self.finish();
            } else {
                tokio::spawn(self.clone().run());
            }
        }

        tracing::info!(
            "Initialized {} roots, {} files queued",
            summary.root_count,
            summary.accepted_file_count
        );
        Ok(summary)
    }

    /// Queues `path` for (re-)analysis. Always accepted, even mid-run.
    pub fn notify_changed(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::debug!("Queued {}", path.display());

        let mut state = self.inner.lock_state();
        state.queue.push_back(path);
        self.inner.progress.enqueue(1);
        self.schedule(&state);
    }

    /// Retracts everything `path` contributed. Applied immediately rather
    /// than queued; changes for `path` still waiting in the queue are
    /// dropped, and an in-flight result for it is discarded when applied.
    pub fn notify_removed(&self, path: &Path) {
        tracing::debug!("Removed {}", path.display());

        let mut state = self.inner.lock_state();
        let queued = state.queue.len();
        state.queue.retain(|pending| pending != path);
        self.inner.progress.retract(queued - state.queue.len());
        state.retracted.insert(path.to_path_buf());

        // Taken under the state lock so `apply` cannot interleave.
        self.inner.write_store().remove_file(&path.to_string_lossy());
    }

    /// Resolves once the queue is empty and no batch is in flight.
    pub async fn wait_until_idle(&self) {
        let mut phase = self.inner.phase.subscribe();
        let _ = phase.wait_for(|p| *p == Phase::Idle).await;
    }

    pub fn search_symbol(&self, fragment: &str) -> Result<Vec<SymbolSummary>> {
        let store = self.read_initialized()?;
        Ok(store
            .search(fragment, self.inner.config.search_limit)
            .iter()
            .map(SymbolSummary::from)
            .collect())
    }

    pub fn get_inheritance(&self, fqn: &str) -> Result<InheritanceInfo> {
        let store = self.read_initialized()?;
        Ok(InheritanceInfo {
            children: store.inheritors_of(fqn),
            implementors: store.implementors_of(fqn),
        })
    }

    pub fn get_usages(&self, fqn: &str) -> Result<Vec<String>> {
        Ok(self.read_initialized()?.usages_of(fqn))
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        Ok(self.read_initialized()?.get_stats())
    }

    /// Stops every watcher. Queued work still drains.
    pub fn close(&self) {
        let watchers = std::mem::take(&mut self.inner.lock_state().watchers);
        for mut watcher in watchers {
            watcher.close();
        }
    }

    fn read_initialized(&self) -> Result<RwLockReadGuard<'_, GraphStore>> {
        if !self.is_initialized() {
            return Err(IndexerError::NotInitialized);
        }
        Ok(self.inner.read_store())
    }

    fn watch_root(&self, root: &Path, filter: PathFilter) -> Result<RootWatcher> {
        let coordinator = Arc::downgrade(&self.inner);
        RootWatcher::start(
            root,
            filter,
            Duration::from_millis(self.inner.config.debounce_ms),
            move |event| forward_event(&coordinator, event),
        )
    }

    /// Starts a drain if none is running. Caller holds the state lock, which
    /// keeps the phase check and the transition atomic.
    fn schedule(&self, state: &MutexGuard<'_, CoordinatorState>) {
        if self.phase() == Phase::Idle && !state.queue.is_empty() {
            self.inner.phase.send_replace(Phase::Indexing);
            self.inner.progress.set_active(true);
            tokio::spawn(self.clone().run());
        }
    }

    fn finish(&self) {
        self.inner.progress.set_active(false);
        self.inner.phase.send_replace(Phase::Idle);
    }

    async fn run(self) {
        let batch_size = self.inner.config.batch_size.max(1);

        loop {
            let batch: Vec<PathBuf> = {
                let mut state = self.inner.lock_state();
                if state.queue.is_empty() {
                    self.finish();
                    return;
                }
                let take = batch_size.min(state.queue.len());
                state.retracted.clear();
                state.queue.drain(..take).collect()
            };

            tracing::debug!("Extracting batch of {} files", batch.len());
            let inner = self.inner.clone();
            let paths = batch.clone();
            let results = match tokio::task::spawn_blocking(move || {
                paths
                    .par_iter()
                    .map(|path| inner.extractor.extract_file(path))
                    .collect::<Vec<_>>()
            })
            .await
            {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!("Batch extraction aborted: {}", e);
                    batch
                        .iter()
                        .map(|path| ExtractionResult {
                            file_path: path.to_string_lossy().to_string(),
                            symbols: Vec::new(),
                            failure: Some(e.to_string()),
                        })
                        .collect()
                }
            };

            self.apply(batch.into_iter().zip(results));
            tokio::task::yield_now().await;
        }
    }

    /// Applies a batch in queue order. Lock order is state, then store.
    fn apply(&self, results: impl Iterator<Item = (PathBuf, ExtractionResult)>) {
        let state = self.inner.lock_state();
        let mut store = self.inner.write_store();

        for (path, result) in results {
            if state.retracted.contains(&path) {
                tracing::debug!("Dropping stale result for removed {}", result.file_path);
                self.inner.progress.retract(1);
                continue;
            }
            match &result.failure {
                Some(reason) => {
                    tracing::warn!("Skipping {}: {}", result.file_path, reason);
                    self.inner.progress.inc_error();
                    if !Path::new(&result.file_path).exists() {
                        store.remove_file(&result.file_path);
                        continue;
                    }
                }
                None => {
                    tracing::debug!(
                        "Indexed {} ({} symbols)",
                        result.file_path,
                        result.symbols.len()
                    );
                    self.inner.progress.inc(result.symbols.len());
                }
            }
            store.update_file(&result.file_path, result.symbols);
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_store(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn forward_event(coordinator: &Weak<Inner>, event: FileEvent) {
    let Some(inner) = coordinator.upgrade() else {
        return;
    };
    let coordinator = IndexCoordinator { inner };
    match event {
        FileEvent::Changed(path) => coordinator.notify_changed(path),
        FileEvent::Removed(path) => coordinator.notify_removed(&path),
    }
}

/// Canonicalizes and walks each root. Failed roots are logged and dropped.
fn scan_roots(roots: &[PathBuf], filter: PathFilter) -> Vec<(PathBuf, RootScan)> {
    let walker = FileWalker::new(filter);
    let mut scanned = Vec::new();

    for root in roots {
        let canonical = match std::fs::canonicalize(root) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!("Skipping root {}: {}", root.display(), e);
                continue;
            }
        };
        match walker.scan(&canonical) {
            Ok(scan) => scanned.push((canonical, scan)),
            Err(e) => tracing::warn!("Skipping root {}: {}", root.display(), e),
        }
    }

    scanned
}
