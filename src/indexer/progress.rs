use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;

/// Shared counters describing the coordinator's work since the last
/// `initialize`. Every applied store update bumps `files_processed` once.
#[derive(Clone)]
pub struct IndexingProgress {
    inner: Arc<Inner>,
}

struct Inner {
    files_queued: AtomicUsize,
    files_processed: AtomicUsize,
    symbols_extracted: AtomicUsize,
    errors: AtomicUsize,
    is_active: AtomicBool,
    started_at: Mutex<Option<Instant>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub is_active: bool,
    pub files_queued: usize,
    pub files_processed: usize,
    pub symbols_extracted: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
    pub progress_pct: f64,
}

impl IndexingProgress {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                files_queued: AtomicUsize::new(0),
                files_processed: AtomicUsize::new(0),
                symbols_extracted: AtomicUsize::new(0),
                errors: AtomicUsize::new(0),
                is_active: AtomicBool::new(false),
                started_at: Mutex::new(None),
            }),
        }
    }

    /// Resets every counter; called when the index is rebuilt from scratch.
    pub fn start(&self, queued: usize) {
        self.inner.files_queued.store(queued, Ordering::Release);
        self.inner.files_processed.store(0, Ordering::Release);
        self.inner.symbols_extracted.store(0, Ordering::Release);
        self.inner.errors.store(0, Ordering::Release);
        *self
            .inner
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn enqueue(&self, count: usize) {
        self.inner.files_queued.fetch_add(count, Ordering::Relaxed);
    }

    /// Withdraws queued work that will never be processed.
    pub fn retract(&self, count: usize) {
        let _ = self.inner.files_queued.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |queued| Some(queued.saturating_sub(count)),
        );
    }

    pub fn inc(&self, symbols_count: usize) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .symbols_extracted
            .fetch_add(symbols_count, Ordering::Relaxed);
    }

    pub fn inc_error(&self) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_active(&self, active: bool) {
        self.inner.is_active.store(active, Ordering::Release);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let is_active = self.inner.is_active.load(Ordering::Acquire);
        let files_queued = self.inner.files_queued.load(Ordering::Acquire);
        let files_processed = self.inner.files_processed.load(Ordering::Acquire);
        let symbols_extracted = self.inner.symbols_extracted.load(Ordering::Acquire);
        let errors = self.inner.errors.load(Ordering::Acquire);

        let elapsed_ms = self
            .inner
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let progress_pct = if files_queued > 0 {
            (files_processed as f64 / files_queued as f64) * 100.0
        } else {
            0.0
        };

        ProgressSnapshot {
            is_active,
            files_queued,
            files_processed,
            symbols_extracted,
            errors,
            elapsed_ms,
            progress_pct,
        }
    }
}

impl Default for IndexingProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let progress = IndexingProgress::new();
        progress.start(4);
        progress.inc(3);
        progress.inc(0);
        progress.inc_error();
        progress.enqueue(1);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_queued, 5);
        assert_eq!(snapshot.files_processed, 3);
        assert_eq!(snapshot.symbols_extracted, 3);
        assert_eq!(snapshot.errors, 1);
        assert!((snapshot.progress_pct - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_start_resets() {
        let progress = IndexingProgress::new();
        progress.start(2);
        progress.inc(5);
        progress.start(1);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_processed, 0);
        assert_eq!(snapshot.symbols_extracted, 0);
        assert_eq!(snapshot.files_queued, 1);
    }

    #[test]
    fn test_retract_saturates() {
        let progress = IndexingProgress::new();
        progress.start(3);
        progress.retract(1);
        assert_eq!(progress.snapshot().files_queued, 2);

        progress.retract(10);
        assert_eq!(progress.snapshot().files_queued, 0);
    }
}
