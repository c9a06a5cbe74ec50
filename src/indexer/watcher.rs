use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{IndexerError, Result};
use crate::indexer::walker::PathFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Created or modified.
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Changed(path) | FileEvent::Removed(path) => path,
        }
    }
}

/// Debounced recursive watcher over one root.
///
/// Events are forwarded from the notify thread through a tokio channel to a
/// task that invokes the handler, so the handler always runs on the runtime.
pub struct RootWatcher {
    root: PathBuf,
    debouncer: Option<Debouncer<notify::RecommendedWatcher>>,
    forwarder: Option<JoinHandle<()>>,
}

impl RootWatcher {
    /// Must be called from within a tokio runtime.
    pub fn start<F>(root: &Path, filter: PathFilter, debounce: Duration, handler: F) -> Result<Self>
    where
        F: Fn(FileEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<FileEvent>();
        let events_root = root.to_path_buf();

        let mut debouncer = new_debouncer(
            debounce,
            move |res: std::result::Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    let mut seen = HashSet::new();
                    for event in events {
                        if !seen.insert(event.path.clone()) {
                            continue;
                        }
                        if let Some(file_event) = classify(&events_root, &filter, event.path) {
                            let _ = tx.send(file_event);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Watch error under {}: {}", events_root.display(), e);
                }
            },
        )
        .map_err(|e| IndexerError::Watcher(e.to_string()))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| IndexerError::Watcher(format!("{}: {}", root.display(), e)))?;

        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event);
            }
        });

        tracing::debug!("Watching {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            debouncer: Some(debouncer),
            forwarder: Some(forwarder),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_active(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Stops this watcher. Idempotent; other roots are unaffected.
    pub fn close(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if self.debouncer.take().is_some() {
            tracing::debug!("Stopped watching {}", self.root.display());
        }
    }
}

impl Drop for RootWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn classify(root: &Path, filter: &PathFilter, path: PathBuf) -> Option<FileEvent> {
    if !filter.accepts(root, &path) {
        return None;
    }
    if path.is_file() {
        Some(FileEvent::Changed(path))
    } else if !path.exists() {
        Some(FileEvent::Removed(path))
    } else {
        None
    }
}
