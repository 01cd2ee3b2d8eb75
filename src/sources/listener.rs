//! Push-based file observation
//!
//! The platform subscription is a capability behind [`ListenerFactory`] so
//! tests can swap in a deterministic fake. The default factory is backed by
//! `notify`, delivering debounced batches on a background thread.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{SitemillError, SitemillResult};

/// Coalesced set of raw file events, delivered once the debounce window
/// goes quiet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBatch {
    pub modified: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl FileBatch {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Modified and added paths; consumers treat both as updates.
    pub fn updated_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.modified.iter().chain(self.added.iter())
    }
}

/// Callback invoked with each delivered batch.
pub type BatchCallback = Arc<dyn Fn(FileBatch) + Send + Sync>;

/// Running subscription for one root. Dropping it must stop delivery.
pub trait ListenerHandle: Send {
    fn stop(&mut self);
}

/// Creates subscriptions; implemented by the `notify` backend and by
/// deterministic fakes in tests.
pub trait ListenerFactory: Send + Sync {
    fn listen(
        &self,
        root: &Path,
        latency: Duration,
        on_batch: BatchCallback,
    ) -> SitemillResult<Box<dyn ListenerHandle>>;
}

/// `notify`-backed factory; native events by default, `PollWatcher` when
/// polling is forced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyListenerFactory {
    pub force_polling: bool,
}

impl ListenerFactory for NotifyListenerFactory {
    fn listen(
        &self,
        root: &Path,
        latency: Duration,
        on_batch: BatchCallback,
    ) -> SitemillResult<Box<dyn ListenerHandle>> {
        let (tx, rx) = channel();
        let handler = move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        };

        let mut watcher: Box<dyn Watcher + Send> = if self.force_polling {
            let config = notify::Config::default().with_poll_interval(latency);
            Box::new(PollWatcher::new(handler, config).map_err(|e| watch_error(root, &e))?)
        } else {
            let config = notify::Config::default();
            Box::new(RecommendedWatcher::new(handler, config).map_err(|e| watch_error(root, &e))?)
        };
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| watch_error(root, &e))?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let thread = std::thread::spawn(move || {
            // The subscription lives on this thread for the listener's
            // whole lifetime.
            let _watcher = watcher;
            let mut pending = PendingBatch::new(latency);

            while thread_running.load(Ordering::SeqCst) {
                match rx.recv_timeout(Duration::from_millis(25)) {
                    Ok(event) => pending.absorb(&event),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                if let Some(batch) = pending.flush_if_quiet() {
                    on_batch(batch);
                }
            }
        });

        Ok(Box::new(NotifyListener {
            running,
            thread: Some(thread),
        }))
    }
}

fn watch_error(root: &Path, err: &notify::Error) -> SitemillError {
    SitemillError::Watch {
        path: root.to_path_buf(),
        message: err.to_string(),
    }
}

struct NotifyListener {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle for NotifyListener {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for NotifyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Debounce state: raw events accumulate here until the window goes quiet.
struct PendingBatch {
    latency: Duration,
    modified: BTreeSet<PathBuf>,
    added: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
    last_event: Option<Instant>,
}

impl PendingBatch {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            modified: BTreeSet::new(),
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            last_event: None,
        }
    }

    fn absorb(&mut self, event: &Event) {
        for path in &event.paths {
            match event.kind {
                EventKind::Remove(_) => {
                    self.modified.remove(path);
                    self.added.remove(path);
                    self.removed.insert(path.clone());
                }
                EventKind::Create(_) => {
                    self.removed.remove(path);
                    self.added.insert(path.clone());
                }
                _ => {
                    self.removed.remove(path);
                    if !self.added.contains(path) {
                        self.modified.insert(path.clone());
                    }
                }
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn flush_if_quiet(&mut self) -> Option<FileBatch> {
        let last = self.last_event?;
        if last.elapsed() < self.latency {
            return None;
        }

        self.last_event = None;
        let mut batch = FileBatch {
            modified: std::mem::take(&mut self.modified).into_iter().collect(),
            added: std::mem::take(&mut self.added).into_iter().collect(),
            removed: std::mem::take(&mut self.removed).into_iter().collect(),
        };

        // Editors often replace files with rename dances; trust the disk
        // over the event kind at flush time.
        let mut vanished: Vec<PathBuf> = Vec::new();
        batch.modified.retain(|p| {
            let exists = p.exists();
            if !exists {
                vanished.push(p.clone());
            }
            exists
        });
        batch.added.retain(|p| {
            let exists = p.exists();
            if !exists {
                vanished.push(p.clone());
            }
            exists
        });
        batch.removed.extend(vanished);
        batch.removed.sort();
        batch.removed.dedup();

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::tempdir;

    fn event(kind: EventKind, path: &Path) -> Event {
        let mut e = Event::new(kind);
        e.paths.push(path.to_path_buf());
        e
    }

    #[test]
    fn batch_coalesces_duplicate_events() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, "x").unwrap();

        let mut pending = PendingBatch::new(Duration::from_millis(0));
        pending.absorb(&event(EventKind::Modify(ModifyKind::Any), &file));
        pending.absorb(&event(EventKind::Modify(ModifyKind::Any), &file));

        let batch = pending.flush_if_quiet().unwrap();
        assert_eq!(batch.modified, vec![file]);
        assert!(batch.added.is_empty());
    }

    #[test]
    fn create_then_remove_reports_removed_only() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.html");

        let mut pending = PendingBatch::new(Duration::from_millis(0));
        pending.absorb(&event(EventKind::Create(CreateKind::File), &file));
        pending.absorb(&event(EventKind::Remove(RemoveKind::File), &file));

        let batch = pending.flush_if_quiet().unwrap();
        assert!(batch.modified.is_empty());
        assert!(batch.added.is_empty());
        assert_eq!(batch.removed, vec![file]);
    }

    #[test]
    fn missing_files_are_demoted_to_removed() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("phantom.html");
        // Never written: a modify event for a path that no longer exists.

        let mut pending = PendingBatch::new(Duration::from_millis(0));
        pending.absorb(&event(EventKind::Modify(ModifyKind::Any), &file));

        let batch = pending.flush_if_quiet().unwrap();
        assert!(batch.modified.is_empty());
        assert_eq!(batch.removed, vec![file]);
    }

    #[test]
    fn no_events_means_no_batch() {
        let mut pending = PendingBatch::new(Duration::from_millis(0));
        assert!(pending.flush_if_quiet().is_none());
    }

    #[test]
    fn flush_waits_for_quiet_window() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("slow.html");
        std::fs::write(&file, "x").unwrap();

        let mut pending = PendingBatch::new(Duration::from_millis(200));
        pending.absorb(&event(EventKind::Modify(ModifyKind::Any), &file));

        assert!(pending.flush_if_quiet().is_none());
    }
}
