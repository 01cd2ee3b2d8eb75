//! Watched source trees
//!
//! [`Sources`] aggregates one or more watched directory roots, each tagged
//! with a logical [`SourceKind`], and delivers filtered per-file change and
//! deletion notifications. Build mode polls; server mode listens for
//! platform file events unless polling is forced.

mod dir;
mod listener;
mod matcher;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

pub use dir::{DirOptions, SourceDirectory};
pub use listener::{
    BatchCallback, FileBatch, ListenerFactory, ListenerHandle, NotifyListenerFactory,
};
pub use matcher::Matcher;

use crate::error::SitemillResult;

/// Logical type of a watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Source,
    Data,
    Locales,
    Config,
}

/// Immutable snapshot of one on-disk file tracked by a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the watched root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub full_path: PathBuf,
    /// The watched root this file belongs to
    pub directory: PathBuf,
    /// Logical type inherited from the root
    pub kind: SourceKind,
}

impl SourceFile {
    /// Relative path as a slash-normalized string.
    pub fn relative_path_str(&self) -> String {
        crate::util::normalize_path(&self.relative_path.to_string_lossy())
    }
}

/// Callback invoked with a changed or deleted file.
pub type FileCallback = Arc<dyn Fn(&SourceFile) + Send + Sync>;

/// Predicate over a file descriptor.
pub type FilePredicate = Box<dyn Fn(&SourceFile) -> bool + Send + Sync>;

/// Scope of an ignore rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreScope {
    /// Applies to every watched root
    All,
    /// Applies only to roots of one logical kind
    Kind(SourceKind),
}

struct IgnoreRule {
    name: String,
    scope: IgnoreScope,
    matcher: Matcher,
}

/// Construction options for [`Sources`].
pub struct SourcesOptions {
    /// Never start background watches (build mode)
    pub disable_watcher: bool,
    /// Use polling instead of native file events
    pub force_polling: bool,
    /// Debounce window for push batches
    pub latency: Duration,
    /// Listener backend; `None` selects the `notify` implementation
    pub listener_factory: Option<Arc<dyn ListenerFactory>>,
}

impl Default for SourcesOptions {
    fn default() -> Self {
        Self {
            disable_watcher: false,
            force_polling: false,
            latency: Duration::from_millis(100),
            listener_factory: None,
        }
    }
}

/// Aggregate over all watched directory roots.
pub struct Sources {
    disable_watcher: bool,
    latency: Duration,
    factory: Arc<dyn ListenerFactory>,
    directories: Mutex<Vec<Arc<SourceDirectory>>>,
    ignores: RwLock<Vec<IgnoreRule>>,
    on_change: Mutex<Vec<FileCallback>>,
    on_delete: Mutex<Vec<FileCallback>>,
    running: AtomicBool,
    update_count: AtomicU64,
    last_update_count: Mutex<Option<u64>>,
}

impl Sources {
    pub fn new(options: SourcesOptions) -> Arc<Self> {
        let factory = options.listener_factory.unwrap_or_else(|| {
            Arc::new(NotifyListenerFactory {
                force_polling: options.force_polling,
            })
        });

        Arc::new(Self {
            disable_watcher: options.disable_watcher,
            latency: options.latency,
            factory,
            directories: Mutex::new(Vec::new()),
            ignores: RwLock::new(Vec::new()),
            on_change: Mutex::new(Vec::new()),
            on_delete: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            update_count: AtomicU64::new(0),
            last_update_count: Mutex::new(None),
        })
    }

    /// Register a new root. If the watcher is already running the root is
    /// polled immediately.
    pub fn watch(
        self: &Arc<Self>,
        kind: SourceKind,
        path: &Path,
        options: DirOptions,
    ) -> Arc<SourceDirectory> {
        let directory = SourceDirectory::new(
            Arc::downgrade(self),
            kind,
            path,
            options,
            dir::WatchSettings {
                disable_watcher: self.disable_watcher,
                latency: self.latency,
                factory: Arc::clone(&self.factory),
            },
        );

        let parent = Arc::downgrade(self);
        directory.changed(Arc::new(move |file| {
            if let Some(sources) = parent.upgrade() {
                sources.did_change(file);
            }
        }));
        let parent = Arc::downgrade(self);
        directory.deleted(Arc::new(move |file| {
            if let Some(sources) = parent.upgrade() {
                sources.did_delete(file);
            }
        }));

        self.lock(&self.directories).push(Arc::clone(&directory));

        if self.running.load(Ordering::SeqCst) {
            directory.poll_once();
        }

        directory
    }

    /// Remove a root and stop its listener.
    pub fn unwatch(&self, directory: &Arc<SourceDirectory>) {
        self.lock(&self.directories)
            .retain(|d| !Arc::ptr_eq(d, directory));
        directory.stop_listener();
        self.bump_count();
    }

    /// Register a named ignore rule. Matches suppress propagation for every
    /// current and future root of matching scope. Re-registering a name
    /// replaces the previous rule.
    pub fn ignore(&self, name: &str, scope: IgnoreScope, matcher: Matcher) {
        {
            let mut ignores = self
                .ignores
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            ignores.retain(|r| r.name != name);
            ignores.push(IgnoreRule {
                name: name.to_string(),
                scope,
                matcher,
            });
        }

        self.bump_count();
        if self.running.load(Ordering::SeqCst) {
            self.find_new_files();
        }
    }

    /// Whether a file is suppressed by any registered ignore rule.
    pub fn globally_ignored(&self, file: &SourceFile) -> bool {
        let ignores = self.ignores.read().unwrap_or_else(PoisonError::into_inner);
        ignores.iter().any(|rule| {
            let in_scope = match rule.scope {
                IgnoreScope::All => true,
                IgnoreScope::Kind(kind) => kind == file.kind,
            };
            in_scope && rule.matcher.matches(file)
        })
    }

    /// Re-poll every root, but only if something changed since the last
    /// catch-up. Used by the builder between render passes.
    pub fn find_new_files(&self) {
        {
            let mut last = self
                .last_update_count
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let current = self.update_count.load(Ordering::SeqCst);
            if *last == Some(current) {
                return;
            }
            *last = Some(current);
        }

        for directory in self.snapshot_directories() {
            directory.poll_once();
        }
    }

    /// Start push observation on every root and mark the watcher running.
    pub fn start(&self) -> SitemillResult<()> {
        for directory in self.snapshot_directories() {
            directory.listen()?;
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop all listeners.
    pub fn stop(&self) {
        for directory in self.snapshot_directories() {
            directory.stop_listener();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// All tracked files across every root.
    pub fn files(&self) -> Vec<SourceFile> {
        self.snapshot_directories()
            .iter()
            .flat_map(|d| d.files())
            .collect()
    }

    /// All tracked files of one logical kind.
    pub fn files_of_kind(&self, kind: SourceKind) -> Vec<SourceFile> {
        self.snapshot_directories()
            .iter()
            .filter(|d| d.kind() == kind)
            .flat_map(|d| d.files())
            .collect()
    }

    /// Roots of one logical kind.
    pub fn by_kind(&self, kind: SourceKind) -> Vec<Arc<SourceDirectory>> {
        self.snapshot_directories()
            .into_iter()
            .filter(|d| d.kind() == kind)
            .collect()
    }

    /// Find a tracked file by kind and (absolute or root-relative) path.
    pub fn find(&self, kind: SourceKind, path: &Path) -> Option<SourceFile> {
        self.snapshot_directories()
            .iter()
            .filter(|d| d.kind() == kind)
            .find_map(|d| d.find(path))
    }

    pub fn exists(&self, kind: SourceKind, path: &Path) -> bool {
        self.find(kind, path).is_some()
    }

    /// Register a change callback on the aggregate.
    pub fn changed(&self, callback: FileCallback) {
        self.lock(&self.on_change).push(callback);
    }

    /// Register a deletion callback on the aggregate.
    pub fn deleted(&self, callback: FileCallback) {
        self.lock(&self.on_delete).push(callback);
    }

    /// Monotonic counter bumped on every observed change.
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::SeqCst)
    }

    fn did_change(&self, file: &SourceFile) {
        self.bump_count();
        let callbacks: Vec<FileCallback> = self.lock(&self.on_change).clone();
        for callback in callbacks {
            callback(file);
        }
    }

    fn did_delete(&self, file: &SourceFile) {
        self.bump_count();
        let callbacks: Vec<FileCallback> = self.lock(&self.on_delete).clone();
        for callback in callbacks {
            callback(file);
        }
    }

    fn bump_count(&self) {
        self.update_count.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot_directories(&self) -> Vec<Arc<SourceDirectory>> {
        self.lock(&self.directories).clone()
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
