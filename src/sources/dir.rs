//! A single watched directory root
//!
//! Tracks the current file set for one (root, kind) pair and announces
//! per-file changes and deletions. A missing root is simply empty; push
//! observation is deferred until a poll first sees the root exist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use crate::error::SitemillResult;
use crate::sources::listener::{BatchCallback, FileBatch, ListenerFactory, ListenerHandle};
use crate::sources::{FileCallback, FilePredicate, SourceFile, SourceKind, Sources};
use crate::util;

/// Per-directory options supplied at `watch` time.
#[derive(Default)]
pub struct DirOptions {
    /// Custom validity predicate; files failing it are never tracked.
    pub validator: Option<FilePredicate>,
    /// Directory-local ignore predicate.
    pub ignored: Option<FilePredicate>,
}

/// Watch-mode settings inherited from the owning [`Sources`].
pub(crate) struct WatchSettings {
    pub disable_watcher: bool,
    pub latency: Duration,
    pub factory: Arc<dyn ListenerFactory>,
}

struct DirState {
    directory: PathBuf,
    files: HashMap<PathBuf, SourceFile>,
    waiting_for_existence: bool,
}

/// One watched directory root.
pub struct SourceDirectory {
    kind: SourceKind,
    parent: Weak<Sources>,
    validator: Option<FilePredicate>,
    local_ignore: Option<FilePredicate>,
    disable_watcher: bool,
    latency: Duration,
    factory: Arc<dyn ListenerFactory>,
    state: Mutex<DirState>,
    listener: Mutex<Option<Box<dyn ListenerHandle>>>,
    on_change: Mutex<Vec<FileCallback>>,
    on_delete: Mutex<Vec<FileCallback>>,
}

impl SourceDirectory {
    pub(crate) fn new(
        parent: Weak<Sources>,
        kind: SourceKind,
        directory: &Path,
        options: DirOptions,
        watch: WatchSettings,
    ) -> Arc<Self> {
        let directory = util::absolutize(directory);
        let waiting_for_existence = !directory.exists();

        Arc::new(Self {
            kind,
            parent,
            validator: options.validator,
            local_ignore: options.ignored,
            disable_watcher: watch.disable_watcher,
            latency: watch.latency,
            factory: watch.factory,
            state: Mutex::new(DirState {
                directory,
                files: HashMap::new(),
                waiting_for_existence,
            }),
            listener: Mutex::new(None),
            on_change: Mutex::new(Vec::new()),
            on_delete: Mutex::new(Vec::new()),
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The current root path.
    pub fn path(&self) -> PathBuf {
        self.lock_state().directory.clone()
    }

    /// All currently tracked files, sorted by relative path.
    pub fn files(&self) -> Vec<SourceFile> {
        let state = self.lock_state();
        let mut files: Vec<SourceFile> = state.files.values().cloned().collect();
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        files
    }

    /// Look up a tracked file by absolute or root-relative path.
    pub fn find(&self, path: &Path) -> Option<SourceFile> {
        let state = self.lock_state();
        let full = if path.is_absolute() {
            if !path.starts_with(&state.directory) {
                return None;
            }
            path.to_path_buf()
        } else {
            state.directory.join(path)
        };
        state.files.get(&full).cloned()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// Register a change callback; callbacks run in registration order.
    pub fn changed(&self, callback: FileCallback) {
        self.lock(&self.on_change).push(callback);
    }

    /// Register a deletion callback; callbacks run in registration order.
    pub fn deleted(&self, callback: FileCallback) {
        self.lock(&self.on_delete).push(callback);
    }

    /// Synchronous full re-scan.
    ///
    /// Every existing valid file is (re-)announced as changed; previously
    /// known files no longer on disk are announced as deleted. No dirty
    /// detection happens here: de-duplication is the consumer's job.
    pub fn poll_once(self: &Arc<Self>) {
        let mut changed = Vec::new();
        let mut deleted = Vec::new();

        {
            let mut state = self.lock_state();
            let directory = state.directory.clone();
            let on_disk = util::all_files_under(&directory);

            let mut survivors: std::collections::HashSet<PathBuf> =
                std::collections::HashSet::with_capacity(on_disk.len());

            for path in on_disk {
                survivors.insert(path.clone());
                let descriptor = self.to_source_file(&directory, &path);
                if self.valid(&descriptor) {
                    state.files.insert(path, descriptor.clone());
                    changed.push(descriptor);
                }
            }

            let known: Vec<PathBuf> = state.files.keys().cloned().collect();
            for path in known {
                if survivors.contains(&path) {
                    continue;
                }
                let descriptor = state.files[&path].clone();
                if self.valid(&descriptor) {
                    state.files.remove(&path);
                    deleted.push(descriptor);
                }
            }
        }

        for descriptor in &changed {
            self.notify_change(descriptor);
        }
        for descriptor in &deleted {
            self.notify_delete(descriptor);
        }

        let start_listening = {
            let mut state = self.lock_state();
            if state.waiting_for_existence && state.directory.exists() {
                state.waiting_for_existence = false;
                true
            } else {
                false
            }
        };
        if start_listening {
            let _ = self.listen();
        }
    }

    /// Start push observation, unless disabled or the root does not exist
    /// yet (a later poll will start it once the root appears).
    pub fn listen(self: &Arc<Self>) -> SitemillResult<()> {
        if self.disable_watcher {
            return Ok(());
        }

        let directory = {
            let state = self.lock_state();
            if state.waiting_for_existence {
                return Ok(());
            }
            state.directory.clone()
        };

        let mut guard = self.lock(&self.listener);
        if guard.is_some() {
            return Ok(());
        }

        let me = Arc::downgrade(self);
        let callback: BatchCallback = Arc::new(move |batch| {
            if let Some(dir) = me.upgrade() {
                dir.on_listener_change(&batch);
            }
        });

        let handle = self.factory.listen(&directory, self.latency, callback)?;
        *guard = Some(handle);
        Ok(())
    }

    /// Stop push observation if it is running.
    pub fn stop_listener(&self) {
        if let Some(mut handle) = self.lock(&self.listener).take() {
            handle.stop();
        }
    }

    /// Point this root somewhere else: tear down the watch, announce a
    /// deletion for every previously known file, then re-poll (and
    /// re-listen) against the new root.
    pub fn update_path(self: &Arc<Self>, directory: &Path) -> SitemillResult<()> {
        self.stop_listener();

        let mut previous: Vec<SourceFile> = {
            let mut state = self.lock_state();
            let files = state.files.drain().map(|(_, v)| v).collect();
            state.directory = util::absolutize(directory);
            state.waiting_for_existence = !state.directory.exists();
            files
        };
        previous.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        for descriptor in &previous {
            self.notify_delete(descriptor);
        }

        self.poll_once();
        self.listen()
    }

    /// Apply one push-delivered batch: modified and added become per-file
    /// updates, removed becomes deletions.
    pub(crate) fn on_listener_change(self: &Arc<Self>, batch: &FileBatch) {
        for path in batch.updated_paths() {
            self.update_file(path);
        }
        for path in &batch.removed {
            self.remove_file(path);
        }
    }

    fn update_file(self: &Arc<Self>, path: &Path) {
        let announced = {
            let mut state = self.lock_state();
            let directory = state.directory.clone();
            let Some(full) = resolve_under(&directory, path) else {
                return;
            };
            let descriptor = self.to_source_file(&directory, &full);
            if !self.valid(&descriptor) {
                None
            } else {
                state.files.insert(full, descriptor.clone());
                Some(descriptor)
            }
        };

        if let Some(descriptor) = announced {
            self.notify_change(&descriptor);
        }
    }

    fn remove_file(self: &Arc<Self>, path: &Path) {
        let announced = {
            let mut state = self.lock_state();
            let Some(full) = resolve_under(&state.directory, path) else {
                return;
            };
            let Some(descriptor) = state.files.get(&full).cloned() else {
                return;
            };
            if !self.valid(&descriptor) {
                None
            } else {
                state.files.remove(&full);
                Some(descriptor)
            }
        };

        if let Some(descriptor) = announced {
            self.notify_delete(&descriptor);
        }
    }

    fn valid(&self, file: &SourceFile) -> bool {
        if let Some(validator) = &self.validator {
            if !validator(file) {
                return false;
            }
        }
        if let Some(parent) = self.parent.upgrade() {
            if parent.globally_ignored(file) {
                return false;
            }
        }
        if let Some(ignored) = &self.local_ignore {
            if ignored(file) {
                return false;
            }
        }
        true
    }

    fn to_source_file(&self, directory: &Path, full_path: &Path) -> SourceFile {
        let relative_path = full_path
            .strip_prefix(directory)
            .unwrap_or(full_path)
            .to_path_buf();
        SourceFile {
            relative_path,
            full_path: full_path.to_path_buf(),
            directory: directory.to_path_buf(),
            kind: self.kind,
        }
    }

    fn notify_change(&self, descriptor: &SourceFile) {
        let callbacks: Vec<FileCallback> = self.lock(&self.on_change).clone();
        for callback in callbacks {
            callback(descriptor);
        }
    }

    fn notify_delete(&self, descriptor: &SourceFile) {
        let callbacks: Vec<FileCallback> = self.lock(&self.on_delete).clone();
        for callback in callbacks {
            callback(descriptor);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DirState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve an event path to the tracked absolute path under `directory`,
/// falling back to the canonicalized root for symlinked watch roots.
fn resolve_under(directory: &Path, path: &Path) -> Option<PathBuf> {
    if !path.is_absolute() {
        return Some(directory.join(path));
    }
    if path.starts_with(directory) {
        return Some(path.to_path_buf());
    }
    let canonical = directory.canonicalize().ok()?;
    let relative = path.strip_prefix(&canonical).ok()?;
    Some(directory.join(relative))
}
