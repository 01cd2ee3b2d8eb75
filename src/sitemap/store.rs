//! The resource pipeline
//!
//! [`Store`] owns the registered manipulators and lazily recomputes the
//! authoritative resource list: a dirty flag coalesces bursts of
//! invalidations into one recompute, which folds every manipulator in
//! (priority, registration order) over an initially empty list and then
//! rebuilds both lookup maps from the final list.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use globset::{Glob, GlobMatcher};

use crate::error::{SitemillError, SitemillResult};
use crate::render::RendererRegistry;
use crate::sitemap::resource::{addressable, Resource};
use crate::sources::SourceFile;
use crate::util;

/// Priority used when a manipulator has no ordering requirement.
pub const DEFAULT_PRIORITY: u32 = 50;

/// A registered transform stage: receives the full resource list and
/// returns a new one (possibly reordered, filtered, or extended).
///
/// Manipulators run while the store lock is held and must not call back
/// into the store; everything they need is captured at registration.
pub trait Manipulator: Send + Sync {
    fn manipulate(&self, resources: Vec<Resource>) -> Vec<Resource>;
}

/// Matcher for sitemap-level ignores, applied to addressable paths.
pub enum PathMatcher {
    Exact(String),
    Glob(GlobMatcher),
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl PathMatcher {
    /// Exact path, or a glob when the pattern contains glob characters.
    pub fn from_pattern(pattern: &str) -> SitemillResult<Self> {
        let normalized = addressable(pattern);
        if normalized.contains(['*', '?', '[']) {
            let glob = Glob::new(&normalized).map_err(|e| SitemillError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            Ok(Self::Glob(glob.compile_matcher()))
        } else {
            Ok(Self::Exact(normalized))
        }
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Box::new(f))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == path,
            Self::Glob(glob) => glob.is_match(path),
            Self::Predicate(f) => f(path),
        }
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "PathMatcher::Exact({p})"),
            Self::Glob(g) => write!(f, "PathMatcher::Glob({})", g.glob()),
            Self::Predicate(_) => write!(f, "PathMatcher::Predicate(..)"),
        }
    }
}

struct Registered {
    name: String,
    priority: u32,
    seq: u64,
    manipulator: Arc<dyn Manipulator>,
}

struct StoreInner {
    manipulators: Vec<Registered>,
    next_seq: u64,
    resources: Vec<Resource>,
    by_path: HashMap<String, Resource>,
    by_destination: HashMap<String, Resource>,
    dirty: bool,
    update_count: u64,
    ignores: Vec<PathMatcher>,
    not_ignored: Option<Vec<Resource>>,
}

/// Owner of the manipulator chain and the cached resource list.
///
/// All mutation and recompute is serialized behind one lock; readers see
/// either the fully prior or fully new list, never a partial one.
pub struct Store {
    renderers: Arc<RendererRegistry>,
    inner: Mutex<StoreInner>,
}

impl Store {
    pub fn new(renderers: Arc<RendererRegistry>) -> Self {
        Self {
            renderers,
            inner: Mutex::new(StoreInner {
                manipulators: Vec::new(),
                next_seq: 0,
                resources: Vec::new(),
                by_path: HashMap::new(),
                by_destination: HashMap::new(),
                dirty: true,
                update_count: 0,
                ignores: Vec::new(),
                not_ignored: None,
            }),
        }
    }

    /// Register a manipulator. The chain is stably re-sorted by
    /// (priority ascending, registration order ascending); the list is
    /// marked dirty but not recomputed eagerly.
    pub fn register(&self, name: &str, manipulator: Arc<dyn Manipulator>, priority: u32) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.manipulators.push(Registered {
            name: name.to_string(),
            priority,
            seq,
            manipulator,
        });
        inner.manipulators.sort_by_key(|r| (r.priority, r.seq));
        inner.dirty = true;
        inner.not_ignored = None;
    }

    /// Names of registered manipulators in execution order.
    pub fn manipulator_names(&self) -> Vec<String> {
        self.lock()
            .manipulators
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Mark the cached list stale. `reason` is diagnostic only.
    pub fn invalidate(&self, _reason: &str) {
        let mut inner = self.lock();
        inner.dirty = true;
        inner.not_ignored = None;
    }

    /// Recompute the resource list if anything invalidated it.
    pub fn ensure_updated(&self) {
        let mut inner = self.lock();
        self.ensure_updated_locked(&mut inner);
    }

    /// Number of recomputes performed so far. Increases only on an actual
    /// recompute, never on a mere invalidation.
    pub fn update_count(&self) -> u64 {
        self.lock().update_count
    }

    /// The current resource list. The default view excludes ignored
    /// resources and is cached until the list or ignore set changes.
    pub fn resources(&self, include_ignored: bool) -> Vec<Resource> {
        let mut inner = self.lock();
        self.ensure_updated_locked(&mut inner);

        if include_ignored {
            return inner.resources.clone();
        }

        if inner.not_ignored.is_none() {
            let filtered: Vec<Resource> = inner
                .resources
                .iter()
                .filter(|r| !resource_ignored(&inner.ignores, r))
                .cloned()
                .collect();
            inner.not_ignored = Some(filtered);
        }
        inner.not_ignored.clone().unwrap_or_default()
    }

    /// Find a resource by its source identity.
    pub fn find_by_path(&self, path: &str) -> Option<Resource> {
        let wanted = addressable(path);
        let mut inner = self.lock();
        self.ensure_updated_locked(&mut inner);
        inner.by_path.get(&wanted).cloned()
    }

    /// Find a resource by its output identity.
    pub fn find_by_destination_path(&self, path: &str) -> Option<Resource> {
        let wanted = addressable(path);
        let mut inner = self.lock();
        self.ensure_updated_locked(&mut inner);
        inner.by_destination.get(&wanted).cloned()
    }

    /// Add a sitemap-level ignore; matching resources disappear from the
    /// default list view.
    pub fn ignore(&self, matcher: PathMatcher) {
        let mut inner = self.lock();
        inner.ignores.push(matcher);
        inner.not_ignored = None;
    }

    /// Convenience: ignore by exact path or glob pattern.
    pub fn ignore_path(&self, pattern: &str) -> SitemillResult<()> {
        let matcher = PathMatcher::from_pattern(pattern)?;
        self.ignore(matcher);
        Ok(())
    }

    /// Whether a resource is hidden from the default list view.
    pub fn resource_ignored(&self, resource: &Resource) -> bool {
        let inner = self.lock();
        resource_ignored(&inner.ignores, resource)
    }

    /// Resolve a proxy to its target resource. Non-proxies resolve to
    /// themselves.
    pub fn resolve_target(&self, resource: &Resource) -> SitemillResult<Resource> {
        let Some(target) = resource.proxy_target() else {
            return Ok(resource.clone());
        };

        let mut inner = self.lock();
        self.ensure_updated_locked(&mut inner);

        match inner.by_path.get(target) {
            None => Err(SitemillError::UnresolvedProxyTarget {
                path: resource.path().to_string(),
                target: target.to_string(),
            }),
            Some(found) if found.is_proxy() => Err(SitemillError::ChainedProxy {
                path: resource.path().to_string(),
                target: target.to_string(),
            }),
            Some(found) => Ok(found.clone()),
        }
    }

    /// Addressable path for an on-disk file: relative path with template
    /// extensions stripped.
    pub fn file_to_path(&self, file: &SourceFile) -> String {
        file_to_path(&self.renderers, file)
    }

    /// Strip template extensions as long as a renderer claims them.
    pub fn extensionless_path(&self, path: &str) -> String {
        extensionless_path(&self.renderers, path)
    }

    fn ensure_updated_locked(&self, inner: &mut StoreInner) {
        if !inner.dirty {
            return;
        }
        inner.dirty = false;

        let manipulators: Vec<Arc<dyn Manipulator>> = inner
            .manipulators
            .iter()
            .map(|r| Arc::clone(&r.manipulator))
            .collect();

        let mut list: Vec<Resource> = Vec::new();
        for manipulator in manipulators {
            list = manipulator.manipulate(list);
        }

        inner.by_path.clear();
        inner.by_destination.clear();
        for resource in &list {
            // Later entries win on path collision.
            inner
                .by_path
                .insert(resource.path().to_string(), resource.clone());
            inner
                .by_destination
                .insert(resource.destination_path().to_string(), resource.clone());
        }

        inner.resources = list;
        inner.not_ignored = None;
        inner.update_count += 1;
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ignore check shared between the cached view and the public predicate:
/// the explicit flag, the addressable path, and (for non-proxies) the raw
/// source-relative path.
fn resource_ignored(ignores: &[PathMatcher], resource: &Resource) -> bool {
    if resource.explicitly_ignored() {
        return true;
    }
    if ignores.iter().any(|m| m.matches(resource.path())) {
        return true;
    }
    if !resource.is_proxy() {
        if let Some(file) = resource.source_file() {
            let raw = addressable(&file.relative_path_str());
            return ignores.iter().any(|m| m.matches(&raw));
        }
    }
    false
}

/// Addressable path for an on-disk file.
pub(crate) fn file_to_path(renderers: &RendererRegistry, file: &SourceFile) -> String {
    let relative = file.relative_path_str();
    let stripped = extensionless_path(renderers, &relative);
    addressable(&stripped)
}

pub(crate) fn extensionless_path(renderers: &RendererRegistry, path: &str) -> String {
    let mut path = path.to_string();
    loop {
        let ext = util::path_ext(&path);
        if ext.is_empty() || !renderers.handles(ext) {
            return path;
        }
        path = util::strip_ext(&path).to_string();
    }
}
