//! Build materializer
//!
//! Drives the pipeline to a finished list, renders or copies every
//! resource into the destination tree with content diffing (identical
//! content is never rewritten), and removes stale files afterwards.
//! Stylesheets render first, then one extra source rescan and pipeline
//! recompute runs: downstream generators inspect the partially built tree
//! and may add resources.

mod diff;
mod events;

pub use events::{BuildEvent, BuildEventKind, BuildEventSink, NoopEventSink};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use serde_json::{json, Value};

use crate::error::{SitemillError, SitemillResult};
use crate::site::Site;
use crate::sitemap::{JsonMap, Resource};
use crate::util;

/// Render order: images and fonts, then scripts and stylesheets, then
/// everything else. Unlisted extensions sort last.
const SORT_ORDER: [&str; 14] = [
    ".png", ".jpeg", ".jpg", ".gif", ".bmp", ".svg", ".svgz", ".ico", ".woff", ".otf", ".ttf",
    ".eot", ".js", ".css",
];

const STYLESHEET_EXT: &str = ".css";

/// Dotfiles spared from cleanup.
const CLEAN_DOTFILE_ALLOWLIST: [&str; 2] = [".htaccess", ".htpasswd"];

/// Extensions rendered without a layout unless one is set explicitly.
const NO_LAYOUT_EXTS: [&str; 4] = [".js", ".json", ".css", ".txt"];

/// Options for one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Restrict output to destination paths matching this glob
    pub glob: Option<String>,
    /// Remove destination files the pipeline no longer produces
    pub clean: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            glob: None,
            clean: true,
        }
    }
}

/// Accumulated outcomes of a build run.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub identical: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
}

impl BuildResult {
    /// Overall success: no resource produced an error.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Materializes the resource list onto the destination directory.
pub struct Builder {
    site: Arc<Site>,
    build_dir: PathBuf,
    cleaning: bool,
    glob: Option<GlobMatcher>,
    sinks: Vec<Arc<dyn BuildEventSink>>,
    to_clean: BTreeSet<PathBuf>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("build_dir", &self.build_dir)
            .field("cleaning", &self.cleaning)
            .field("to_clean", &self.to_clean)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder. Fails fast if the destination directory is an
    /// ancestor of (or equal to) the source directory.
    pub fn new(site: Arc<Site>, options: BuildOptions) -> SitemillResult<Self> {
        let source_dir = util::absolutize(&site.config().source);
        let build_dir = util::absolutize(&site.config().build_dir);

        if source_dir.starts_with(&build_dir) {
            return Err(SitemillError::DestinationContainsSource {
                build_dir,
                source_dir,
            });
        }

        let glob = match &options.glob {
            Some(pattern) => Some(
                Glob::new(pattern)
                    .map_err(|e| SitemillError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?
                    .compile_matcher(),
            ),
            None => None,
        };

        Ok(Self {
            site,
            build_dir,
            cleaning: options.clean,
            glob,
            sinks: Vec::new(),
            to_clean: BTreeSet::new(),
        })
    }

    /// Subscribe an observer to build events.
    pub fn add_sink(&mut self, sink: Arc<dyn BuildEventSink>) {
        self.sinks.push(sink);
    }

    /// Run the build. Per-resource failures are recorded and reported but
    /// never stop the remaining resources.
    pub fn run(&mut self) -> BuildResult {
        let mut result = BuildResult::default();

        for sink in &self.sinks {
            sink.before_build();
        }

        // The stylesheet pre-pass needs a populated store; a cold site has
        // never scanned its sources.
        self.site.sources().find_new_files();
        self.site.store().ensure_updated();

        if self.cleaning {
            self.queue_current_paths();
        }

        self.prerender_stylesheets(&mut result);
        self.output_files(&mut result);

        if self.cleaning {
            self.clean(&mut result);
        }

        for sink in &self.sinks {
            sink.after_build(&result);
        }

        result
    }

    /// Render stylesheets ahead of everything else, then give generators
    /// that scanned the half-built tree a chance to add resources.
    fn prerender_stylesheets(&mut self, result: &mut BuildResult) {
        let stylesheets: Vec<Resource> = self
            .site
            .store()
            .resources(false)
            .into_iter()
            .filter(|r| r.ext() == STYLESHEET_EXT)
            .collect();

        for resource in &stylesheets {
            self.output_resource(resource, result);
        }

        self.site.sources().find_new_files();
        self.site.store().ensure_updated();
    }

    fn output_files(&mut self, result: &mut BuildResult) {
        let mut remaining: Vec<(usize, Resource)> = self
            .site
            .store()
            .resources(false)
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.ext() != STYLESHEET_EXT)
            .collect();

        // Stable order: extension priority first, original list order on
        // ties.
        remaining.sort_by_key(|(index, r)| (sort_index(r.ext()), *index));

        for (_, resource) in remaining {
            if let Some(glob) = &self.glob {
                if !glob.is_match(Path::new(resource.destination_path())) {
                    continue;
                }
            }
            self.output_resource(&resource, result);
        }
    }

    fn output_resource(&mut self, resource: &Resource, result: &mut BuildResult) {
        let destination = resource.destination_path().replace("%20", " ");
        let output_file = self.build_dir.join(destination);

        match self.stage_and_export(resource, &output_file) {
            Ok((kind, message)) => {
                self.trigger(kind, output_file.clone(), message, result);
                if self.cleaning {
                    self.to_clean.remove(&output_file);
                }
            }
            Err(e) => {
                self.trigger(
                    BuildEventKind::Error,
                    output_file,
                    Some(e.to_string()),
                    result,
                );
            }
        }
    }

    fn stage_and_export(
        &self,
        resource: &Resource,
        output_file: &Path,
    ) -> SitemillResult<(BuildEventKind, Option<String>)> {
        let renderers = self.site.renderers();
        let classifier = self.site.classifier();

        // Proxies take their content (and binary-ness) from their target.
        let content_source = self.site.store().resolve_target(resource)?;

        if content_source.is_binary(renderers, classifier.as_ref()) {
            let Some(file) = content_source.source_file() else {
                return Err(SitemillError::NoContent {
                    path: resource.path().to_string(),
                });
            };
            let bytes = std::fs::read(&file.full_path)?;
            self.export(output_file, &bytes)
        } else {
            let text = self.render_text(resource, &content_source)?;
            self.export(output_file, text.as_bytes())
        }
    }

    /// Rendered text for a resource: the registered engine when one claims
    /// the source extension, the raw source bytes otherwise.
    fn render_text(&self, resource: &Resource, content_source: &Resource) -> SitemillResult<String> {
        let renderers = self.site.renderers();

        let source_ext = match content_source.source_file() {
            Some(file) => util::path_ext(&file.full_path.to_string_lossy()).to_string(),
            None => content_source.ext().to_string(),
        };

        if let Some(renderer) = renderers.get(&source_ext) {
            let (locals, options) = self.render_metadata(resource);
            renderer
                .render(content_source, &locals, &options)
                .map_err(|e| SitemillError::Render {
                    path: resource.destination_path().to_string(),
                    source: e,
                })
        } else if let Some(file) = content_source.source_file() {
            Ok(std::fs::read_to_string(&file.full_path)?)
        } else {
            Err(SitemillError::NoContent {
                path: resource.path().to_string(),
            })
        }
    }

    /// Locals and options handed to the engine, derived from the request
    /// resource's metadata.
    fn render_metadata(&self, resource: &Resource) -> (JsonMap, JsonMap) {
        let mut locals = resource.metadata().locals.clone();
        locals
            .entry("current_path".to_string())
            .or_insert_with(|| Value::String(resource.destination_path().to_string()));

        let mut options = resource.metadata().options.clone();
        if !options.contains_key("layout") && NO_LAYOUT_EXTS.contains(&resource.ext()) {
            options.insert("layout".to_string(), json!(false));
        }

        (locals, options)
    }

    /// Compare staged content against the existing destination file and
    /// write only when something changed.
    fn export(
        &self,
        output_file: &Path,
        content: &[u8],
    ) -> SitemillResult<(BuildEventKind, Option<String>)> {
        if !output_file.exists() {
            util::atomic_write(output_file, content)?;
            return Ok((BuildEventKind::Created, None));
        }

        let existing = std::fs::read(output_file)?;
        if util::content_hash(&existing) == util::content_hash(content) {
            return Ok((BuildEventKind::Identical, None));
        }

        let summary = match (std::str::from_utf8(&existing), std::str::from_utf8(content)) {
            (Ok(old), Ok(new)) => Some(diff::summarize(old, new)),
            _ => None,
        };

        util::atomic_write(output_file, content)?;
        Ok((BuildEventKind::Updated, summary))
    }

    /// Snapshot every existing destination file as a deletion candidate,
    /// sparing dot-paths except the allow-listed names.
    fn queue_current_paths(&mut self) {
        self.to_clean.clear();
        if !self.build_dir.exists() {
            return;
        }

        for path in util::all_files_under(&self.build_dir) {
            if self.is_clean_candidate(&path) {
                self.to_clean.insert(path);
            }
        }
    }

    fn is_clean_candidate(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.build_dir).unwrap_or(path);
        let has_dot_component = relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if !has_dot_component {
            return true;
        }
        path.file_name()
            .map(|name| CLEAN_DOTFILE_ALLOWLIST.iter().any(|a| name == *a))
            .unwrap_or(false)
    }

    /// Delete every file the current build did not produce.
    fn clean(&mut self, result: &mut BuildResult) {
        let stale: Vec<PathBuf> = std::mem::take(&mut self.to_clean).into_iter().collect();
        for path in stale {
            match std::fs::remove_file(&path) {
                Ok(()) => self.trigger(BuildEventKind::Deleted, path, None, result),
                Err(e) => self.trigger(
                    BuildEventKind::Error,
                    path,
                    Some(e.to_string()),
                    result,
                ),
            }
        }
    }

    fn trigger(
        &self,
        kind: BuildEventKind,
        path: PathBuf,
        message: Option<String>,
        result: &mut BuildResult,
    ) {
        match kind {
            BuildEventKind::Created => result.created.push(path.clone()),
            BuildEventKind::Updated => result.updated.push(path.clone()),
            BuildEventKind::Identical => result.identical.push(path.clone()),
            BuildEventKind::Deleted => result.deleted.push(path.clone()),
            BuildEventKind::Error => result
                .errors
                .push((path.clone(), message.clone().unwrap_or_default())),
        }

        let mut event = BuildEvent::new(kind, path);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        for sink in &self.sinks {
            sink.on_event(&event);
        }
    }
}

fn sort_index(ext: &str) -> usize {
    SORT_ORDER.iter().position(|e| *e == ext).unwrap_or(100)
}
