//! The site aggregate
//!
//! Owns the config, watched sources, resource store, renderer registry, and
//! binary classifier, and wires watcher notifications to store
//! invalidation. There is no ambient global state: every consumer receives
//! this aggregate (or one of its parts) by handle.

use std::sync::{Arc, Weak};

use crate::config::Config;
use crate::error::SitemillResult;
use crate::render::{BinaryClassifier, ContentSniffer, Renderer, RendererRegistry};
use crate::sitemap::{Metadata, OnDisk, Proxies, ProxyDescriptor, Store, DEFAULT_PRIORITY};
use crate::sources::{
    DirOptions, IgnoreScope, Matcher, SourceKind, Sources, SourcesOptions,
};

/// How the site is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One-shot build: polling only, no background watch
    Build,
    /// Interactive preview: push-based observation unless disabled
    Server,
}

/// File names every watcher ignores regardless of configuration.
const DEFAULT_IGNORES: &[(&str, &str)] = &[
    ("tilde_files", "*~"),
    ("emacs_files", ".#*"),
    ("emacs_lock_files", "\\#*"),
    ("ds_store", ".DS_Store"),
    ("git_dir", ".git/"),
    ("git_ignore", ".gitignore"),
    ("git_modules", ".gitmodules"),
];

/// An assembled site: sources, pipeline, and rendering collaborators.
pub struct Site {
    config: Config,
    mode: Mode,
    sources: Arc<Sources>,
    store: Arc<Store>,
    renderers: Arc<RendererRegistry>,
    classifier: Arc<dyn BinaryClassifier>,
    proxies: Arc<Proxies>,
}

impl Site {
    /// Assemble a site with the default binary classifier.
    pub fn new(config: Config, mode: Mode) -> SitemillResult<Arc<Self>> {
        Self::with_classifier(config, mode, Arc::new(ContentSniffer::new()))
    }

    /// Assemble a site with a custom binary classifier.
    pub fn with_classifier(
        config: Config,
        mode: Mode,
        classifier: Arc<dyn BinaryClassifier>,
    ) -> SitemillResult<Arc<Self>> {
        let renderers = Arc::new(RendererRegistry::new());

        let sources = Sources::new(SourcesOptions {
            disable_watcher: mode == Mode::Build || config.watcher.disable,
            force_polling: config.watcher.force_polling,
            latency: config.watcher_latency(),
            listener_factory: None,
        });

        for (name, pattern) in DEFAULT_IGNORES {
            sources.ignore(name, IgnoreScope::All, Matcher::pattern(pattern)?);
        }

        let store = Arc::new(Store::new(Arc::clone(&renderers)));
        let proxies = Arc::new(Proxies::new());

        store.register(
            "on_disk",
            Arc::new(OnDisk::new(Arc::clone(&sources), Arc::clone(&renderers))),
            DEFAULT_PRIORITY,
        );
        store.register(
            "proxies",
            Arc::clone(&proxies) as Arc<dyn crate::sitemap::Manipulator>,
            DEFAULT_PRIORITY,
        );

        // Any observed file change or deletion stales the pipeline; the
        // next read recomputes.
        let weak: Weak<Store> = Arc::downgrade(&store);
        sources.changed(Arc::new(move |_file| {
            if let Some(store) = weak.upgrade() {
                store.invalidate("file changed");
            }
        }));
        let weak: Weak<Store> = Arc::downgrade(&store);
        sources.deleted(Arc::new(move |_file| {
            if let Some(store) = weak.upgrade() {
                store.invalidate("file deleted");
            }
        }));

        sources.watch(SourceKind::Source, &config.source, DirOptions::default());

        Ok(Arc::new(Self {
            config,
            mode,
            sources,
            store,
            renderers,
            classifier,
            proxies,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sources(&self) -> &Arc<Sources> {
        &self.sources
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn renderers(&self) -> &Arc<RendererRegistry> {
        &self.renderers
    }

    pub fn classifier(&self) -> &Arc<dyn BinaryClassifier> {
        &self.classifier
    }

    /// Register a template engine for an extension. Changes which paths
    /// count as templates, so the pipeline is staled.
    pub fn register_renderer(&self, ext: &str, renderer: Arc<dyn Renderer>) {
        self.renderers.register(ext, renderer);
        self.store.invalidate("renderer registered");
    }

    /// Declare a proxy page.
    pub fn proxy(&self, path: &str, target: &str, metadata: Metadata) -> SitemillResult<()> {
        let descriptor = ProxyDescriptor::new(path, target, metadata)?;
        self.proxies.add(descriptor);
        self.store.invalidate("proxy declared");
        Ok(())
    }

    /// Hide resources matching an exact path or glob from the sitemap.
    pub fn ignore(&self, pattern: &str) -> SitemillResult<()> {
        self.store.ignore_path(pattern)
    }

    /// Start observing sources (server mode) and catch up on disk state.
    pub fn start(&self) -> SitemillResult<()> {
        self.sources.start()?;
        self.sources.find_new_files();
        Ok(())
    }

    /// Stop all file observation.
    pub fn stop(&self) {
        self.sources.stop();
    }
}
