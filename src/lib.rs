//! Sitemill - static-site build core
//!
//! Sitemill turns a tree of source files plus programmatically declared
//! pages into a consistent, queryable set of addressable resources, then
//! materializes that set onto a destination directory, keeping it consistent
//! under continuous file-system change during interactive use.
//!
//! Three parts make up the core: [`sources`] watches directory roots and
//! delivers filtered per-file change and deletion notifications; [`sitemap`]
//! derives the authoritative resource list from a priority-ordered chain of
//! manipulators, exactly once per effective change; [`build`] renders or
//! copies every resource with content diffing and removes stale output.
//! Template engines plug in through the [`render`] contracts; [`site`] wires
//! everything together.

pub mod build;
pub mod config;
pub mod error;
pub mod render;
pub mod site;
pub mod sitemap;
pub mod sources;
pub mod util;

// Re-exports for convenience
pub use build::{
    BuildEvent, BuildEventKind, BuildEventSink, BuildOptions, BuildResult, Builder, NoopEventSink,
};
pub use config::{Config, WatcherConfig};
pub use error::{SitemillError, SitemillResult};
pub use render::{BinaryClassifier, ContentSniffer, RenderError, Renderer, RendererRegistry};
pub use site::{Mode, Site};
pub use sitemap::{Manipulator, Metadata, PathMatcher, Resource, ResourceKind, Store};
pub use sources::{
    DirOptions, IgnoreScope, Matcher, SourceDirectory, SourceFile, SourceKind, Sources,
    SourcesOptions,
};
