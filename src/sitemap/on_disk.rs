//! On-disk injection stage
//!
//! Appends one resource per tracked source file, with template extensions
//! stripped from the addressable path. Layout and partial files never
//! belong in the sitemap.

use std::sync::Arc;

use crate::render::RendererRegistry;
use crate::sitemap::store::{file_to_path, Manipulator};
use crate::sitemap::Resource;
use crate::sources::{SourceFile, SourceKind, Sources};

/// Injects the watched `Source` file set into the resource list.
pub struct OnDisk {
    sources: Arc<Sources>,
    renderers: Arc<RendererRegistry>,
}

impl OnDisk {
    pub fn new(sources: Arc<Sources>, renderers: Arc<RendererRegistry>) -> Self {
        Self { sources, renderers }
    }

    /// Layout machinery and partials render inside other pages, never as
    /// addressable units of their own.
    fn hidden_from_sitemap(file: &SourceFile) -> bool {
        let mut components = file.relative_path.components().peekable();
        if let Some(first) = components.peek() {
            if first.as_os_str() == "layouts" {
                return true;
            }
        }
        file.relative_path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('_'))
    }
}

impl Manipulator for OnDisk {
    fn manipulate(&self, mut resources: Vec<Resource>) -> Vec<Resource> {
        let mut files = self.sources.files_of_kind(SourceKind::Source);
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        for file in files {
            if Self::hidden_from_sitemap(&file) {
                continue;
            }
            let path = file_to_path(&self.renderers, &file);
            resources.push(Resource::from_source(&path, file));
        }

        resources
    }
}
