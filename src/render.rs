//! Rendering and content-classification contracts
//!
//! The core is agnostic to templating technology: engines implement
//! [`Renderer`] and register per extension. [`BinaryClassifier`] decides
//! whether a source file is byte-copied instead of rendered.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sitemap::{JsonMap, Resource};
use crate::util;

/// Failure returned by a renderer, carrying message and optional trace text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
    pub trace: Option<String>,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

/// A template engine for one or more file extensions.
///
/// `locals` are render-time variables, `options` are rendering controls
/// (layout selection and the like); both come from the resource's metadata
/// merged by the caller.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        resource: &Resource,
        locals: &JsonMap,
        options: &JsonMap,
    ) -> Result<String, RenderError>;
}

/// Extension-keyed set of registered renderers.
///
/// A resource is a template exactly when its source extension has an entry
/// here; template extensions are also what path derivation strips.
#[derive(Default)]
pub struct RendererRegistry {
    by_ext: RwLock<HashMap<String, Arc<dyn Renderer>>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for a dotted extension (".md").
    pub fn register(&self, ext: &str, renderer: Arc<dyn Renderer>) {
        let mut map = self
            .by_ext
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.insert(normalize_ext(ext), renderer);
    }

    /// Whether any renderer claims the extension.
    pub fn handles(&self, ext: &str) -> bool {
        if ext.is_empty() {
            return false;
        }
        let map = self.by_ext.read().unwrap_or_else(PoisonError::into_inner);
        map.contains_key(&normalize_ext(ext))
    }

    pub fn get(&self, ext: &str) -> Option<Arc<dyn Renderer>> {
        let map = self.by_ext.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&normalize_ext(ext)).cloned()
    }

    /// All registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let map = self.by_ext.read().unwrap_or_else(PoisonError::into_inner);
        let mut exts: Vec<String> = map.keys().cloned().collect();
        exts.sort();
        exts
    }
}

fn normalize_ext(ext: &str) -> String {
    let ext = ext.to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Decides whether a source file should be byte-copied rather than rendered.
pub trait BinaryClassifier: Send + Sync {
    fn is_binary(&self, path: &Path) -> bool;
}

/// Default classifier: extension MIME lookup first, then a scan of the
/// first 4 KiB for control bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl ContentSniffer {
    pub fn new() -> Self {
        Self
    }
}

impl BinaryClassifier for ContentSniffer {
    fn is_binary(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        let ext = util::path_ext(&name).to_ascii_lowercase();

        // Gzipped SVG is the one text-mime extension that is really binary.
        if ext == ".svgz" {
            return true;
        }

        if let Some(mime) = util::mime_type(&ext) {
            return !util::nonbinary_mime(mime);
        }

        file_contains_binary_bytes(path)
    }
}

fn file_contains_binary_bytes(path: &Path) -> bool {
    const BINARY_BYTES: [u8; 25] = [
        0, 1, 2, 3, 4, 5, 6, 11, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 28, 29, 30,
        31,
    ];

    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };

    let mut buf = Vec::with_capacity(4096);
    if file.take(4096).read_to_end(&mut buf).is_err() {
        return false;
    }

    buf.iter().any(|b| BINARY_BYTES.contains(b))
}
