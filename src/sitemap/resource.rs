//! The addressable unit model
//!
//! A [`Resource`] is one addressable output unit: an on-disk page or asset,
//! a proxy to another resource, or an externally injected page. Resources
//! are produced fresh by manipulators on every pipeline recompute and never
//! mutated in place across rebuilds.

use serde_json::Value;

use crate::error::{SitemillError, SitemillResult};
use crate::render::{BinaryClassifier, RendererRegistry};
use crate::sources::SourceFile;
use crate::util;
use crate::Config;

/// JSON object map used for resource metadata.
pub type JsonMap = serde_json::Map<String, Value>;

/// Rendering controls, render-time variables, and page data for one
/// resource.
///
/// `options` steer rendering (layout selection and the like), `locals` are
/// variables exposed to the template, `page` is arbitrary structured data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub options: JsonMap,
    pub locals: JsonMap,
    pub page: JsonMap,
}

impl Metadata {
    /// Deep-merge `other` into self: nested maps merge recursively, scalar
    /// keys are overwritten, last write wins.
    pub fn merge(&mut self, other: &Metadata) {
        deep_merge(&mut self.options, &other.options);
        deep_merge(&mut self.locals, &other.locals);
        deep_merge(&mut self.page, &other.page);
    }
}

/// Recursive last-write-wins merge of JSON maps.
pub fn deep_merge(dest: &mut JsonMap, src: &JsonMap) {
    for (key, value) in src {
        match (dest.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Variant tag for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Backed by a tracked source file
    OnDisk,
    /// Content delegated to the resource at `target`
    Proxy { target: String },
    /// Declared programmatically, no disk backing
    Injected,
}

/// One addressable output unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    path: String,
    destination_path: String,
    source_file: Option<SourceFile>,
    metadata: Metadata,
    kind: ResourceKind,
    ignored: bool,
}

impl Resource {
    /// Resource backed by an on-disk source file.
    pub fn from_source(path: &str, source_file: SourceFile) -> Self {
        Self::build(path, Some(source_file), ResourceKind::OnDisk)
    }

    /// Externally injected resource with no disk backing.
    pub fn injected(path: &str) -> Self {
        Self::build(path, None, ResourceKind::Injected)
    }

    /// Proxy resource delegating content to `target`.
    ///
    /// Fails if the normalized target equals the resource's own path; a
    /// missing or chained target is only detected at resolution time.
    pub fn proxy(path: &str, target: &str) -> SitemillResult<Self> {
        let normalized_path = addressable(path);
        let normalized_target = addressable(target);
        if normalized_path == normalized_target {
            return Err(SitemillError::SelfProxy {
                path: normalized_path,
            });
        }
        Ok(Self::build(
            path,
            None,
            ResourceKind::Proxy {
                target: normalized_target,
            },
        ))
    }

    /// Proxy constructor for descriptors validated at declaration time.
    pub(crate) fn proxy_validated(path: &str, target: &str) -> Self {
        Self::build(
            path,
            None,
            ResourceKind::Proxy {
                target: addressable(target),
            },
        )
    }

    fn build(path: &str, source_file: Option<SourceFile>, kind: ResourceKind) -> Self {
        let path = addressable(path);
        Self {
            destination_path: path.clone(),
            path,
            source_file,
            metadata: Metadata::default(),
            kind,
            ignored: false,
        }
    }

    /// Source identity: slash-normalized, spaces percent-escaped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Output identity; defaults to `path` and is independently mutable.
    pub fn destination_path(&self) -> &str {
        &self.destination_path
    }

    pub fn set_destination_path(&mut self, destination: &str) {
        self.destination_path = addressable(destination);
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Deep-merge new metadata into this resource.
    pub fn add_metadata(&mut self, metadata: &Metadata) {
        self.metadata.merge(metadata);
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.kind, ResourceKind::Proxy { .. })
    }

    /// Target path if this resource is a proxy.
    pub fn proxy_target(&self) -> Option<&str> {
        match &self.kind {
            ResourceKind::Proxy { target } => Some(target),
            _ => None,
        }
    }

    /// Mark this resource ignored directly, bypassing the matcher table.
    pub fn mark_ignored(&mut self) {
        self.ignored = true;
    }

    pub fn explicitly_ignored(&self) -> bool {
        self.ignored
    }

    /// Extension of the addressable path, with the leading dot.
    pub fn ext(&self) -> &str {
        util::path_ext(&self.path)
    }

    /// Whether a renderer is registered for the source file's extension.
    pub fn is_template(&self, renderers: &RendererRegistry) -> bool {
        match &self.source_file {
            Some(file) => renderers.handles(util::path_ext(&file.full_path.to_string_lossy())),
            None => false,
        }
    }

    /// Whether the source bytes should be copied rather than rendered: no
    /// renderer claims the extension and the classifier says binary.
    pub fn is_binary(
        &self,
        renderers: &RendererRegistry,
        classifier: &dyn BinaryClassifier,
    ) -> bool {
        match &self.source_file {
            Some(file) => {
                !self.is_template(renderers) && classifier.is_binary(&file.full_path)
            }
            None => false,
        }
    }

    /// Linkable URL: destination path with the index file stripped per
    /// config, under the configured HTTP prefix.
    pub fn url(&self, config: &Config) -> String {
        let mut url_path = self.destination_path.clone();

        if config.strip_index_file {
            if let Some(stripped) = url_path.strip_suffix(&config.index_file) {
                if stripped.is_empty() {
                    url_path = if config.trailing_slash {
                        "/".to_string()
                    } else {
                        String::new()
                    };
                } else if stripped.ends_with('/') {
                    url_path = if config.trailing_slash {
                        stripped.to_string()
                    } else {
                        stripped.trim_end_matches('/').to_string()
                    };
                }
            }
        }

        util::join_url(&config.http_prefix, &url_path)
    }

    /// Preferred MIME type, from metadata override or the extension table.
    pub fn content_type(&self) -> Option<String> {
        if let Some(Value::String(explicit)) = self.metadata.options.get("content_type") {
            return Some(explicit.clone());
        }
        util::mime_type(self.ext()).map(str::to_string)
    }
}

/// Normalize a user-supplied path into addressable form.
pub(crate) fn addressable(path: &str) -> String {
    util::escape_spaces(&util::normalize_path(path))
}
