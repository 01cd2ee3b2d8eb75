//! Error types for sitemill
//!
//! Uses `thiserror` for library errors. Configuration mistakes fail fast;
//! per-resource build failures are recovered at the resource boundary and
//! reported through build events instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::render::RenderError;

/// Result type alias for sitemill operations
pub type SitemillResult<T> = Result<T, SitemillError>;

/// Main error type for sitemill operations
#[derive(Error, Debug)]
pub enum SitemillError {
    /// A proxy was declared with itself as target
    #[error("cannot proxy '{path}' to itself")]
    SelfProxy { path: String },

    /// A proxy target does not exist in the resource list
    #[error("'{path}' proxies to unknown path '{target}'")]
    UnresolvedProxyTarget { path: String, target: String },

    /// A proxy target is itself a proxy
    #[error("cannot proxy '{path}' to '{target}', which is itself a proxy")]
    ChainedProxy { path: String, target: String },

    /// Destination directory would swallow the source tree
    #[error("build directory '{build_dir}' cannot be a parent of source directory '{source_dir}'")]
    DestinationContainsSource {
        build_dir: PathBuf,
        source_dir: PathBuf,
    },

    /// Rendering a resource failed
    #[error("failed to render '{path}': {source}")]
    Render { path: String, source: RenderError },

    /// A resource has neither a source file nor a registered renderer
    #[error("no content available for '{path}'")]
    NoContent { path: String },

    /// Invalid ignore or filter pattern
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Config file could not be parsed
    #[error("invalid config in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// File watch subscription failed
    #[error("watch error for {path}: {message}")]
    Watch { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_self_proxy() {
        let err = SitemillError::SelfProxy {
            path: "about.html".to_string(),
        };
        assert_eq!(err.to_string(), "cannot proxy 'about.html' to itself");
    }

    #[test]
    fn test_error_display_chained_proxy() {
        let err = SitemillError::ChainedProxy {
            path: "a.html".to_string(),
            target: "b.html".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot proxy 'a.html' to 'b.html', which is itself a proxy"
        );
    }

    #[test]
    fn test_error_display_unresolved_target() {
        let err = SitemillError::UnresolvedProxyTarget {
            path: "alias.html".to_string(),
            target: "gone.html".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'alias.html' proxies to unknown path 'gone.html'"
        );
    }
}
