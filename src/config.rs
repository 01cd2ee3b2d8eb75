//! Site configuration
//!
//! Loaded from an optional `sitemill.toml`; every field has a default so an
//! empty or missing file yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SitemillError, SitemillResult};

/// Top-level site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding source files, relative to the project root
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Directory the build writes into
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// File name served for directory requests
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Strip the index file from generated URLs
    #[serde(default = "default_true")]
    pub strip_index_file: bool,

    /// Keep a trailing slash on stripped URLs
    #[serde(default = "default_true")]
    pub trailing_slash: bool,

    /// Prefix applied to every generated URL
    #[serde(default = "default_http_prefix")]
    pub http_prefix: String,

    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// File watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Never start a background watch, even in server mode
    #[serde(default)]
    pub disable: bool,

    /// Use polling instead of native file events
    #[serde(default)]
    pub force_polling: bool,

    /// Debounce window for batching raw file events, in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> SitemillResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SitemillError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Debounce window as a `Duration`.
    pub fn watcher_latency(&self) -> Duration {
        Duration::from_millis(self.watcher.latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: default_source(),
            build_dir: default_build_dir(),
            index_file: default_index_file(),
            strip_index_file: true,
            trailing_slash: true,
            http_prefix: default_http_prefix(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            disable: false,
            force_polling: false,
            latency_ms: default_latency_ms(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("source")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_index_file() -> String {
    "index.html".to_string()
}

fn default_http_prefix() -> String {
    "/".to_string()
}

fn default_latency_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}
