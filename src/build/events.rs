//! Build event types
//!
//! Every per-file outcome flows through one typed hook so observers
//! (progress UIs, NDJSON streams for CI) can subscribe without depending on
//! builder internals.

use std::path::PathBuf;

use serde::Serialize;

use crate::build::BuildResult;

/// Outcome of materializing (or cleaning) one destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildEventKind {
    /// No prior file existed; content was written
    Created,
    /// Prior content differed; content was replaced
    Updated,
    /// Prior content matched; nothing was written
    Identical,
    /// Stale file removed during cleanup
    Deleted,
    /// Rendering or copying failed for this resource
    Error,
}

/// One build outcome: kind, target path, optional diagnostic text.
#[derive(Debug, Clone, Serialize)]
pub struct BuildEvent {
    #[serde(rename = "event")]
    pub kind: BuildEventKind,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BuildEvent {
    pub fn new(kind: BuildEventKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// NDJSON line for CI output.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Observer interface for build progress.
pub trait BuildEventSink: Send + Sync {
    /// Handle one per-file outcome.
    fn on_event(&self, event: &BuildEvent);

    /// The build is about to start.
    fn before_build(&self) {}

    /// The build finished; `result` records every outcome.
    fn after_build(&self, _result: &BuildResult) {}
}

/// Silent sink for callers that only want the returned result.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl BuildEventSink for NoopEventSink {
    fn on_event(&self, _event: &BuildEvent) {}
}
