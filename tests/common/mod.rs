//! Common test utilities for sitemill scenario tests.
//!
//! Provides `SiteFixture`, an isolated site rooted in a temp directory,
//! plus an event-recording sink for asserting on build outcomes in order.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sitemill::{
    BuildEvent, BuildEventKind, BuildEventSink, BuildOptions, BuildResult, Builder, Config, Mode,
    Site,
};
use tempfile::TempDir;

/// One site in a temp directory: `source/` for input, `build/` for output.
pub struct SiteFixture {
    _dir: TempDir,
    root: PathBuf,
    pub site: Arc<Site>,
}

impl SiteFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let config = Config {
            source: root.join("source"),
            build_dir: root.join("build"),
            ..Config::default()
        };
        std::fs::create_dir_all(&config.source).unwrap();
        let site = Site::new(config, Mode::Build).unwrap();

        Self {
            _dir: dir,
            root,
            site,
        }
    }

    pub fn write_source(&self, rel: &str, content: impl AsRef<[u8]>) {
        let path = self.site.config().source.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn remove_source(&self, rel: &str) {
        std::fs::remove_file(self.site.config().source.join(rel)).unwrap();
    }

    pub fn output_path(&self, rel: &str) -> PathBuf {
        self.root.join("build").join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        std::fs::read_to_string(self.output_path(rel)).unwrap()
    }

    pub fn read_output_bytes(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.output_path(rel)).unwrap()
    }

    /// Run a build, recording every event. The builder catches up on disk
    /// state itself.
    pub fn build(&self, options: BuildOptions) -> (BuildResult, Vec<BuildEvent>) {
        let events: Arc<Mutex<Vec<BuildEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Builder::new(Arc::clone(&self.site), options).unwrap();
        builder.add_sink(Arc::new(RecordingSink {
            events: Arc::clone(&events),
        }));
        let result = builder.run();

        let recorded = events.lock().unwrap().clone();
        (result, recorded)
    }
}

struct RecordingSink {
    events: Arc<Mutex<Vec<BuildEvent>>>,
}

impl BuildEventSink for RecordingSink {
    fn on_event(&self, event: &BuildEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// File names of events of one kind, in delivery order.
pub fn paths_of_kind(events: &[BuildEvent], kind: BuildEventKind) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
