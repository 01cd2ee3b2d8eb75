//! Scenario: Edit-rebuild loop
//!
//! Journey: a site is built, one page is edited, a rebuild runs, then a
//! source file is deleted and a cleaning rebuild reconciles the output.
//!
//! Success criteria:
//! - untouched files classify as identical, never rewritten
//! - the edited file classifies as updated with a line-diff summary
//! - the deleted file's output is removed with exactly one deletion event

use sitemill::{BuildEventKind, BuildOptions};

use crate::common::*;

#[test]
fn rebuild_touches_only_what_changed() {
    let fixture = SiteFixture::new();
    fixture.write_source("index.html", "home\n");
    fixture.write_source("about.html", "about v1\nsecond line\n");

    let (first, _) = fixture.build(BuildOptions::default());
    assert!(first.is_success());
    assert_eq!(first.created.len(), 2);

    fixture.write_source("about.html", "about v2\nsecond line\n");
    let (second, events) = fixture.build(BuildOptions::default());

    assert!(second.is_success());
    assert_eq!(
        paths_of_kind(&events, BuildEventKind::Updated),
        vec!["about.html"]
    );
    assert_eq!(
        paths_of_kind(&events, BuildEventKind::Identical),
        vec!["index.html"]
    );
    assert!(second.created.is_empty());

    let updated = events
        .iter()
        .find(|e| e.kind == BuildEventKind::Updated)
        .unwrap();
    assert_eq!(updated.message.as_deref(), Some("+1, -1"));
    assert_eq!(fixture.read_output("about.html"), "about v2\nsecond line\n");
}

#[test]
fn deleting_a_source_cleans_its_output() {
    let fixture = SiteFixture::new();
    fixture.write_source("keep.html", "kept");
    fixture.write_source("gone.html", "doomed");

    let (first, _) = fixture.build(BuildOptions::default());
    assert!(first.is_success());
    assert!(fixture.output_path("gone.html").exists());

    fixture.remove_source("gone.html");
    let (second, events) = fixture.build(BuildOptions::default());

    assert!(second.is_success());
    assert_eq!(
        paths_of_kind(&events, BuildEventKind::Deleted),
        vec!["gone.html"]
    );
    assert!(!fixture.output_path("gone.html").exists());
    assert_eq!(fixture.read_output("keep.html"), "kept");
}

#[test]
fn rebuild_without_clean_leaves_orphans_in_place() {
    let fixture = SiteFixture::new();
    fixture.write_source("page.html", "x");

    fixture.build(BuildOptions::default());
    fixture.remove_source("page.html");

    let (result, events) = fixture.build(BuildOptions {
        glob: None,
        clean: false,
    });

    assert!(result.is_success());
    assert!(paths_of_kind(&events, BuildEventKind::Deleted).is_empty());
    assert!(fixture.output_path("page.html").exists());
}
