//! Scenario: Proxy pages over a shared template
//!
//! Journey: several pages are declared programmatically over one on-disk
//! template. One declaration points at a path that never materializes.
//!
//! Success criteria:
//! - every declared page lands in the output with the target's content
//! - the dangling declaration fails alone; the rest of the build completes
//! - the overall result flips to failure

use sitemill::{BuildOptions, Metadata};

use crate::common::*;

#[test]
fn declared_pages_materialize_from_their_target() {
    let fixture = SiteFixture::new();
    fixture.write_source("team/template.html", "profile body");

    for member in ["ada", "grace"] {
        fixture
            .site
            .proxy(
                &format!("team/{member}.html"),
                "team/template.html",
                Metadata::default(),
            )
            .unwrap();
    }

    let (result, _) = fixture.build(BuildOptions::default());

    assert!(result.is_success());
    assert_eq!(fixture.read_output("team/ada.html"), "profile body");
    assert_eq!(fixture.read_output("team/grace.html"), "profile body");
    assert_eq!(fixture.read_output("team/template.html"), "profile body");
}

#[test]
fn a_dangling_declaration_fails_alone() {
    let fixture = SiteFixture::new();
    fixture.write_source("real.html", "fine");
    fixture
        .site
        .proxy("broken.html", "never-written.html", Metadata::default())
        .unwrap();

    let (result, _) = fixture.build(BuildOptions::default());

    assert!(!result.is_success());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].0.ends_with("broken.html"));
    assert!(result.errors[0].1.contains("never-written.html"));
    assert_eq!(fixture.read_output("real.html"), "fine");
}

#[test]
fn a_page_cannot_be_declared_over_itself() {
    let fixture = SiteFixture::new();

    let err = fixture
        .site
        .proxy("loop.html", "loop.html", Metadata::default())
        .unwrap_err();

    assert!(err.to_string().contains("itself"));
}
