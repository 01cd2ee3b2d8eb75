//! Scenario: First build of a mixed asset tree
//!
//! Journey: a project with a stylesheet, an image, and a script is built
//! into an empty destination directory.
//!
//! Success criteria:
//! - stylesheets materialize before images, images before scripts
//! - every output file is a byte-exact copy of its source
//! - the run succeeds and reports one creation per file

use sitemill::{BuildEventKind, BuildOptions};

use crate::common::*;

#[test]
fn assets_are_created_in_render_order() {
    let fixture = SiteFixture::new();
    fixture.write_source("a.png", [0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    fixture.write_source("b.js", "console.log('hi');\n");
    fixture.write_source("c.css", "body { margin: 0 }\n");

    let (result, events) = fixture.build(BuildOptions::default());

    assert!(result.is_success());
    assert_eq!(
        paths_of_kind(&events, BuildEventKind::Created),
        vec!["c.css", "a.png", "b.js"]
    );

    assert_eq!(
        fixture.read_output_bytes("a.png"),
        vec![0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
    );
    assert_eq!(fixture.read_output("b.js"), "console.log('hi');\n");
    assert_eq!(fixture.read_output("c.css"), "body { margin: 0 }\n");
}

#[test]
fn fonts_precede_scripts_and_pages_come_last() {
    let fixture = SiteFixture::new();
    fixture.write_source("index.html", "<h1>home</h1>");
    fixture.write_source("app.js", "void 0;");
    fixture.write_source("heading.woff", "not-really-a-font");

    let (result, events) = fixture.build(BuildOptions::default());

    assert!(result.is_success());
    assert_eq!(
        paths_of_kind(&events, BuildEventKind::Created),
        vec!["heading.woff", "app.js", "index.html"]
    );
}

#[test]
fn nested_directories_are_recreated_under_the_destination() {
    let fixture = SiteFixture::new();
    fixture.write_source("posts/2026/entry.html", "entry");
    fixture.write_source("css/site.css", "p {}");

    let (result, _) = fixture.build(BuildOptions::default());

    assert!(result.is_success());
    assert_eq!(fixture.read_output("posts/2026/entry.html"), "entry");
    assert_eq!(fixture.read_output("css/site.css"), "p {}");
}
