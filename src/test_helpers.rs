//! Shared test utilities for the bake test suite.
//!
//! Provides a throwaway site root with a header, footer and manifest, plus
//! small helpers for writing sources and reading output.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::new();
//! site.write("index.html", "<p>hi</p>");
//! site.write_manifest(&manifest_json(&["index.html"]));
//!
//! let result = BuildPipeline::new(site.root()).run(Path::new("bakefile.json")).unwrap();
//! assert_eq!(site.read_output("index.html"), "<header>\n<p>hi</p>\n<footer>\n");
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::manifest::DEFAULT_MANIFEST;

pub const HEADER: &str = "<header>";
pub const FOOTER: &str = "<footer>";

/// A temporary build root seeded with `h.html` and `f.html`.
pub struct TestSite {
    dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        let site = Self {
            dir: TempDir::new().unwrap(),
        };
        site.write("h.html", HEADER);
        site.write("f.html", FOOTER);
        site
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the root, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn write_manifest(&self, json: &str) {
        self.write(DEFAULT_MANIFEST, json);
    }

    /// Read a generated file under `out/`. Panics with the path on miss.
    pub fn read_output(&self, rel: &str) -> String {
        let path = self.root().join("out").join(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("output '{}' not readable: {e}", path.display()))
    }
}

/// Manifest JSON with the standard `out`/`assets`/`h.html`/`f.html` layout.
pub fn manifest_json(pages: &[&str]) -> String {
    serde_json::json!({
        "output_dir": "out",
        "static_dir": "assets",
        "header": "h.html",
        "footer": "f.html",
        "pages": pages,
    })
    .to_string()
}
