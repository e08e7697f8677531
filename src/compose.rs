//! Page composition: header + body + footer.
//!
//! Every page is the concatenation of three segments, each terminated by a
//! newline the way `puts` writes lines:
//!
//! ```text
//! <header bytes>\n
//! <page bytes, or rendered HTML for .md sources>\n
//! <footer bytes>\n
//! ```
//!
//! A segment that already ends in `\n` is not given a second one. Header and
//! footer are read once per run into [`Segments`] and shared read-only by
//! every page (and every worker thread).
//!
//! Markdown sources are rendered to HTML with
//! [pulldown-cmark](https://docs.rs/pulldown-cmark); header and footer are
//! always copied verbatim.

use crate::manifest::Manifest;
use crate::types::ResolvedPage;
use pulldown_cmark::{Options, Parser, html as md_html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to read page {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Header and footer bytes, loaded once per build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub header: Vec<u8>,
    pub footer: Vec<u8>,
}

impl Segments {
    pub fn new(header: impl Into<Vec<u8>>, footer: impl Into<Vec<u8>>) -> Self {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }

    /// Read the manifest's header and footer relative to `root`.
    pub fn load(manifest: &Manifest, root: &Path) -> Result<Self, ComposeError> {
        Ok(Self {
            header: read(&root.join(&manifest.header))?,
            footer: read(&root.join(&manifest.footer))?,
        })
    }
}

/// Produce the final bytes for one page. Reads the source, never writes.
pub fn compose(page: &ResolvedPage, segments: &Segments) -> Result<Vec<u8>, ComposeError> {
    let raw = read(&page.source_path)?;

    let body = if page.is_markdown {
        let text = String::from_utf8(raw).map_err(|e| ComposeError::Read {
            path: page.source_path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        render_markdown(&text).into_bytes()
    } else {
        raw
    };

    let mut out = Vec::with_capacity(segments.header.len() + body.len() + segments.footer.len() + 3);
    push_line(&mut out, &segments.header);
    push_line(&mut out, &body);
    push_line(&mut out, &segments.footer);
    Ok(out)
}

/// Render CommonMark (plus tables, footnotes, strikethrough, task lists) to HTML.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

fn push_line(out: &mut Vec<u8>, segment: &[u8]) {
    out.extend_from_slice(segment);
    if !segment.ends_with(b"\n") {
        out.push(b'\n');
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ComposeError> {
    fs::read(path).map_err(|source| ComposeError::Read {
        path: path.to_path_buf(),
        source,
    })
}
