//! Page resolution: manifest specifiers → concrete source files.
//!
//! Each entry in `pages` is either a **literal** path (`about.html`) or a
//! **pattern** containing glob metacharacters (`posts/*.md`, `**/*.html`).
//!
//! ```text
//! pages: ["index.html", "posts/*.md", "missing.html", "./index.html"]
//!
//!   index.html      → out/index.html
//!   posts/*.md      → out/posts/a.md, out/posts/b.md   (sorted)
//!   missing.html    → skipped: not found
//!   ./index.html    → skipped: duplicate output path
//! ```
//!
//! ## Ordering
//!
//! Pages come out in manifest order; the matches of one pattern are sorted by
//! path so builds do not depend on directory enumeration order.
//!
//! ## Duplicates
//!
//! Two specifiers that land on the same output path: the first one in the
//! manifest wins, later ones are recorded as skipped.
//!
//! Resolution never fails. Anything that does not produce a page ends up in
//! [`Resolution::skipped`] with a [`SkipReason`].

use crate::manifest::Manifest;
use crate::types::{ResolvedPage, SkipReason, Skipped};
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

const GLOB_METACHARACTERS: &[char] = &['*', '?', '['];

/// Pages and skipped entries produced from a manifest.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub pages: Vec<ResolvedPage>,
    pub skipped: Vec<Skipped>,
}

/// How a manifest page entry is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier<'a> {
    Literal(&'a str),
    Pattern(&'a str),
}

impl<'a> Specifier<'a> {
    pub fn classify(spec: &'a str) -> Self {
        if spec.contains(GLOB_METACHARACTERS) {
            Specifier::Pattern(spec)
        } else {
            Specifier::Literal(spec)
        }
    }
}

/// Expand every page specifier of `manifest` against `root`.
pub fn resolve(manifest: &Manifest, root: &Path) -> Resolution {
    let output_root = manifest.output_root(root);
    let segments = [&manifest.header, &manifest.footer]
        .into_iter()
        .filter_map(|path| normalize(path))
        .collect();
    let mut resolver = Resolver {
        root,
        output_root: &output_root,
        segments,
        seen: HashSet::new(),
        resolution: Resolution::default(),
    };

    for spec in &manifest.pages {
        match Specifier::classify(spec) {
            Specifier::Literal(literal) => resolver.literal(literal),
            Specifier::Pattern(pattern) => resolver.pattern(pattern),
        }
    }

    tracing::debug!(
        pages = resolver.resolution.pages.len(),
        skipped = resolver.resolution.skipped.len(),
        "Pages resolved"
    );
    resolver.resolution
}

struct Resolver<'a> {
    root: &'a Path,
    output_root: &'a Path,
    /// Header and footer, relative to the root. Patterns never pick them up.
    segments: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    resolution: Resolution,
}

impl Resolver<'_> {
    fn literal(&mut self, spec: &str) {
        let Some(rel) = normalize(Path::new(spec)) else {
            self.skip(Skipped::new(spec, SkipReason::OutsideRoot));
            return;
        };
        if rel.as_os_str().is_empty() {
            self.skip(Skipped::new(spec, SkipReason::NotAFile));
            return;
        }

        match fs::metadata(self.root.join(&rel)) {
            Ok(meta) if meta.is_file() => self.add(spec, rel),
            Ok(_) => self.skip(Skipped::new(spec, SkipReason::NotAFile)),
            Err(_) => self.skip(Skipped::new(spec, SkipReason::NotFound)),
        }
    }

    fn pattern(&mut self, spec: &str) {
        let Some(rel_pattern) = normalize(Path::new(spec)) else {
            self.skip(Skipped::new(spec, SkipReason::OutsideRoot));
            return;
        };

        let full = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            rel_pattern.to_string_lossy()
        );
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };
        let paths = match glob::glob_with(&full, options) {
            Ok(paths) => paths,
            Err(e) => {
                self.skip(Skipped::new(spec, SkipReason::InvalidPattern(e.msg.to_string())));
                return;
            }
        };

        let mut matches: Vec<PathBuf> = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(pattern = spec, error = %e, "Unreadable glob entry");
                    continue;
                }
            };
            // Never feed a previous build's output back in as a page.
            if !path.is_file() || path.starts_with(self.output_root) {
                continue;
            }
            match path.strip_prefix(self.root) {
                Ok(rel) if self.segments.iter().any(|s| s == rel) => {}
                Ok(rel) => matches.push(rel.to_path_buf()),
                Err(_) => {
                    tracing::warn!(path = %path.display(), "Glob match outside build root");
                }
            }
        }

        if matches.is_empty() {
            self.skip(Skipped::new(spec, SkipReason::NoMatches));
            return;
        }

        matches.sort();
        for rel in matches {
            self.add(spec, rel);
        }
    }

    fn add(&mut self, spec: &str, rel: PathBuf) {
        let source_path = self.root.join(&rel);
        let output_path = self.output_root.join(&rel);
        if output_path == source_path {
            self.skip(Skipped::new(spec, SkipReason::OverwritesSource).with_path(rel));
            return;
        }
        if !self.seen.insert(output_path.clone()) {
            self.skip(Skipped::new(spec, SkipReason::DuplicateOutputPath).with_path(rel));
            return;
        }

        let is_markdown = rel
            .extension()
            .map(|e| e.eq_ignore_ascii_case("md"))
            .unwrap_or(false);

        self.resolution.pages.push(ResolvedPage {
            specifier: spec.to_string(),
            source_path,
            rel_path: rel,
            output_path,
            is_markdown,
        });
    }

    fn skip(&mut self, skipped: Skipped) {
        tracing::debug!(
            specifier = %skipped.specifier,
            reason = %skipped.reason,
            "Page skipped"
        );
        self.resolution.skipped.push(skipped);
    }
}

/// Lexically normalize a relative path. `None` if it is absolute or climbs
/// above its base.
pub(crate) fn normalize(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.into_iter().collect())
}
