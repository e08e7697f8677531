//! Shared types used across the build stages.
//!
//! A [`ResolvedPage`] is produced by [`crate::resolve`] and consumed by
//! [`crate::compose`] and [`crate::materialize`]. The [`BuildResult`] is owned
//! by the pipeline for the duration of one run and handed back to the caller.

use std::fmt;
use std::path::PathBuf;

/// A manifest page specifier expanded to one concrete source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    /// The manifest entry that produced this page (literal path or pattern).
    pub specifier: String,
    /// Path to the source file on disk (build root joined with `rel_path`).
    pub source_path: PathBuf,
    /// Normalized path relative to the build root.
    pub rel_path: PathBuf,
    /// `output_dir` joined with `rel_path`.
    pub output_path: PathBuf,
    /// True when the source has an `.md` extension.
    pub is_markdown: bool,
}

/// Why a manifest entry (or one of its matches) produced no page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Literal specifier naming a file that does not exist.
    NotFound,
    /// Literal specifier naming something that is not a regular file.
    NotAFile,
    /// Pattern specifier that matched no files.
    NoMatches,
    /// Pattern specifier the glob engine rejected.
    InvalidPattern(String),
    /// Another specifier earlier in the manifest already claimed this output path.
    DuplicateOutputPath,
    /// Absolute path, or a path that climbs above the build root.
    OutsideRoot,
    /// The output path is the source file itself.
    OverwritesSource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::NotAFile => write!(f, "not a file"),
            SkipReason::NoMatches => write!(f, "no matches"),
            SkipReason::InvalidPattern(msg) => write!(f, "invalid pattern: {msg}"),
            SkipReason::DuplicateOutputPath => write!(f, "duplicate output path"),
            SkipReason::OutsideRoot => write!(f, "outside build root"),
            SkipReason::OverwritesSource => write!(f, "output would overwrite source"),
        }
    }
}

/// A manifest entry that resolved to nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub specifier: String,
    /// The colliding relative path, for duplicates produced by a pattern.
    pub path: Option<PathBuf>,
    pub reason: SkipReason,
}

impl Skipped {
    pub fn new(specifier: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            specifier: specifier.into(),
            path: None,
            reason,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A page that resolved but could not be composed or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub source_path: PathBuf,
    /// Rendered error message (`PageReadError` / `PageWriteError`).
    pub error: String,
}

/// Outcome of one build run.
///
/// Created empty at the start of a run, accumulated by the pipeline, and
/// returned to the caller once the run reaches `Done`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    /// Resolved output root the pages were written under.
    pub output_dir: PathBuf,
    /// Number of pages successfully materialized.
    pub written: usize,
    pub skipped: Vec<Skipped>,
    pub failed: Vec<Failed>,
}

impl BuildResult {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// True when no page failed. Skipped entries do not make a build unclean.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary, e.g. `47 pages written, 2 skipped, 1 failed`.
    pub fn summary(&self) -> String {
        let noun = if self.written == 1 { "page" } else { "pages" };
        format!(
            "{} {} written, {} skipped, {} failed",
            self.written,
            noun,
            self.skipped.len(),
            self.failed.len()
        )
    }
}
