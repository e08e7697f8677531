//! Output tree materialization.
//!
//! Creates the output root and its static directory, then writes composed
//! pages at their relative paths:
//!
//! ```text
//! out/
//! ├── assets/            # static_dir, created empty if absent
//! ├── index.html
//! └── posts/
//!     └── hello.md       # intermediate directories created on demand
//! ```
//!
//! Builds are full re-materializations: existing files are overwritten and
//! existing directories are reused, so rerunning a build never fails on a
//! tree left by a previous run. Nothing is written outside the output root.

use crate::types::{BuildResult, Failed, ResolvedPage};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Refusing to write outside the output directory: {0}")]
    OutsideOutput(PathBuf),
}

/// A page together with its composed bytes, ready to be written.
#[derive(Debug, Clone)]
pub struct ComposedPage {
    pub page: ResolvedPage,
    pub bytes: Vec<u8>,
}

/// What happened to one page during [`OutputTree::materialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome<'a> {
    Written {
        /// 1-based count of pages written so far.
        index: usize,
        page: &'a ResolvedPage,
    },
    Failed(&'a Failed),
}

/// A prepared output root. Exists on disk once constructed.
#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
    static_root: PathBuf,
}

impl OutputTree {
    /// Ensure `output_dir` and `output_dir/static_dir` exist.
    pub fn prepare(output_dir: &Path, static_dir: &Path) -> Result<Self, MaterializeError> {
        let static_root = output_dir.join(static_dir);
        for dir in [output_dir, static_root.as_path()] {
            fs::create_dir_all(dir).map_err(|source| MaterializeError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(Self {
            root: output_dir.to_path_buf(),
            static_root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Write one page, creating intermediate directories and overwriting any
    /// existing file.
    pub fn write(&self, page: &ResolvedPage, bytes: &[u8]) -> Result<(), MaterializeError> {
        let path = &page.output_path;
        if !path.starts_with(&self.root) {
            return Err(MaterializeError::OutsideOutput(path.clone()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| MaterializeError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, bytes).map_err(|source| MaterializeError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(output = %path.display(), bytes = bytes.len(), "Page written");
        Ok(())
    }

    /// Write pages in parallel on the current rayon pool. Outcomes come back
    /// in the same order as `pages`.
    pub fn write_all(&self, pages: &[ComposedPage]) -> Vec<Result<(), MaterializeError>> {
        pages
            .par_iter()
            .map(|composed| self.write(&composed.page, &composed.bytes))
            .collect()
    }

    /// Write every composed page and fold the outcomes into `result`.
    ///
    /// A failed write is recorded in [`BuildResult::failed`] and the remaining
    /// pages are still written. `on_page` sees each outcome in page order,
    /// after `result` has been updated.
    pub fn materialize(
        &self,
        pages: Vec<ComposedPage>,
        result: &mut BuildResult,
        mut on_page: impl FnMut(PageOutcome<'_>),
    ) {
        let outcomes = self.write_all(&pages);
        for (composed, outcome) in pages.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    result.written += 1;
                    on_page(PageOutcome::Written {
                        index: result.written,
                        page: &composed.page,
                    });
                }
                Err(e) => {
                    let failed = Failed {
                        source_path: composed.page.source_path,
                        error: e.to_string(),
                    };
                    on_page(PageOutcome::Failed(&failed));
                    result.failed.push(failed);
                }
            }
        }
    }
}
