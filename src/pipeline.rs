//! The build pipeline.
//!
//! One run is a linear pass through these states:
//!
//! ```text
//! Idle → ManifestLoaded → Resolving → Composing → Materializing → Done
//!   │          │
//!   └──────────┴──→ Failed   (manifest, output root, or worker pool error)
//! ```
//!
//! Only problems that make the whole build meaningless are fatal. A page that
//! is missing, duplicated, unreadable or unwritable is recorded in the
//! [`BuildResult`] and the run still reaches `Done`, so the caller can report
//! everything in one pass.
//!
//! ## Parallelism
//!
//! Pages are independent once resolved. Composition and writes run on a
//! per-run [rayon](https://docs.rs/rayon) pool sized by
//! [`effective_threads`]; results are collected back in resolution order and
//! folded into the `BuildResult` by the pipeline alone.
//!
//! ## Progress
//!
//! The pipeline never prints. Callers that want progress pass a channel with
//! [`BuildPipeline::with_events`] and receive [`BuildEvent`]s.

use crate::compose::{Segments, compose};
use crate::manifest::{Manifest, ManifestError, effective_threads};
use crate::materialize::{ComposedPage, MaterializeError, OutputTree, PageOutcome};
use crate::resolve::resolve;
use crate::types::{BuildResult, Failed, Skipped};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("Cannot prepare output directory: {0}")]
    OutputDir(#[from] MaterializeError),
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    ManifestLoaded,
    Resolving,
    Composing,
    Materializing,
    Done,
    Failed,
}

/// Progress notifications sent while a build runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    State(BuildState),
    PageSkipped(Skipped),
    PageWritten {
        /// 1-based position in resolution order.
        index: usize,
        source: PathBuf,
        output: PathBuf,
    },
    PageFailed(Failed),
}

/// Everything the page stages need, set up before any page is touched.
struct Prepared {
    segments: Segments,
    tree: OutputTree,
    pool: rayon::ThreadPool,
}

/// Drives manifest → resolve → compose → materialize for one build root.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    root: PathBuf,
    events: Option<Sender<BuildEvent>>,
}

impl BuildPipeline {
    /// `root` is the directory every manifest path is relative to.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Sender<BuildEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a full build from the manifest at `manifest_path`.
    pub fn run(&self, manifest_path: &Path) -> Result<BuildResult, BuildError> {
        self.enter(BuildState::Idle);
        match Manifest::load(manifest_path, &self.root) {
            Ok(manifest) => self.build(&manifest),
            Err(e) => {
                self.enter(BuildState::Failed);
                Err(e.into())
            }
        }
    }

    /// Build from an already loaded manifest.
    pub fn build(&self, manifest: &Manifest) -> Result<BuildResult, BuildError> {
        self.enter(BuildState::ManifestLoaded);
        let Prepared {
            segments,
            tree,
            pool,
        } = match self.prepare(manifest) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.enter(BuildState::Failed);
                return Err(e);
            }
        };

        let mut result = BuildResult::new(tree.root());

        self.enter(BuildState::Resolving);
        let resolution = resolve(manifest, &self.root);
        for skipped in resolution.skipped {
            self.emit(BuildEvent::PageSkipped(skipped.clone()));
            result.skipped.push(skipped);
        }

        self.enter(BuildState::Composing);
        let composed: Vec<Result<ComposedPage, Failed>> = pool.install(|| {
            resolution
                .pages
                .into_par_iter()
                .map(|page| match compose(&page, &segments) {
                    Ok(bytes) => Ok(ComposedPage { page, bytes }),
                    Err(e) => Err(Failed {
                        source_path: page.source_path,
                        error: e.to_string(),
                    }),
                })
                .collect()
        });

        self.enter(BuildState::Materializing);
        let mut ready = Vec::with_capacity(composed.len());
        for item in composed {
            match item {
                Ok(page) => ready.push(page),
                Err(failed) => {
                    self.report_failure(&failed);
                    result.failed.push(failed);
                }
            }
        }

        pool.install(|| {
            tree.materialize(ready, &mut result, |outcome| match outcome {
                PageOutcome::Written { index, page } => self.emit(BuildEvent::PageWritten {
                    index,
                    source: page.source_path.clone(),
                    output: page.output_path.clone(),
                }),
                PageOutcome::Failed(failed) => self.report_failure(failed),
            })
        });

        self.enter(BuildState::Done);
        tracing::info!(
            written = result.written,
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Build finished"
        );
        Ok(result)
    }

    /// The fatal part of a run after loading: header/footer, worker pool, output root.
    fn prepare(&self, manifest: &Manifest) -> Result<Prepared, BuildError> {
        // Header and footer were validated at load; losing them now is still
        // a manifest problem, not a page problem.
        let segments = Segments::load(manifest, &self.root)
            .map_err(|e| ManifestError::Invalid(e.to_string()))?;

        let threads = effective_threads(&manifest.processing);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        let tree = OutputTree::prepare(&manifest.output_root(&self.root), &manifest.static_dir)?;
        tracing::debug!(
            output = %tree.root().display(),
            threads,
            "Output tree ready"
        );

        Ok(Prepared {
            segments,
            tree,
            pool,
        })
    }

    fn report_failure(&self, failed: &Failed) {
        tracing::debug!(
            source = %failed.source_path.display(),
            error = %failed.error,
            "Page failed"
        );
        self.emit(BuildEvent::PageFailed(failed.clone()));
    }

    fn enter(&self, state: BuildState) {
        tracing::debug!(?state, "Build state");
        self.emit(BuildEvent::State(state));
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DEFAULT_MANIFEST;
    use crate::test_helpers::*;
    use crate::types::SkipReason;
    use std::fs;
    use std::sync::mpsc;

    fn run(site: &TestSite) -> Result<BuildResult, BuildError> {
        BuildPipeline::new(site.root()).run(Path::new(DEFAULT_MANIFEST))
    }

    #[test]
    fn empty_pages_creates_output_tree() {
        let site = TestSite::new();
        site.write_manifest(&manifest_json(&[]));

        let result = run(&site).unwrap();

        assert_eq!(result.written, 0);
        assert!(result.skipped.is_empty());
        assert!(result.failed.is_empty());
        assert!(site.root().join("out").is_dir());
        assert!(site.root().join("out/assets").is_dir());

        // Rerun over the existing tree.
        let again = run(&site).unwrap();
        assert_eq!(again, result);
    }

    #[test]
    fn literal_page_is_wrapped() {
        let site = TestSite::new();
        site.write("index.html", "<p>home</p>");
        site.write_manifest(&manifest_json(&["index.html"]));

        let result = run(&site).unwrap();

        assert_eq!(result.written, 1);
        assert_eq!(
            site.read_output("index.html"),
            format!("{HEADER}\n<p>home</p>\n{FOOTER}\n")
        );
    }

    #[test]
    fn missing_literal_is_skipped_not_fatal() {
        let site = TestSite::new();
        site.write("index.html", "<p>home</p>");
        site.write_manifest(&manifest_json(&["index.html", "missing.html"]));

        let result = run(&site).unwrap();

        assert_eq!(result.written, 1);
        assert_eq!(
            result.skipped,
            vec![Skipped::new("missing.html", SkipReason::NotFound)]
        );
        assert!(result.failed.is_empty());
        assert!(!site.root().join("out/missing.html").exists());
    }

    #[test]
    fn markdown_page_is_rendered_between_header_and_footer() {
        let site = TestSite::new();
        site.write("posts/hello.md", "# Hello");
        site.write_manifest(&manifest_json(&["posts/*.md"]));

        run(&site).unwrap();

        assert_eq!(
            site.read_output("posts/hello.md"),
            format!("{HEADER}\n<h1>Hello</h1>\n{FOOTER}\n")
        );
    }

    #[test]
    fn write_failure_does_not_abort_run() {
        let site = TestSite::new();
        site.write("a.html", "a");
        site.write("b.html", "b");
        site.write_manifest(&manifest_json(&["a.html", "b.html"]));
        fs::create_dir_all(site.root().join("out/a.html")).unwrap();

        let result = run(&site).unwrap();

        assert_eq!(result.written, 1);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].source_path, site.root().join("a.html"));
        assert!(site.read_output("b.html").contains("b"));
    }

    #[test]
    fn unreadable_markdown_is_a_page_failure() {
        let site = TestSite::new();
        fs::write(site.root().join("bad.md"), [0xffu8, 0xfe]).unwrap();
        site.write("good.html", "ok");
        site.write_manifest(&manifest_json(&["bad.md", "good.html"]));

        let result = run(&site).unwrap();

        assert_eq!(result.written, 1);
        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].error.contains("bad.md"));
    }

    #[test]
    fn missing_footer_is_fatal_and_writes_nothing() {
        let site = TestSite::new();
        site.write("index.html", "x");
        site.write_manifest(&manifest_json(&["index.html"]));
        fs::remove_file(site.root().join("f.html")).unwrap();

        let err = run(&site).unwrap_err();

        assert!(matches!(err, BuildError::Manifest(ManifestError::Invalid(_))));
        assert!(!site.root().join("out").exists());
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let site = TestSite::new();
        let err = run(&site).unwrap_err();
        assert!(matches!(err, BuildError::Manifest(ManifestError::NotFound(_))));
    }

    #[test]
    fn output_root_blocked_by_file_is_fatal() {
        let site = TestSite::new();
        site.write("out", "I am a file");
        site.write_manifest(&manifest_json(&[]));

        let err = run(&site).unwrap_err();

        assert!(matches!(err, BuildError::OutputDir(_)));
    }

    #[test]
    fn single_worker_build_matches_parallel_build() {
        let site = TestSite::new();
        for name in ["a", "b", "c", "d"] {
            site.write(&format!("pages/{name}.html"), name);
        }
        site.write_manifest(&manifest_json(&["pages/*.html"]));
        let parallel = run(&site).unwrap();
        let parallel_bytes = site.read_output("pages/c.html");

        site.write_manifest(
            &serde_json::json!({
                "output_dir": "out",
                "static_dir": "assets",
                "header": "h.html",
                "footer": "f.html",
                "pages": ["pages/*.html"],
                "processing": {"max_processes": 1},
            })
            .to_string(),
        );
        let sequential = run(&site).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel_bytes, site.read_output("pages/c.html"));
    }

    #[test]
    fn events_follow_state_machine() {
        let site = TestSite::new();
        site.write("index.html", "x");
        site.write_manifest(&manifest_json(&["index.html", "missing.html"]));
        let (tx, rx) = mpsc::channel();

        BuildPipeline::new(site.root())
            .with_events(tx)
            .run(Path::new(DEFAULT_MANIFEST))
            .unwrap();

        let events: Vec<BuildEvent> = rx.try_iter().collect();
        let states: Vec<BuildState> = events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::State(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                BuildState::Idle,
                BuildState::ManifestLoaded,
                BuildState::Resolving,
                BuildState::Composing,
                BuildState::Materializing,
                BuildState::Done,
            ]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            BuildEvent::PageSkipped(s) if s.specifier == "missing.html"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            BuildEvent::PageWritten { index: 1, .. }
        )));
    }

    #[test]
    fn fatal_error_ends_in_failed_state() {
        let site = TestSite::new();
        let (tx, rx) = mpsc::channel();

        let _ = BuildPipeline::new(site.root())
            .with_events(tx)
            .run(Path::new(DEFAULT_MANIFEST));

        let states: Vec<BuildEvent> = rx.try_iter().collect();
        assert_eq!(
            states,
            vec![
                BuildEvent::State(BuildState::Idle),
                BuildEvent::State(BuildState::Failed),
            ]
        );
    }
}
