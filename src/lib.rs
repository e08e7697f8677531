//! # Bake
//!
//! Builds and concatenates static websites from a list of templates. A JSON
//! manifest (`bakefile.json`) names a header, a footer and the pages to build;
//! every page is wrapped as `header + page + footer` and written under the
//! output directory at the same relative path.
//!
//! # Architecture: Manifest-Driven Pipeline
//!
//! ```text
//! 1. Manifest     bakefile.json  →  Manifest        (validated, immutable)
//! 2. Resolve      Manifest       →  [ResolvedPage]  (literals + sorted glob matches)
//! 3. Compose      ResolvedPage   →  bytes           (header + body + footer, .md rendered)
//! 4. Materialize  bytes          →  out/…           (dirs created, files overwritten)
//! ```
//!
//! Every build is a full, deterministic re-materialization: the same
//! manifest and sources always produce byte-identical output. Problems with a
//! single page are collected into a [`types::BuildResult`] instead of aborting
//! the run; only a bad manifest (or an output root that cannot be created)
//! stops a build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manifest`] | Loads and validates `bakefile.json` |
//! | [`resolve`] | Expands page specifiers (literal paths and glob patterns) into source files |
//! | [`compose`] | Wraps one page with the shared header and footer, rendering Markdown |
//! | [`materialize`] | Creates the output tree and writes composed pages |
//! | [`pipeline`] | Orchestrates one build and reports progress events |
//! | [`publish`] | Copies a finished output tree to a destination |
//! | [`types`] | Shared result types (`ResolvedPage`, `BuildResult`, …) |
//! | [`output`] | CLI output formatting |

pub mod compose;
pub mod manifest;
pub mod materialize;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
