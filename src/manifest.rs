//! Build manifest loading and validation.
//!
//! The manifest (`bakefile.json` by default) declares where output goes, the
//! shared header and footer, and the ordered list of pages to build:
//!
//! ```json
//! {
//!   "output_dir": "out",
//!   "static_dir": "assets",
//!   "header": "header.html",
//!   "footer": "footer.html",
//!   "pages": ["index.html", "posts/*.md"],
//!
//!   "processing": { "max_processes": 4 },
//!   "destination": "file:/srv/www"
//! }
//! ```
//!
//! `processing` and `destination` are optional. Unknown keys are ignored so
//! older binaries keep reading newer manifests.
//!
//! ## Paths
//!
//! Every path in the manifest is relative to the build root (the CLI uses the
//! current working directory). `static_dir` is relative to `output_dir` and
//! may not climb out of it.
//!
//! ## Validation
//!
//! Loading fails when the file is missing ([`ManifestError::NotFound`]), is not
//! valid JSON ([`ManifestError::Parse`]), or is structurally wrong
//! ([`ManifestError::Invalid`]): a required key is missing or empty, or the
//! header/footer do not name readable files. An empty `pages` list is valid.

use crate::resolve::normalize;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name used when none is given on the command line.
pub const DEFAULT_MANIFEST: &str = "bakefile.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error reading manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Manifest parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Parallel build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Maximum number of pages composed and written at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count: user cap clamped to available cores.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// On-disk shape. Required keys are optional here so a missing key is
/// reported as [`ManifestError::Invalid`] rather than a parse error.
#[derive(Debug, Deserialize)]
struct RawManifest {
    output_dir: Option<String>,
    static_dir: Option<String>,
    header: Option<String>,
    footer: Option<String>,
    pages: Option<Vec<String>>,
    #[serde(default)]
    processing: ProcessingConfig,
    #[serde(default)]
    destination: Option<String>,
}

/// A validated build manifest. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Root of generated output, relative to the build root.
    pub output_dir: PathBuf,
    /// Static asset directory, relative to `output_dir`.
    pub static_dir: PathBuf,
    /// File whose contents prefix every page.
    pub header: PathBuf,
    /// File whose contents suffix every page.
    pub footer: PathBuf,
    /// Page specifiers in manifest order: literal paths or glob patterns.
    pub pages: Vec<String>,
    pub processing: ProcessingConfig,
    /// Default publish descriptor, used when `--dest` is not given.
    pub destination: Option<String>,
}

impl Manifest {
    /// Read, parse and validate the manifest at `path`.
    ///
    /// A relative `path` is taken relative to `root`; header and footer are
    /// checked against `root` as well.
    pub fn load(path: &Path, root: &Path) -> Result<Self, ManifestError> {
        let path = root.join(path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound(path));
            }
            Err(source) => return Err(ManifestError::Io { path, source }),
        };

        let manifest = Self::parse(&content).map_err(|e| match e {
            ParseFailure::Syntax(source) => ManifestError::Parse {
                path: path.clone(),
                source,
            },
            ParseFailure::Invalid(msg) => ManifestError::Invalid(msg),
        })?;
        manifest.validate(root)?;

        tracing::debug!(
            manifest = %path.display(),
            pages = manifest.pages.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Parse manifest JSON and check the fields that need no filesystem access.
    fn parse(content: &str) -> Result<Self, ParseFailure> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(ParseFailure::Syntax)?;
        if !value.is_object() {
            return Err(ParseFailure::Invalid(
                "manifest must be a JSON object".into(),
            ));
        }
        let raw: RawManifest =
            serde_json::from_value(value).map_err(|e| ParseFailure::Invalid(e.to_string()))?;

        let output_dir = required_string(raw.output_dir, "output_dir")?;
        let static_dir = required_string(raw.static_dir, "static_dir")?;
        let header = required_string(raw.header, "header")?;
        let footer = required_string(raw.footer, "footer")?;
        let pages = raw
            .pages
            .ok_or_else(|| ParseFailure::Invalid("missing required key `pages`".into()))?;

        if normalize(Path::new(&output_dir)).is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ParseFailure::Invalid(format!(
                "output_dir must not be the build root: {output_dir}"
            )));
        }
        if normalize(Path::new(&static_dir)).is_none() {
            return Err(ParseFailure::Invalid(format!(
                "static_dir must stay inside output_dir: {static_dir}"
            )));
        }
        if raw.processing.max_processes == Some(0) {
            return Err(ParseFailure::Invalid(
                "processing.max_processes must be at least 1".into(),
            ));
        }

        Ok(Self {
            output_dir: PathBuf::from(output_dir),
            static_dir: PathBuf::from(static_dir),
            header: PathBuf::from(header),
            footer: PathBuf::from(footer),
            pages,
            processing: raw.processing,
            destination: raw.destination.filter(|d| !d.trim().is_empty()),
        })
    }

    /// Check that header and footer name readable files under `root`.
    pub fn validate(&self, root: &Path) -> Result<(), ManifestError> {
        for (key, rel) in [("header", &self.header), ("footer", &self.footer)] {
            let path = root.join(rel);
            if !path.is_file() {
                return Err(ManifestError::Invalid(format!(
                    "{key} file not found: {}",
                    rel.display()
                )));
            }
            if let Err(e) = fs::File::open(&path) {
                return Err(ManifestError::Invalid(format!(
                    "{key} file not readable: {}: {e}",
                    rel.display()
                )));
            }
        }
        Ok(())
    }

    /// Absolute (root-joined) output directory, lexically normalized when
    /// `output_dir` stays inside the root.
    pub fn output_root(&self, root: &Path) -> PathBuf {
        match normalize(&self.output_dir) {
            Some(rel) => root.join(rel),
            None => root.join(&self.output_dir),
        }
    }
}

enum ParseFailure {
    Syntax(serde_json::Error),
    Invalid(String),
}

fn required_string(value: Option<String>, key: &str) -> Result<String, ParseFailure> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ParseFailure::Invalid(format!("`{key}` must not be empty"))),
        None => Err(ParseFailure::Invalid(format!("missing required key `{key}`"))),
    }
}
