//! Publishing a finished output tree.
//!
//! Publishing runs after a build, takes the materialized output directory and
//! a destination descriptor, and puts a copy of the site there. The build
//! pipeline itself never publishes.
//!
//! ## Destination descriptors
//!
//! ```text
//! /srv/www                    local directory
//! file:/srv/www               local directory, explicit
//! sftp:example.com:deploy:pw  remote: protocol:server[:uid[:pwd]]
//! ```
//!
//! Only local destinations have a transport. Remote descriptors parse, but
//! publishing to them fails with [`PublishError::Unsupported`]; no network
//! I/O happens here.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
    #[error("Publishing over '{0}' is not supported")]
    Unsupported(String),
    #[error("Output directory does not exist: {0}")]
    MissingOutput(PathBuf),
    #[error("IO error publishing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Where a site gets published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Local(PathBuf),
    Remote {
        protocol: String,
        server: String,
        user: Option<String>,
        password: Option<String>,
    },
}

impl Destination {
    /// Parse a `[protocol:]server[:uid[:pwd]]` descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, PublishError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(PublishError::InvalidDestination(
                "empty destination".into(),
            ));
        }

        let Some((protocol, rest)) = descriptor.split_once(':') else {
            return Ok(Destination::Local(PathBuf::from(descriptor)));
        };

        if protocol.eq_ignore_ascii_case("file") {
            if rest.is_empty() {
                return Err(PublishError::InvalidDestination(
                    "file: destination needs a path".into(),
                ));
            }
            return Ok(Destination::Local(PathBuf::from(rest)));
        }

        let mut parts = rest.splitn(3, ':');
        let server = parts.next().unwrap_or_default();
        if protocol.is_empty() || server.is_empty() {
            return Err(PublishError::InvalidDestination(format!(
                "expected protocol:server[:uid[:pwd]], got '{descriptor}'"
            )));
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Ok(Destination::Remote {
            protocol: protocol.to_ascii_lowercase(),
            server: server.to_string(),
            user: parts.next().and_then(non_empty),
            password: parts.next().and_then(non_empty),
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Local(path) => write!(f, "{}", path.display()),
            Destination::Remote {
                protocol,
                server,
                user,
                ..
            } => match user {
                Some(user) => write!(f, "{protocol}:{server}:{user}"),
                None => write!(f, "{protocol}:{server}"),
            },
        }
    }
}

/// Summary of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub destination: String,
    pub files_copied: usize,
}

/// A transport that moves a finished output tree to its destination.
pub trait Publisher {
    fn publish(&self, output_dir: &Path) -> Result<PublishReport, PublishError>;
}

/// Pick the transport for a destination.
pub fn publisher_for(destination: &Destination) -> Result<Box<dyn Publisher>, PublishError> {
    match destination {
        Destination::Local(path) => Ok(Box::new(LocalPublisher::new(path))),
        Destination::Remote { protocol, .. } => Err(PublishError::Unsupported(protocol.clone())),
    }
}

/// Mirrors the output tree into a local directory, overwriting existing files.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    dest: PathBuf,
}

impl LocalPublisher {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl Publisher for LocalPublisher {
    fn publish(&self, output_dir: &Path) -> Result<PublishReport, PublishError> {
        if !output_dir.is_dir() {
            return Err(PublishError::MissingOutput(output_dir.to_path_buf()));
        }
        if self.dest.starts_with(output_dir) {
            return Err(PublishError::InvalidDestination(format!(
                "{} is inside the output directory",
                self.dest.display()
            )));
        }

        let mut files_copied = 0;
        for entry in WalkDir::new(output_dir).sort_by_file_name() {
            let entry = entry?;
            let Ok(rel) = entry.path().strip_prefix(output_dir) else {
                continue;
            };
            let target = self.dest.join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|source| PublishError::Io {
                    path: target.clone(),
                    source,
                })?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &target).map_err(|source| PublishError::Io {
                    path: target.clone(),
                    source,
                })?;
                files_copied += 1;
            }
        }

        tracing::info!(
            destination = %self.dest.display(),
            files = files_copied,
            "Site published"
        );
        Ok(PublishReport {
            destination: self.dest.display().to_string(),
            files_copied,
        })
    }
}
