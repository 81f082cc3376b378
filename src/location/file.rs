//! Local filesystem locations.

use super::{Location, is_remote_reference};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names searched, in order, when an entrypoint names a directory.
const DEFAULT_NAMES: &[&str] = &[
    "Taskfile.yml",
    "taskfile.yml",
    "Taskfile.yaml",
    "taskfile.yaml",
    "Taskfile.dist.yml",
    "Taskfile.dist.yaml",
];

/// A taskfile on the local filesystem.
///
/// Construction fails if the file does not exist, which is what allows
/// optional includes of missing files to be skipped cleanly.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
    dir: PathBuf,
    identity: String,
}

impl FileLocation {
    /// Resolve `entrypoint` to an existing taskfile. A relative entrypoint
    /// is resolved against the current working directory; an entrypoint
    /// naming a directory is searched for the default taskfile names.
    pub fn new(entrypoint: &str, dir: &str) -> Result<Self> {
        let raw = PathBuf::from(entrypoint);
        let absolute = if raw.is_absolute() {
            raw
        } else {
            std::env::current_dir()?.join(raw)
        };

        // Canonicalizing gives one stable identity per file, so the same
        // taskfile reached through different relative references maps to one
        // graph vertex.
        let mut path = std::fs::canonicalize(&absolute).map_err(|err| Error::Location {
            uri: absolute.to_string_lossy().into_owned(),
            reason: err.to_string(),
        })?;

        if path.is_dir() {
            path = Self::discover(&path)?;
        }

        let dir = if dir.is_empty() {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() {
                dir
            } else {
                std::env::current_dir()?.join(dir)
            }
        };

        let identity = path.to_string_lossy().into_owned();
        Ok(Self {
            path,
            dir,
            identity,
        })
    }

    /// Search a directory for the default taskfile names.
    fn discover(dir: &Path) -> Result<PathBuf> {
        for name in DEFAULT_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(Error::Location {
            uri: dir.to_string_lossy().into_owned(),
            reason: "no taskfile found in directory".to_string(),
        })
    }

    /// Base directory used when resolving relative child references.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Location for FileLocation {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn read(&self, timeout: Duration) -> Result<Vec<u8>> {
        // A local deadline overrun is an ordinary I/O error, not a network
        // timeout, so it never triggers the remote cache fallback.
        let bytes = tokio::time::timeout(timeout, tokio::fs::read(&self.path))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("reading {} timed out", self.identity),
                )
            })??;
        Ok(bytes)
    }

    fn resolve_entrypoint(&self, reference: &str) -> Result<String> {
        if is_remote_reference(reference) {
            return Ok(reference.to_string());
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            Ok(reference.to_string())
        } else {
            Ok(self.dir.join(path).to_string_lossy().into_owned())
        }
    }

    fn resolve_dir(&self, reference: &str) -> Result<String> {
        if reference.is_empty() {
            return Ok(self.dir.to_string_lossy().into_owned());
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            Ok(reference.to_string())
        } else {
            Ok(self.dir.join(path).to_string_lossy().into_owned())
        }
    }
}
