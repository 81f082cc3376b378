//! Persistent cache for remote taskfile content and checksums.
//!
//! Each remote location gets one content blob and one checksum record under
//! the configured temp root, addressed by the SHA-256 of its identity string.
//! Content and checksum are written independently so a trust decision can
//! persist the checksum without rewriting the blob, and vice versa. The cache
//! survives process restarts; concurrent readers are safe, concurrent writers
//! to the same identity are not (accepted limitation).

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// SHA-256 checksum of `content`, hex encoded.
pub fn checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// On-disk cache for remote taskfiles.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Open (and create if needed) the cache under `temp_dir`.
    pub fn new(temp_dir: &Path) -> io::Result<Self> {
        let dir = temp_dir.join("remote");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Stable cache key for a location identity.
    fn key(uri: &str) -> String {
        hex::encode(Sha256::digest(uri.as_bytes()))
    }

    fn content_path(&self, uri: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", Self::key(uri)))
    }

    fn checksum_path(&self, uri: &str) -> PathBuf {
        self.dir.join(format!("{}.checksum", Self::key(uri)))
    }

    /// Read the cached content for `uri`. Returns a `NotFound` I/O error if
    /// no copy has been cached.
    pub fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        fs::read(self.content_path(uri))
    }

    /// Write the content blob for `uri`.
    pub fn write(&self, uri: &str, content: &[u8]) -> io::Result<()> {
        fs::write(self.content_path(uri), content)
    }

    /// Read the last recorded checksum for `uri`, if any.
    pub fn read_checksum(&self, uri: &str) -> Option<String> {
        fs::read_to_string(self.checksum_path(uri))
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Record the checksum for `uri` without touching the content blob.
    pub fn write_checksum(&self, uri: &str, sum: &str) -> io::Result<()> {
        fs::write(self.checksum_path(uri), sum)
    }

    /// Remove every cached blob and checksum.
    pub fn clear(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir)?;
        fs::create_dir_all(&self.dir)
    }
}
