//! Locations: abstract references to taskfile documents.
//!
//! A [`Location`] is either a local file or a remote URL. The reader never
//! branches on which; everything it needs (identity, remoteness, reading
//! under a deadline, resolving child references) goes through the trait.

mod file;
mod http;

pub use file::FileLocation;
pub use http::HttpLocation;

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Policy carried into location construction: the reader's insecure and
/// timeout settings apply to every child location it creates.
#[derive(Debug, Clone, Copy)]
pub struct LocationOpts {
    pub insecure: bool,
    pub timeout: Duration,
}

impl Default for LocationOpts {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: Duration::from_secs(10),
        }
    }
}

/// An abstract reference to a taskfile document.
#[async_trait]
pub trait Location: fmt::Debug + Send + Sync {
    /// Canonical identity, used as the graph key and the cache key.
    fn identity(&self) -> &str;

    /// Whether reading this location requires network access.
    fn is_remote(&self) -> bool;

    /// Yield the raw document bytes within `timeout`.
    ///
    /// Remote locations report a deadline overrun as
    /// [`Error::NetworkTimeout`](crate::Error::NetworkTimeout); local ones
    /// report it as a plain I/O error.
    async fn read(&self, timeout: Duration) -> Result<Vec<u8>>;

    /// Resolve a (possibly relative) child taskfile reference against this
    /// location, yielding an absolute path or URL.
    fn resolve_entrypoint(&self, reference: &str) -> Result<String>;

    /// Resolve a (possibly relative) base directory against this location.
    fn resolve_dir(&self, reference: &str) -> Result<String>;
}

/// Construct a location for `entrypoint`, dispatching on its scheme.
///
/// A relative entrypoint is resolved against `parent` when one is given.
/// `dir` is the base directory for the new location (empty means "derive
/// from the entrypoint").
pub fn new_location(
    entrypoint: &str,
    dir: &str,
    opts: &LocationOpts,
    parent: Option<&dyn Location>,
) -> Result<Box<dyn Location>> {
    let entrypoint = match parent {
        Some(parent) => parent.resolve_entrypoint(entrypoint)?,
        None => entrypoint.to_string(),
    };
    if is_remote_reference(&entrypoint) {
        Ok(Box::new(HttpLocation::new(&entrypoint, opts)?))
    } else {
        Ok(Box::new(FileLocation::new(&entrypoint, dir)?))
    }
}

/// Whether a reference names a remote document.
pub(crate) fn is_remote_reference(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}
