//! Error types surfaced by the resolver.
//!
//! Each variant corresponds to one failure kind a caller may want to react to
//! distinctly; [`Error::code`] maps them to stable process exit codes so a
//! binary can translate a failed resolution into a meaningful exit status.

use std::time::Duration;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur while resolving a taskfile graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Adding an include edge would close a cycle in the graph.
    #[error("include cycle detected: {source_uri} -> {dest_uri}")]
    Cycle { source_uri: String, dest_uri: String },

    /// The taskfile content is not valid YAML per the document syntax.
    #[error("failed to decode taskfile\n{uri}:{line}:{column}: {message}\n{snippet}")]
    Decode {
        uri: String,
        line: usize,
        column: usize,
        message: String,
        snippet: String,
    },

    /// The content decoded but failed structural validation.
    #[error("taskfile {uri} is invalid: {source}")]
    InvalidDocument {
        uri: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The taskfile does not declare a schema version.
    #[error("taskfile {uri} does not declare a schema version")]
    VersionMissing { uri: String },

    /// Offline mode requested a remote taskfile with no cached copy.
    #[error("no cached copy of {uri} and network access is disabled")]
    CacheNotFound { uri: String },

    /// A remote fetch exceeded its deadline.
    #[error(
        "timed out fetching {uri} after {timeout:?}{}",
        if *checked_cache { " (no cached copy was found)" } else { "" }
    )]
    NetworkTimeout {
        uri: String,
        timeout: Duration,
        /// True when a cache fallback was also attempted and came up empty.
        checked_cache: bool,
    },

    /// The user rejected the trust prompt for a remote taskfile.
    #[error("remote taskfile {uri} was not trusted and the run was stopped")]
    NotTrusted { uri: String },

    /// A child location could not be constructed or resolved.
    #[error("cannot resolve taskfile location {uri}: {reason}")]
    Location { uri: String, reason: String },

    /// A remote fetch failed for a reason other than a timeout.
    #[error("failed to fetch {uri}: {reason}")]
    Network { uri: String, reason: String },

    /// A templated string in an include declaration could not be rendered.
    #[error("cannot render template expression {expression:?}: {reason}")]
    Template { expression: String, reason: String },

    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable process exit code for this error kind.
    ///
    /// Zero is reserved for success and one for failures outside this
    /// taxonomy, so every variant maps into the 100+ range.
    pub fn code(&self) -> i32 {
        match self {
            Error::Location { .. } => 100,
            Error::Decode { .. } => 101,
            Error::InvalidDocument { .. } => 102,
            Error::VersionMissing { .. } => 103,
            Error::CacheNotFound { .. } => 104,
            Error::NetworkTimeout { .. } => 105,
            Error::NotTrusted { .. } => 106,
            Error::Cycle { .. } => 107,
            Error::Network { .. } => 108,
            Error::Template { .. } => 109,
            Error::Io(_) => 1,
        }
    }
}
