//! The reader: recursive concurrent taskfile resolution.
//!
//! Given a root [`Location`] and a [`ReaderConfig`], the [`Reader`] fetches,
//! parses, and links every transitively included taskfile into a
//! [`TaskfileGraph`]. Each include declaration is processed on its own tokio
//! task; a parent waits for all of its direct children and surfaces the first
//! error without cancelling siblings already in flight.
//!
//! Remote content goes through the on-disk cache and a checksum-based trust
//! gate: unseen or changed content prompts the caller before it is accepted,
//! and at most one prompt is in flight at a time.

use crate::cache::{self, Cache};
use crate::error::{Error, Result};
use crate::graph::TaskfileGraph;
use crate::location::{Location, LocationOpts, new_location};
use crate::snippet::Snippet;
use crate::templater::Templater;
use crate::types::{Include, Taskfile, Vars};
use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

/// Sink for human-readable progress notices.
pub type DebugFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink for trust decisions. Returns `true` to accept the prompt.
pub type PromptFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Reader configuration, supplied once at construction.
#[derive(Clone)]
pub struct ReaderConfig {
    /// Permit fetching over unverified transports (plain http, invalid
    /// certificates).
    pub insecure: bool,
    /// Demand a fresh download: a fetch timeout is fatal instead of falling
    /// back to the cache.
    pub download: bool,
    /// Disable the network entirely; the cache is the only remote source.
    pub offline: bool,
    /// Per-fetch deadline. Defaults to 10 seconds.
    pub timeout: Duration,
    /// Root directory for cache storage. Defaults to the platform temp dir.
    pub temp_dir: PathBuf,
    /// Optional sink for progress notices.
    pub debug: Option<DebugFn>,
    /// Optional sink for trust decisions. When absent, every prompt is
    /// accepted.
    pub prompt: Option<PromptFn>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            insecure: false,
            download: false,
            offline: false,
            timeout: Duration::from_secs(10),
            temp_dir: std::env::temp_dir().join("taskfile-graph"),
            debug: None,
            prompt: None,
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("insecure", &self.insecure)
            .field("download", &self.download)
            .field("offline", &self.offline)
            .field("timeout", &self.timeout)
            .field("temp_dir", &self.temp_dir)
            .field("debug", &self.debug.is_some())
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

/// Recursively reads taskfiles from a root location and builds the include
/// graph. A reader resolves one root; it is not meant to be reused across
/// independent root documents.
pub struct Reader {
    shared: Arc<Shared>,
    root: Arc<dyn Location>,
}

struct Shared {
    config: ReaderConfig,
    graph: Mutex<TaskfileGraph>,
    // Serializes trust prompts so they never interleave, even when several
    // concurrent fetches need one.
    prompt_gate: tokio::sync::Mutex<()>,
}

impl Reader {
    pub fn new(root: Box<dyn Location>, config: ReaderConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                graph: Mutex::new(TaskfileGraph::new()),
                prompt_gate: tokio::sync::Mutex::new(()),
            }),
            root: Arc::from(root),
        }
    }

    /// Resolve the root taskfile and every transitive include, populating
    /// the graph. Returns the first error observed; the graph built up to
    /// that point stays available via [`Reader::graph`] or
    /// [`Reader::into_graph`].
    pub async fn read(&self) -> Result<()> {
        Arc::clone(&self.shared).include(Arc::clone(&self.root)).await
    }

    /// Snapshot of the graph built so far.
    pub fn graph(&self) -> TaskfileGraph {
        self.shared.graph.lock().expect("graph lock poisoned").clone()
    }

    /// Consume the reader, handing back the graph. Complete after a
    /// successful [`Reader::read`]; partial after a failed one.
    pub fn into_graph(self) -> TaskfileGraph {
        let Self { shared, root } = self;
        drop(root);
        match Arc::try_unwrap(shared) {
            Ok(shared) => shared.graph.into_inner().expect("graph lock poisoned"),
            Err(shared) => shared.graph.lock().expect("graph lock poisoned").clone(),
        }
    }
}

impl Shared {
    /// Resolve one taskfile and recurse into its includes.
    ///
    /// Boxed because the recursion depth follows the include graph.
    fn include(
        self: Arc<Self>,
        location: Arc<dyn Location>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            let uri = location.identity().to_string();

            // Claim the vertex. If it already exists, the taskfile has been
            // read (or is being read) and its children explored, so this
            // branch is done. This is what keeps diamond includes from being
            // reported as cycles or parsed twice.
            {
                let mut graph = self.graph.lock().expect("graph lock poisoned");
                if !graph.add_vertex(&uri) {
                    return Ok(());
                }
            }

            let taskfile = self.read_location(location.as_ref()).await?;
            {
                let mut graph = self.graph.lock().expect("graph lock poisoned");
                graph.attach_taskfile(&uri, taskfile.clone());
            }

            // The includer's merged environment: process environment
            // overridden by its own variable bindings.
            let mut vars = Vars::environ();
            vars.merge(&taskfile.vars);

            let mut branches = JoinSet::new();
            for declaration in taskfile.includes.iter().cloned() {
                branches.spawn(Arc::clone(&self).process_include(
                    Arc::clone(&location),
                    vars.clone(),
                    declaration,
                ));
            }

            // Wait for every branch and surface the first error observed.
            // Siblings already in flight are left to run to completion.
            let mut first_err = None;
            while let Some(joined) = branches.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                    Err(err) if err.is_panic() => {
                        std::panic::resume_unwind(err.into_panic())
                    }
                    // The reader never aborts branches.
                    Err(_) => {}
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    /// Process one include declaration: render its templates, resolve the
    /// child location, recurse, and link the edge.
    async fn process_include(
        self: Arc<Self>,
        parent: Arc<dyn Location>,
        vars: Vars,
        declaration: Include,
    ) -> Result<()> {
        let mut tpl = Templater::new(&vars);
        let mut declaration = Include {
            taskfile: tpl.replace(&declaration.taskfile),
            dir: tpl.replace(&declaration.dir),
            vars: tpl.replace_vars(&declaration.vars),
            ..declaration
        };
        tpl.finish()?;

        let entrypoint = parent.resolve_entrypoint(&declaration.taskfile)?;
        declaration.dir = parent.resolve_dir(&declaration.dir)?;

        let opts = LocationOpts {
            insecure: self.config.insecure,
            timeout: self.config.timeout,
        };
        let child = match new_location(
            &entrypoint,
            &declaration.dir,
            &opts,
            Some(parent.as_ref()),
        ) {
            Ok(child) => child,
            Err(err) => {
                if declaration.optional {
                    self.debug(&format!(
                        "[{}] skipped optional include {}: {err}",
                        parent.identity(),
                        declaration.namespace
                    ));
                    return Ok(());
                }
                return Err(err);
            }
        };
        let child: Arc<dyn Location> = Arc::from(child);

        Arc::clone(&self).include(Arc::clone(&child)).await?;

        let mut graph = self.graph.lock().expect("graph lock poisoned");
        graph.add_edge(parent.identity(), child.identity(), declaration)
    }

    async fn read_location(&self, location: &dyn Location) -> Result<Taskfile> {
        let bytes = self.load_content(location).await?;
        parse_taskfile(&bytes, location.identity())
    }

    /// Load raw content for a location, consulting the cache and the trust
    /// gate for remote ones.
    async fn load_content(&self, location: &dyn Location) -> Result<Vec<u8>> {
        if !location.is_remote() {
            return location.read(self.config.timeout).await;
        }

        let uri = location.identity();
        let remote_cache = Cache::new(&self.config.temp_dir)?;

        if self.config.offline {
            return match remote_cache.read(uri) {
                Ok(bytes) => {
                    self.debug(&format!("[{uri}] fetched cached copy"));
                    Ok(bytes)
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::CacheNotFound {
                    uri: uri.to_string(),
                }),
                Err(err) => Err(err.into()),
            };
        }

        match location.read(self.config.timeout).await {
            Ok(bytes) => self.trust(location, bytes, &remote_cache).await,
            Err(Error::NetworkTimeout { uri, timeout, .. }) => {
                // A timeout usually means a network problem. Fall back to
                // the cache, unless the caller demanded a fresh download.
                if self.config.download {
                    return Err(Error::NetworkTimeout {
                        uri,
                        timeout,
                        checked_cache: false,
                    });
                }
                match remote_cache.read(&uri) {
                    Ok(bytes) => {
                        self.debug(&format!("[{uri}] network timeout, fetched cached copy"));
                        Ok(bytes)
                    }
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        Err(Error::NetworkTimeout {
                            uri,
                            timeout,
                            checked_cache: true,
                        })
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Decide whether freshly fetched remote bytes are trusted, prompting
    /// when the content is unseen or has changed since last cached.
    async fn trust(
        &self,
        location: &dyn Location,
        bytes: Vec<u8>,
        remote_cache: &Cache,
    ) -> Result<Vec<u8>> {
        let uri = location.identity();
        self.debug(&format!("[{uri}] fetched remote copy"));

        let sum = cache::checksum(&bytes);
        let message = match remote_cache.read_checksum(uri).as_deref() {
            None => Some(untrusted_prompt(uri)),
            Some(cached) if cached != sum => Some(changed_prompt(uri)),
            Some(_) => None,
        };

        if let Some(message) = message {
            let accepted = {
                let _gate = self.prompt_gate.lock().await;
                self.prompt(&message)
            };
            if !accepted {
                return Err(Error::NotTrusted {
                    uri: uri.to_string(),
                });
            }
            remote_cache.write_checksum(uri, &sum)?;
            self.debug(&format!("[{uri}] caching downloaded file"));
            remote_cache.write(uri, &bytes)?;
        }

        Ok(bytes)
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
        if let Some(debug) = &self.config.debug {
            debug(message);
        }
    }

    fn prompt(&self, message: &str) -> bool {
        match &self.config.prompt {
            Some(prompt) => prompt(message),
            None => true,
        }
    }
}

/// Parse raw bytes into a taskfile and stamp provenance.
fn parse_taskfile(bytes: &[u8], uri: &str) -> Result<Taskfile> {
    let mut taskfile: Taskfile = match serde_yaml::from_slice(bytes) {
        Ok(taskfile) => taskfile,
        Err(err) => {
            return Err(match err.location() {
                Some(position) => Error::Decode {
                    uri: uri.to_string(),
                    line: position.line(),
                    column: position.column(),
                    message: err.to_string(),
                    snippet: Snippet::new(bytes, position.line(), position.column())
                        .to_string(),
                },
                None => Error::InvalidDocument {
                    uri: uri.to_string(),
                    source: err,
                },
            });
        }
    };

    if taskfile.version.is_none() {
        return Err(Error::VersionMissing {
            uri: uri.to_string(),
        });
    }

    taskfile.location = uri.to_string();
    for task in taskfile.tasks.0.values_mut() {
        // A task may already carry provenance from an earlier merge step.
        if task.taskfile.is_empty() {
            task.taskfile = uri.to_string();
        }
    }
    Ok(taskfile)
}

fn untrusted_prompt(uri: &str) -> String {
    format!(
        "The task you are attempting to run depends on the remote taskfile at {uri:?}.\n\
         --- Make sure you trust the source of this taskfile before continuing ---\n\
         Continue?"
    )
}

fn changed_prompt(uri: &str) -> String {
    format!(
        "The taskfile at {uri:?} has changed since you last used it!\n\
         --- Make sure you trust the source of this taskfile before continuing ---\n\
         Continue?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_version_missing() {
        let err = parse_taskfile(b"tasks:\n  build:\n", "file:///Taskfile.yml").unwrap_err();
        match err {
            Error::VersionMissing { uri } => assert_eq!(uri, "file:///Taskfile.yml"),
            other => panic!("expected version missing, got {other:?}"),
        }
    }

    #[test]
    fn parse_enriches_decode_errors_with_snippet() {
        let doc = b"version: '3'\ntasks: ]\nvars:\n  A: 1\n";
        let err = parse_taskfile(doc, "/work/Taskfile.yml").unwrap_err();
        match err {
            Error::Decode { uri, line, snippet, .. } => {
                assert_eq!(uri, "/work/Taskfile.yml");
                assert!(line > 0);
                assert!(snippet.contains('|'));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn parse_stamps_provenance() {
        let doc = b"version: '3'\ntasks:\n  build:\n    desc: x\n  stub:\n";
        let taskfile = parse_taskfile(doc, "/work/Taskfile.yml").unwrap();
        assert_eq!(taskfile.location, "/work/Taskfile.yml");
        for task in taskfile.tasks.0.values() {
            assert_eq!(task.taskfile, "/work/Taskfile.yml");
        }
    }

    #[test]
    fn prompts_name_the_location() {
        assert!(untrusted_prompt("https://x/T.yml").contains("https://x/T.yml"));
        assert!(changed_prompt("https://x/T.yml").contains("has changed"));
    }
}
