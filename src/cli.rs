//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve a Taskfile and every taskfile it transitively includes into a
/// dependency graph.
#[derive(Debug, Parser)]
#[command(name = "taskfile-graph", version, about)]
pub struct Cli {
    /// Taskfile to resolve: a path, a directory containing one, or an
    /// https:// URL.
    #[arg(short = 't', long = "taskfile", default_value = ".")]
    pub entrypoint: String,

    /// Base directory for the root taskfile.
    #[arg(short = 'd', long, default_value = "")]
    pub dir: String,

    /// Permit fetching over unverified transports.
    #[arg(long)]
    pub insecure: bool,

    /// Force a fresh download of remote taskfiles; never silently fall back
    /// to the cache on timeout.
    #[arg(long)]
    pub download: bool,

    /// Disable network access; cached copies are the only remote source.
    #[arg(long)]
    pub offline: bool,

    /// Per-fetch timeout in seconds.
    #[arg(long, default_value_t = 10, value_name = "SECONDS")]
    pub timeout: u64,

    /// Directory for the remote taskfile cache.
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Accept every trust prompt without asking.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// List resolved tasks with their provenance.
    #[arg(short, long)]
    pub list: bool,

    /// Print the include graph in graphviz dot format.
    #[arg(long)]
    pub dot: bool,

    /// Remove every cached remote taskfile and exit.
    #[arg(long)]
    pub clear_cache: bool,

    /// Enable debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("taskfile-graph"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reader_defaults() {
        let cli = Cli::parse_from(["taskfile-graph"]);
        assert_eq!(cli.entrypoint, ".");
        assert_eq!(cli.fetch_timeout(), Duration::from_secs(10));
        assert!(!cli.insecure);
        assert!(!cli.offline);
        assert!(!cli.download);
    }

    #[test]
    fn parses_resolution_flags() {
        let cli = Cli::parse_from([
            "taskfile-graph",
            "-t",
            "https://example.com/Taskfile.yml",
            "--offline",
            "--timeout",
            "3",
            "--yes",
        ]);
        assert_eq!(cli.entrypoint, "https://example.com/Taskfile.yml");
        assert!(cli.offline);
        assert!(cli.yes);
        assert_eq!(cli.fetch_timeout(), Duration::from_secs(3));
    }
}
