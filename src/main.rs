//! Taskfile resolver CLI.
//!
//! Resolves a root taskfile into an include graph and reports it, mapping
//! each resolver error kind to a distinct exit code.

use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use taskfile_graph::cache::Cache;
use taskfile_graph::cli::Cli;
use taskfile_graph::reader::{DebugFn, PromptFn};
use taskfile_graph::{Error, LocationOpts, Reader, ReaderConfig, new_location};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskfile-graph: {err:#}");
            let code = err
                .downcast_ref::<Error>()
                .map(Error::code)
                .unwrap_or(1);
            ExitCode::from(code.clamp(0, 255) as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.clear_cache {
        let cache = Cache::new(&cli.cache_dir())?;
        cache.clear()?;
        return Ok(());
    }

    let opts = LocationOpts {
        insecure: cli.insecure,
        timeout: cli.fetch_timeout(),
    };
    let root = new_location(&cli.entrypoint, &cli.dir, &opts, None)?;

    let debug_sink: DebugFn = Arc::new(|message: &str| debug!("{message}"));
    let prompt_sink: Option<PromptFn> = if cli.yes {
        None
    } else {
        Some(Arc::new(prompt_on_terminal))
    };
    let config = ReaderConfig {
        insecure: cli.insecure,
        download: cli.download,
        offline: cli.offline,
        timeout: cli.fetch_timeout(),
        temp_dir: cli.cache_dir(),
        debug: Some(debug_sink),
        prompt: prompt_sink,
    };

    let reader = Reader::new(root, config);
    reader.read().await?;
    let graph = reader.into_graph();

    if cli.dot {
        print!("digraph taskfiles {{\n{}}}\n", graph.dot());
        return Ok(());
    }

    if cli.list {
        for vertex in graph.vertices() {
            let Some(taskfile) = &vertex.taskfile else {
                continue;
            };
            for (name, task) in &taskfile.tasks.0 {
                if task.internal {
                    continue;
                }
                match &task.desc {
                    Some(desc) => println!("{name}: {desc}  ({})", task.taskfile),
                    None => println!("{name}  ({})", task.taskfile),
                }
            }
        }
        return Ok(());
    }

    println!(
        "resolved {} taskfile(s) linked by {} include edge(s)",
        graph.vertex_count(),
        graph.edge_count()
    );
    Ok(())
}

/// Interactive trust prompt on the controlling terminal.
fn prompt_on_terminal(message: &str) -> bool {
    eprint!("{message} [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
