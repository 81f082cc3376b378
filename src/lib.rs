//! Taskfile resolver library.
//!
//! Recursively discovers, fetches, parses, and links a root taskfile and all
//! of its transitive includes into a directed acyclic graph, with a
//! persistent cache and checksum-based trust prompts for remote content.

pub mod cache;
pub mod cli;
pub mod error;
pub mod graph;
pub mod location;
pub mod reader;
pub mod snippet;
pub mod templater;
pub mod types;

pub use error::{Error, Result};
pub use graph::TaskfileGraph;
pub use location::{FileLocation, HttpLocation, Location, LocationOpts, new_location};
pub use reader::{Reader, ReaderConfig};
pub use types::{Include, Taskfile, Vars};
