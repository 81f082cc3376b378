//! The include graph: taskfiles as vertices, include relationships as edges.
//!
//! Vertices are keyed by location identity so that re-encountering the same
//! taskfile through a different path is a no-op rather than a duplicate or a
//! false cycle. Edges are additive: several include declarations between the
//! same pair of taskfiles share one edge whose payload lists them all and
//! whose weight equals that list's length.
//!
//! Every mutation, including the cycle check, happens through `&mut self`, so
//! a caller holding the graph behind one lock gets atomic check-and-insert
//! semantics for free.

use crate::error::{Error, Result};
use crate::types::{Include, Taskfile};
use petgraph::algo::has_path_connecting;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

/// A graph vertex: one taskfile, identified by its location identity.
///
/// The taskfile payload is `None` between the moment the vertex is claimed
/// and the moment parsing completes, which is what lets concurrent branches
/// detect in-flight duplicates before the content is available.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub uri: String,
    pub taskfile: Option<Taskfile>,
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Edge payload: every include declaration responsible for this edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeData {
    pub includes: Vec<Include>,
}

impl EdgeData {
    /// Edge weight, defined as the number of includes it carries.
    pub fn weight(&self) -> usize {
        self.includes.len()
    }
}

impl fmt::Display for EdgeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.weight())
    }
}

/// Directed acyclic graph of taskfiles linked by include declarations.
#[derive(Debug, Clone, Default)]
pub struct TaskfileGraph {
    graph: DiGraph<Vertex, EdgeData>,
    indices: HashMap<String, NodeIndex>,
}

impl TaskfileGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a vertex for `uri`. Returns `false` if the vertex already
    /// exists, in which case the graph is left untouched.
    pub fn add_vertex(&mut self, uri: &str) -> bool {
        if self.indices.contains_key(uri) {
            return false;
        }
        let index = self.graph.add_node(Vertex {
            uri: uri.to_string(),
            taskfile: None,
        });
        self.indices.insert(uri.to_string(), index);
        true
    }

    /// Attach the parsed taskfile to an existing vertex.
    pub fn attach_taskfile(&mut self, uri: &str, taskfile: Taskfile) {
        if let Some(&index) = self.indices.get(uri) {
            self.graph[index].taskfile = Some(taskfile);
        }
    }

    /// Insert or extend the edge `from -> to` with one include declaration.
    ///
    /// An insertion that would close a cycle is rejected with
    /// [`Error::Cycle`] and leaves the graph unchanged. Appending to an
    /// existing edge cannot introduce a cycle and always succeeds.
    pub fn add_edge(&mut self, from: &str, to: &str, include: Include) -> Result<()> {
        let (from_idx, to_idx) = match (self.indices.get(from), self.indices.get(to)) {
            (Some(&f), Some(&t)) => (f, t),
            _ => {
                return Err(Error::Location {
                    uri: to.to_string(),
                    reason: "edge references a taskfile that was never added".to_string(),
                });
            }
        };

        if let Some(edge) = self.graph.find_edge(from_idx, to_idx) {
            self.graph[edge].includes.push(include);
            return Ok(());
        }

        // A new edge from -> to closes a cycle exactly when to already
        // reaches from (self-includes count too).
        if from_idx == to_idx || has_path_connecting(&self.graph, to_idx, from_idx, None) {
            return Err(Error::Cycle {
                source_uri: from.to_string(),
                dest_uri: to.to_string(),
            });
        }

        self.graph.add_edge(
            from_idx,
            to_idx,
            EdgeData {
                includes: vec![include],
            },
        );
        Ok(())
    }

    /// Look up a vertex's parsed taskfile.
    pub fn taskfile(&self, uri: &str) -> Option<&Taskfile> {
        self.indices
            .get(uri)
            .and_then(|&index| self.graph[index].taskfile.as_ref())
    }

    /// Look up the edge payload between two vertices.
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeData> {
        let from_idx = *self.indices.get(from)?;
        let to_idx = *self.indices.get(to)?;
        let edge = self.graph.find_edge(from_idx, to_idx)?;
        Some(&self.graph[edge])
    }

    /// Iterate all vertices. Ordering follows discovery order among
    /// concurrent branches and is not deterministic.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Render the graph in graphviz dot format.
    pub fn dot(&self) -> String {
        format!(
            "{}",
            Dot::with_config(&self.graph, &[Config::GraphContentOnly])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn include(namespace: &str) -> Include {
        Include {
            namespace: namespace.to_string(),
            taskfile: format!("./{namespace}/Taskfile.yml"),
            ..Include::default()
        }
    }

    #[test]
    fn add_vertex_is_idempotent() {
        let mut graph = TaskfileGraph::new();
        assert!(graph.add_vertex("a"));
        assert!(!graph.add_vertex("a"));
        assert_eq!(graph.vertex_count(), 1);
    }

    #[test]
    fn repeated_includes_share_one_edge() {
        let mut graph = TaskfileGraph::new();
        graph.add_vertex("a");
        graph.add_vertex("b");
        graph.add_edge("a", "b", include("first")).unwrap();
        graph.add_edge("a", "b", include("second")).unwrap();

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("a", "b").unwrap();
        assert_eq!(edge.includes.len(), 2);
        assert_eq!(edge.weight(), 2);
        assert_eq!(edge.includes[0].namespace, "first");
        assert_eq!(edge.includes[1].namespace, "second");
    }

    #[test]
    fn closing_edge_is_rejected_as_cycle() {
        let mut graph = TaskfileGraph::new();
        graph.add_vertex("a");
        graph.add_vertex("b");
        graph.add_vertex("c");
        graph.add_edge("a", "b", include("b")).unwrap();
        graph.add_edge("b", "c", include("c")).unwrap();

        let err = graph.add_edge("c", "a", include("a")).unwrap_err();
        match err {
            Error::Cycle {
                source_uri,
                dest_uri,
            } => {
                assert_eq!(source_uri, "c");
                assert_eq!(dest_uri, "a");
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
        // The rejected edge must not have been applied.
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn self_include_is_a_cycle() {
        let mut graph = TaskfileGraph::new();
        graph.add_vertex("a");
        let err = graph.add_edge("a", "a", include("a")).unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut graph = TaskfileGraph::new();
        for uri in ["a", "b", "c", "d"] {
            graph.add_vertex(uri);
        }
        graph.add_edge("a", "b", include("b")).unwrap();
        graph.add_edge("a", "c", include("c")).unwrap();
        graph.add_edge("b", "d", include("d")).unwrap();
        graph.add_edge("c", "d", include("d")).unwrap();

        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);
    }
}
