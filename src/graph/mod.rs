//! Per-request graph construction.
//!
//! A [`Graph`] is built from a decoded edge list, validated against
//! [`GraphLimits`] and dropped at the end of the request. Vertices are
//! stored densely in first-appearance order; that order is what the path
//! engine uses to break distance ties.

pub mod path;

pub use path::{find_path, PathResult};

use crate::wire::{Edge, Node};
use std::collections::HashMap;
use thiserror::Error;

/// Default minimum number of distinct vertices.
pub const DEFAULT_MIN_VERTICES: usize = 2;
/// Default maximum number of distinct vertices.
pub const DEFAULT_MAX_VERTICES: usize = 1000;
/// Default minimum number of edges.
pub const DEFAULT_MIN_EDGES: usize = 1;
/// Default maximum number of edges (fits a 4096-byte frame or datagram).
pub const DEFAULT_MAX_EDGES: usize = 500;

/// Size bounds a request graph must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphLimits {
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub min_edges: usize,
    pub max_edges: usize,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            min_vertices: DEFAULT_MIN_VERTICES,
            max_vertices: DEFAULT_MAX_VERTICES,
            min_edges: DEFAULT_MIN_EDGES,
            max_edges: DEFAULT_MAX_EDGES,
        }
    }
}

/// Graph validation failures. All of them are answered with `INVALID_REQUEST`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph too small: {vertices} vertices, {edges} edges")]
    TooSmall { vertices: usize, edges: usize },

    #[error("graph too large: {vertices} vertices, {edges} edges")]
    TooLarge { vertices: usize, edges: usize },

    #[error("vertex {0} not present in graph")]
    MissingVertex(Node),
}

/// Undirected adjacency structure for one request.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node id -> dense index.
    index: HashMap<Node, usize>,
    /// Dense index -> node id, in first-appearance order.
    nodes: Vec<Node>,
    /// Dense index -> adjacent dense indices, in edge order.
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl Graph {
    /// Build a graph from `edges`, enforcing `limits`.
    ///
    /// Minimum bounds are checked before maximum bounds.
    pub fn build(edges: &[Edge], limits: &GraphLimits) -> Result<Self, GraphError> {
        let mut graph = Graph {
            edge_count: edges.len(),
            ..Graph::default()
        };
        for edge in edges {
            graph.intern(edge.from);
            graph.intern(edge.to);
        }

        let vertices = graph.nodes.len();
        let edges_len = edges.len();
        if vertices < limits.min_vertices || edges_len < limits.min_edges {
            return Err(GraphError::TooSmall {
                vertices,
                edges: edges_len,
            });
        }
        if vertices > limits.max_vertices || edges_len > limits.max_edges {
            return Err(GraphError::TooLarge {
                vertices,
                edges: edges_len,
            });
        }

        graph.adjacency = vec![Vec::new(); vertices];
        for edge in edges {
            let from = graph.index[&edge.from];
            let to = graph.index[&edge.to];
            graph.adjacency[from].push(to);
            graph.adjacency[to].push(from);
        }
        Ok(graph)
    }

    fn intern(&mut self, node: Node) {
        if !self.index.contains_key(&node) {
            self.index.insert(node, self.nodes.len());
            self.nodes.push(node);
        }
    }

    /// Number of distinct vertices.
    pub fn vertex_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges as received, duplicates included.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, node: Node) -> bool {
        self.index.contains_key(&node)
    }

    /// True when both `a` and `b` are endpoints of some edge.
    pub fn contains_vertices(&self, a: Node, b: Node) -> bool {
        self.contains(a) && self.contains(b)
    }

    /// Like [`Graph::contains_vertices`] but names the first missing vertex.
    pub fn check_vertices(&self, a: Node, b: Node) -> Result<(), GraphError> {
        for node in [a, b] {
            if !self.contains(node) {
                return Err(GraphError::MissingVertex(node));
            }
        }
        Ok(())
    }

    /// Neighbours of `node` in edge order. Empty for unknown nodes.
    pub fn neighbors(&self, node: Node) -> impl Iterator<Item = Node> + '_ {
        self.index
            .get(&node)
            .map(|&i| self.adjacency[i].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&j| self.nodes[j])
    }

    pub(crate) fn index_of(&self, node: Node) -> Option<usize> {
        self.index.get(&node).copied()
    }

    pub(crate) fn node_at(&self, index: usize) -> Node {
        self.nodes[index]
    }

    pub(crate) fn adjacent(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(Node, Node)]) -> Vec<Edge> {
        pairs.iter().copied().map(Edge::from).collect()
    }

    #[test]
    fn test_build_counts() {
        let graph = Graph::build(&edges(&[(0, 1), (1, 2), (2, 3)]), &GraphLimits::default()).unwrap();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_duplicate_edges_counted() {
        let graph = Graph::build(&edges(&[(0, 1), (0, 1)]), &GraphLimits::default()).unwrap();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_undirected_neighbors() {
        let graph = Graph::build(&edges(&[(5, 7), (7, 9)]), &GraphLimits::default()).unwrap();
        assert_eq!(graph.neighbors(7).collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(graph.neighbors(5).collect::<Vec<_>>(), vec![7]);
        assert_eq!(graph.neighbors(42).count(), 0);
    }

    #[test]
    fn test_empty_is_too_small() {
        assert_eq!(
            Graph::build(&[], &GraphLimits::default()).unwrap_err(),
            GraphError::TooSmall {
                vertices: 0,
                edges: 0
            }
        );
    }

    #[test]
    fn test_too_large() {
        let limits = GraphLimits {
            max_vertices: 3,
            ..GraphLimits::default()
        };
        let err = Graph::build(&edges(&[(0, 1), (1, 2), (2, 3)]), &limits).unwrap_err();
        assert_eq!(
            err,
            GraphError::TooLarge {
                vertices: 4,
                edges: 3
            }
        );

        let limits = GraphLimits {
            max_edges: 2,
            ..GraphLimits::default()
        };
        assert!(matches!(
            Graph::build(&edges(&[(0, 1), (1, 0), (0, 1)]), &limits),
            Err(GraphError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_min_checked_before_max() {
        let limits = GraphLimits {
            min_vertices: 5,
            max_edges: 1,
            ..GraphLimits::default()
        };
        assert!(matches!(
            Graph::build(&edges(&[(0, 1), (1, 2)]), &limits),
            Err(GraphError::TooSmall { .. })
        ));
    }

    #[test]
    fn test_contains_vertices() {
        let graph = Graph::build(&edges(&[(0, 1), (2, 3)]), &GraphLimits::default()).unwrap();
        assert!(graph.contains_vertices(0, 3));
        assert!(graph.contains_vertices(2, 2));
        assert!(!graph.contains_vertices(0, 99));
        assert_eq!(
            graph.check_vertices(99, 0),
            Err(GraphError::MissingVertex(99))
        );
        assert_eq!(graph.check_vertices(1, 2), Ok(()));
    }
}
