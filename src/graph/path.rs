//! Single-source shortest path over a request graph.
//!
//! Dijkstra with a binary heap. Every edge has weight [`EDGE_WEIGHT`], so the
//! result matches a breadth-first search, but relaxation is kept explicit.
//! Heap entries are `(distance, dense index)`, so equal distances pop in
//! vertex first-appearance order and results are reproducible.

use super::Graph;
use crate::wire::Node;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Cost of traversing one edge.
pub const EDGE_WEIGHT: u32 = 1;

const INF: u32 = u32::MAX;

/// Outcome of a path search. `distance == None` means unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    pub distance: Option<u32>,
    pub path: Vec<Node>,
}

impl PathResult {
    pub fn unreachable() -> Self {
        Self {
            distance: None,
            path: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.distance.is_some()
    }
}

/// Find the shortest path from `start` to `end`.
///
/// Callers are expected to have checked that both vertices are in the
/// graph; an unknown vertex yields an unreachable result.
pub fn find_path(graph: &Graph, start: Node, end: Node) -> PathResult {
    let (Some(source), Some(target)) = (graph.index_of(start), graph.index_of(end)) else {
        return PathResult::unreachable();
    };

    let n = graph.vertex_count();
    let mut dist = vec![INF; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0;
    heap.push(Reverse((0u32, source)));

    while let Some(Reverse((d, current))) = heap.pop() {
        if visited[current] {
            continue;
        }
        visited[current] = true;

        for &next in graph.adjacent(current) {
            if visited[next] {
                continue;
            }
            let candidate = d.saturating_add(EDGE_WEIGHT);
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = Some(current);
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    if dist[target] == INF {
        return PathResult::unreachable();
    }

    let mut path = vec![graph.node_at(target)];
    let mut cursor = target;
    while let Some(p) = prev[cursor] {
        path.push(graph.node_at(p));
        cursor = p;
    }
    path.reverse();

    PathResult {
        distance: Some(dist[target]),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphLimits;
    use crate::wire::Edge;

    fn graph(pairs: &[(Node, Node)]) -> Graph {
        let edges: Vec<Edge> = pairs.iter().copied().map(Edge::from).collect();
        Graph::build(&edges, &GraphLimits::default()).unwrap()
    }

    #[test]
    fn test_chain() {
        let g = graph(&[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(
            find_path(&g, 0, 3),
            PathResult {
                distance: Some(3),
                path: vec![0, 1, 2, 3]
            }
        );
    }

    #[test]
    fn test_reverse_direction() {
        let g = graph(&[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(find_path(&g, 3, 0).path, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_disconnected() {
        let g = graph(&[(0, 1), (2, 3)]);
        let result = find_path(&g, 0, 3);
        assert!(!result.is_reachable());
        assert!(result.path.is_empty());
    }

    #[test]
    fn test_same_start_and_end() {
        let g = graph(&[(0, 1), (1, 2)]);
        assert_eq!(
            find_path(&g, 1, 1),
            PathResult {
                distance: Some(0),
                path: vec![1]
            }
        );
    }

    #[test]
    fn test_shortcut_preferred() {
        let g = graph(&[(0, 1), (1, 2), (2, 3), (3, 4), (0, 4)]);
        assert_eq!(find_path(&g, 0, 4).path, vec![0, 4]);
        assert_eq!(find_path(&g, 0, 3).distance, Some(2));
    }

    #[test]
    fn test_tie_broken_by_insertion_order() {
        // Two equal routes 0-1-3 and 0-2-3; vertex 1 appeared first.
        let g = graph(&[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(find_path(&g, 0, 3).path, vec![0, 1, 3]);

        // Same shape, vertex 2 appears first.
        let g = graph(&[(0, 2), (0, 1), (2, 3), (1, 3)]);
        assert_eq!(find_path(&g, 0, 3).path, vec![0, 2, 3]);
    }

    #[test]
    fn test_self_loop_and_parallel_edges() {
        let g = graph(&[(0, 0), (0, 1), (0, 1), (1, 2)]);
        assert_eq!(find_path(&g, 0, 2).distance, Some(2));
    }

    #[test]
    fn test_unknown_vertex_is_unreachable() {
        let g = graph(&[(0, 1)]);
        assert_eq!(find_path(&g, 0, 99), PathResult::unreachable());
    }
}
