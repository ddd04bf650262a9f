//! Tree layouts over a spanning forest of the graph

mod balloon;
mod simple;

pub use balloon::{BalloonTreeLayout, BalloonTreeParameters};
pub use simple::{SimpleTreeLayout, SimpleTreeParameters};

use crate::{Graph, VertexId, VertexIndex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Traversal used to pick the spanning forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpanningTreeGeneration {
    Bfs,
    #[default]
    Dfs,
}

/// Direction in which layers grow away from the roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutDirection {
    #[default]
    TopToBottom,
    BottomToTop,
    LeftToRight,
    RightToLeft,
}

impl LayoutDirection {
    /// Whether layers are stacked along the y axis
    pub fn is_vertical(self) -> bool {
        matches!(self, LayoutDirection::TopToBottom | LayoutDirection::BottomToTop)
    }

    /// Whether the layer axis points towards negative coordinates
    pub fn is_reversed(self) -> bool {
        matches!(self, LayoutDirection::BottomToTop | LayoutDirection::RightToLeft)
    }
}

/// Spanning forest over the admitted vertices, following out edges
#[derive(Debug, Clone)]
pub(crate) struct SpanningForest {
    pub index: VertexIndex,
    pub roots: Vec<usize>,
    pub children: Vec<Vec<usize>>,
    pub depth: Vec<usize>,
    /// Vertices of each tree in visiting order, parents before children
    pub trees: Vec<Vec<usize>>,
}

impl SpanningForest {
    /// Build the forest over `ids`
    ///
    /// Roots are the vertices without incoming edges, in graph order.
    /// Vertices left unvisited afterwards (cycles) become additional roots.
    pub fn new(
        graph: &Graph,
        ids: impl IntoIterator<Item = VertexId>,
        generation: SpanningTreeGeneration,
    ) -> Self {
        let index = VertexIndex::new(ids);
        let n = index.len();
        let mut successors = vec![Vec::new(); n];
        let mut has_incoming = vec![false; n];
        for (s, t, _) in index.edge_pairs(graph) {
            if s == t {
                continue;
            }
            successors[s].push(t);
            has_incoming[t] = true;
        }

        let mut forest = Self {
            index,
            roots: Vec::new(),
            children: vec![Vec::new(); n],
            depth: vec![0; n],
            trees: Vec::new(),
        };
        let mut visited = vec![false; n];
        let candidates = (0..n)
            .filter(|&i| !has_incoming[i])
            .chain(0..n)
            .collect::<Vec<_>>();
        for root in candidates {
            if visited[root] {
                continue;
            }
            let tree = match generation {
                SpanningTreeGeneration::Bfs => forest.bfs(root, &successors, &mut visited),
                SpanningTreeGeneration::Dfs => forest.dfs(root, &successors, &mut visited),
            };
            forest.roots.push(root);
            forest.trees.push(tree);
        }
        forest
    }

    fn bfs(&mut self, root: usize, successors: &[Vec<usize>], visited: &mut [bool]) -> Vec<usize> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        visited[root] = true;
        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &w in &successors[v] {
                if !visited[w] {
                    visited[w] = true;
                    self.depth[w] = self.depth[v] + 1;
                    self.children[v].push(w);
                    queue.push_back(w);
                }
            }
        }
        order
    }

    fn dfs(&mut self, root: usize, successors: &[Vec<usize>], visited: &mut [bool]) -> Vec<usize> {
        let mut order = vec![root];
        visited[root] = true;
        // (vertex, next successor to look at)
        let mut stack = vec![(root, 0usize)];
        while let Some((v, next)) = stack.last_mut() {
            let v = *v;
            let Some(&w) = successors[v].get(*next) else {
                stack.pop();
                continue;
            };
            *next += 1;
            if !visited[w] {
                visited[w] = true;
                self.depth[w] = self.depth[v] + 1;
                self.children[v].push(w);
                order.push(w);
                stack.push((w, 0));
            }
        }
        order
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{tree_graph, vid};
    use crate::{Edge, Vertex};
    use test_log::test;

    #[test]
    fn test_forest_of_tree() {
        let graph = tree_graph(2, 2);
        let forest = SpanningForest::new(&graph, graph.vertex_ids(), SpanningTreeGeneration::Bfs);
        assert_eq!(forest.roots, vec![0]);
        assert_eq!(forest.trees[0].len(), 7);
        assert_eq!(forest.children[0].len(), 2);
        assert_eq!(forest.depth.iter().max(), Some(&2));
    }

    #[test]
    fn test_dfs_visits_depth_first() {
        let graph = tree_graph(2, 2);
        let forest = SpanningForest::new(&graph, graph.vertex_ids(), SpanningTreeGeneration::Dfs);
        let order: Vec<_> = forest.trees[0].iter().map(|&i| forest.index.id(i)).collect();
        assert_eq!(order[..3], [vid(0), vid(1), vid(3)]);
    }

    #[test]
    fn test_cycle_gets_extra_root() {
        let graph = Graph::from_parts(
            (0..3).map(Vertex::new),
            [Edge::new(0, 0, 1), Edge::new(1, 1, 0), Edge::new(2, 2, 2)],
        )
        .unwrap();
        let forest = SpanningForest::new(&graph, graph.vertex_ids(), SpanningTreeGeneration::Dfs);
        // Vertex 2 only has a self loop, so it is a natural root
        assert_eq!(forest.roots, vec![2, 0]);
        assert_eq!(forest.trees.iter().map(Vec::len).sum::<usize>(), 3);
    }
}
