//! Graph builders shared by the unit tests

use crate::{Edge, Graph, Sizes, Vec2, Vertex, VertexId};

/// `0 -> 1 -> ... -> n-1`
pub(crate) fn path_graph(n: u64) -> Graph {
    let vertices = (0..n).map(Vertex::new);
    let edges = (1..n).map(|i| Edge::new(i, i - 1, i));
    Graph::from_parts(vertices, edges).unwrap()
}

/// Balanced tree where every inner vertex has `arity` children
pub(crate) fn tree_graph(depth: u32, arity: u64) -> Graph {
    let mut g = Graph::new();
    g.add_vertex(Vertex::new(0)).unwrap();
    let mut frontier = vec![0u64];
    let mut next_id = 1u64;
    for _ in 0..depth {
        let mut next = Vec::new();
        for &parent in &frontier {
            for _ in 0..arity {
                let child = next_id;
                next_id += 1;
                g.add_vertex(Vertex::new(child)).unwrap();
                g.add_edge(Edge::new(child, parent, child)).unwrap();
                next.push(child);
            }
        }
        frontier = next;
    }
    g
}

/// Two 4-cycles joined by a bridge plus a pendant vertex
pub(crate) fn mixed_graph() -> Graph {
    let edges = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (3, 4),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (7, 8),
    ];
    Graph::from_parts(
        (0..9).map(Vertex::new),
        edges
            .iter()
            .enumerate()
            .map(|(i, &(s, t))| Edge::new(i as u64, s as u64, t as u64)),
    )
    .unwrap()
}

pub(crate) fn uniform_sizes(graph: &Graph, w: f64, h: f64) -> Sizes {
    graph.vertex_ids().map(|id| (id, Vec2::new(w, h))).collect()
}

pub(crate) fn vid(id: u64) -> VertexId {
    VertexId(id)
}
