use crate::{EdgeId, LayoutError};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

/// Assign layers to vertices based on topological order
///
/// Uses a two-pass approach to minimize edge lengths:
/// - First pass: assign each vertex to the layer after its predecessors
/// - Second pass: move vertices closer to their successors when possible
///
/// `edges` must be acyclic.
pub(crate) fn assign_layers(n: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, LayoutError> {
    let mut graph = DiGraphMap::<usize, ()>::new();
    for v in 0..n {
        graph.add_node(v);
    }
    for &(s, t) in edges {
        graph.add_edge(s, t, ());
    }

    let topo_order = toposort(&graph, None).map_err(|cycle| {
        LayoutError::Unsupported(format!(
            "cycle through layer candidate {} left after back edge reversal",
            cycle.node_id()
        ))
    })?;
    let mut layer = vec![0usize; n];

    // First pass: forward, assign each vertex to layer after its predecessors
    for &v in &topo_order {
        layer[v] = graph
            .neighbors_directed(v, Direction::Incoming)
            .map(|pred| layer[pred] + 1)
            .max()
            .unwrap_or(0);
    }

    // Second pass: backward, move vertices closer to their successors
    for &v in topo_order.iter().rev() {
        let min_succ_layer = graph
            .neighbors_directed(v, Direction::Outgoing)
            .map(|succ| layer[succ])
            .min();
        if let Some(min_succ_layer) = min_succ_layer {
            if min_succ_layer > layer[v] + 1 {
                layer[v] = min_succ_layer - 1;
            }
        }
    }

    Ok(layer)
}

/// Layered edge between two original vertices, through its dummy vertices
#[derive(Debug, Clone)]
pub(crate) struct Chain {
    pub edge: EdgeId,
    /// Nodes from the upper to the lower layer, endpoints included
    pub nodes: Vec<usize>,
    /// Whether the chain runs against the direction of the edge
    pub reversed: bool,
}

/// Proper layered graph: every edge joins two consecutive layers
///
/// Nodes `0..real` are the original vertices, the others are dummies.
#[derive(Debug, Clone)]
pub(crate) struct Hierarchy {
    pub real: usize,
    pub succ: Vec<Vec<usize>>,
    pub pred: Vec<Vec<usize>>,
    pub layer_of: Vec<usize>,
    pub layers: Vec<Vec<usize>>,
    pub chains: Vec<Chain>,
}

impl Hierarchy {
    /// Split every edge spanning more than one layer with dummy nodes
    ///
    /// `edges` are `(edge, upper, lower, reversed)` with `layer[upper] <
    /// layer[lower]`.
    pub fn new(layer: Vec<usize>, edges: &[(EdgeId, usize, usize, bool)]) -> Self {
        let real = layer.len();
        let mut h = Self {
            real,
            succ: vec![Vec::new(); real],
            pred: vec![Vec::new(); real],
            layer_of: layer,
            layers: Vec::new(),
            chains: Vec::with_capacity(edges.len()),
        };

        for &(edge, upper, lower, reversed) in edges {
            let mut nodes = vec![upper];
            let mut prev = upper;
            for l in (h.layer_of[upper] + 1)..h.layer_of[lower] {
                let dummy = h.add_node(l);
                h.link(prev, dummy);
                nodes.push(dummy);
                prev = dummy;
            }
            h.link(prev, lower);
            nodes.push(lower);
            h.chains.push(Chain {
                edge,
                nodes,
                reversed,
            });
        }

        let layer_count = h.layer_of.iter().max().map_or(0, |l| l + 1);
        h.layers = vec![Vec::new(); layer_count];
        for (v, &l) in h.layer_of.iter().enumerate() {
            h.layers[l].push(v);
        }
        h
    }

    fn add_node(&mut self, layer: usize) -> usize {
        self.succ.push(Vec::new());
        self.pred.push(Vec::new());
        self.layer_of.push(layer);
        self.layer_of.len() - 1
    }

    fn link(&mut self, upper: usize, lower: usize) {
        self.succ[upper].push(lower);
        self.pred[lower].push(upper);
    }

    pub fn node_count(&self) -> usize {
        self.layer_of.len()
    }

    pub fn is_dummy(&self, v: usize) -> bool {
        v >= self.real
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_longest_path_layers() {
        let layer = assign_layers(4, &[(0, 1), (1, 2), (0, 2)]).unwrap();
        assert_eq!(layer[..3], [0, 1, 2]);
        assert_eq!(layer[3], 0);
    }

    #[test]
    fn test_sources_pulled_towards_successors() {
        // 3 only feeds the last layer, so it moves down next to it
        let layer = assign_layers(4, &[(0, 1), (1, 2), (3, 2)]).unwrap();
        assert_eq!(layer[3], 1);
    }

    #[test]
    fn test_cycle_is_an_error() {
        assert!(assign_layers(2, &[(0, 1), (1, 0)]).is_err());
    }

    #[test]
    fn test_long_edges_get_dummies() {
        let h = Hierarchy::new(vec![0, 1, 3], &[(EdgeId(0), 0, 2, false), (EdgeId(1), 0, 1, true)]);
        assert_eq!(h.node_count(), 5);
        assert_eq!(h.chains[0].nodes.len(), 4);
        assert!(h.is_dummy(h.chains[0].nodes[1]));
        assert_eq!(h.layers.len(), 4);
        assert_eq!(h.layers[2], vec![4]);
        assert!(h.chains[1].reversed);
    }
}
