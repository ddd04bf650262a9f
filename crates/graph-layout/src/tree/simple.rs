use super::{LayoutDirection, SpanningForest, SpanningTreeGeneration};
use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Sizes, Vec2,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleTreeParameters {
    pub direction: LayoutDirection,
    /// Gap between siblings along a layer
    pub vertex_gap: f64,
    /// Gap between consecutive layers
    pub layer_gap: f64,
    /// Gap between the trees of the spanning forest
    pub component_gap: f64,
    pub spanning_tree_generation: SpanningTreeGeneration,
}

impl Default for SimpleTreeParameters {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            vertex_gap: 10.0,
            layer_gap: 10.0,
            component_gap: 10.0,
            spanning_tree_generation: SpanningTreeGeneration::Dfs,
        }
    }
}

impl AlgorithmParameters for SimpleTreeParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("vertex_gap", self.vertex_gap)?;
        ensure_non_negative("layer_gap", self.layer_gap)?;
        ensure_non_negative("component_gap", self.component_gap)
    }
}

/// Classic layered tree drawing
///
/// Every layer is as thick as its thickest vertex and children are centred
/// under their parent.
#[derive(Debug)]
pub struct SimpleTreeLayout {
    state: LayoutState,
    params: SimpleTreeParameters,
}

impl SimpleTreeLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: SimpleTreeParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }
}

impl LayoutAlgorithm for SimpleTreeLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let ids: Vec<_> = self.state.admitted().map(|v| v.id).collect();
        let forest = SpanningForest::new(
            &self.state.graph,
            ids,
            self.params.spanning_tree_generation,
        );
        let n = forest.len();
        let vertical = self.params.direction.is_vertical();

        // (breadth, thickness) in layer-local axes
        let mut extent = Vec::with_capacity(n);
        for &id in forest.index.ids() {
            let size = self.state.require_size(id)?;
            extent.push(if vertical {
                Vec2::new(size.x, size.y)
            } else {
                Vec2::new(size.y, size.x)
            });
        }

        // Pass 1: layer thickness and offset
        let layer_count = forest.depth.iter().max().map_or(0, |d| d + 1);
        let mut thickness = vec![0.0_f64; layer_count];
        for i in 0..n {
            let layer = forest.depth[i];
            thickness[layer] = thickness[layer].max(extent[i].y);
        }
        let mut layer_offset = Vec::with_capacity(layer_count);
        let mut acc = 0.0;
        for t in &thickness {
            layer_offset.push(acc);
            acc += t + self.params.layer_gap;
        }
        let total_depth = (acc - self.params.layer_gap).max(0.0);

        // Pass 2: subtree breadths, children first
        let mut breadth = vec![0.0_f64; n];
        for tree in &forest.trees {
            for &v in tree.iter().rev() {
                let children = &forest.children[v];
                let sum: f64 = children.iter().map(|&c| breadth[c]).sum::<f64>()
                    + self.params.vertex_gap * children.len().saturating_sub(1) as f64;
                breadth[v] = extent[v].x.max(sum);
            }
        }

        debug!(
            "Simple tree layout of {n} vertices in {} trees and {layer_count} layers",
            forest.trees.len()
        );

        let mut start = vec![0.0_f64; n];
        let mut cursor = 0.0;
        let mut visited = 0;
        for (tree, &root) in forest.trees.iter().zip(&forest.roots) {
            start[root] = cursor;
            for &v in tree {
                if cancel.is_cancelled() {
                    self.state
                        .progress
                        .report(visited, n, "cancelled", true, || self.state.positions.clone());
                    return Ok(ComputeOutcome::Cancelled);
                }
                visited += 1;

                let children = &forest.children[v];
                let children_breadth: f64 = children.iter().map(|&c| breadth[c]).sum::<f64>()
                    + self.params.vertex_gap * children.len().saturating_sub(1) as f64;
                let mut child_start = start[v] + (breadth[v] - children_breadth) / 2.0;
                for &c in children {
                    start[c] = child_start;
                    child_start += breadth[c] + self.params.vertex_gap;
                }

                let along = start[v] + (breadth[v] - extent[v].x) / 2.0;
                let layer = forest.depth[v];
                let mut across = layer_offset[layer] + (thickness[layer] - extent[v].y) / 2.0;
                if self.params.direction.is_reversed() {
                    across = total_depth - across - extent[v].y;
                }
                let position = if vertical {
                    Point::new(along, across)
                } else {
                    Point::new(across, along)
                };
                self.state.positions.insert(forest.index.id(v), position);
            }
            cursor += breadth[root] + self.params.component_gap;
        }

        self.state
            .progress
            .report(n, n, "done", false, || self.state.positions.clone());
        Ok(ComputeOutcome::Completed)
    }
}
