use super::{SpanningForest, SpanningTreeGeneration};
use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Rect, Sizes, Vec2,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalloonTreeParameters {
    /// Smallest radius of the circle a subtree is laid out on
    pub min_radius: f64,
    /// Margin around the drawing and between trees
    pub border: f64,
    pub spanning_tree_generation: SpanningTreeGeneration,
}

impl Default for BalloonTreeParameters {
    fn default() -> Self {
        Self {
            min_radius: 2.0,
            border: 20.0,
            spanning_tree_generation: SpanningTreeGeneration::Bfs,
        }
    }
}

impl AlgorithmParameters for BalloonTreeParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("min_radius", self.min_radius)?;
        ensure_non_negative("border", self.border)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Balloon {
    /// Largest child radius
    d: f64,
    /// Own radius
    r: f64,
    /// Angle allotted to this vertex by its parent
    a: f64,
    /// Compression applied to the children's angles
    c: f64,
    /// Free angle shared between the children
    f: f64,
}

/// Radial tree drawing where every subtree sits on its own circle
#[derive(Debug)]
pub struct BalloonTreeLayout {
    state: LayoutState,
    params: BalloonTreeParameters,
}

impl BalloonTreeLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: BalloonTreeParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    /// Bottom-up walk computing radii and angles
    fn first_walk(&self, forest: &SpanningForest, tree: &[usize], data: &mut [Balloon]) {
        for &v in tree.iter().rev() {
            let mut d = 0.0_f64;
            for &c in &forest.children[v] {
                d = d.max(data[c].r);
            }
            let mut s = 0.0;
            for &c in &forest.children[v] {
                let rc = data[c].r;
                data[c].a = if d + rc > 0.0 { (rc / (d + rc)).atan() } else { 0.0 };
                s += data[c].a;
            }
            let node = &mut data[v];
            node.d = d;
            if s > PI {
                node.c = PI / s;
                node.f = 0.0;
            } else {
                node.c = 1.0;
                node.f = PI - s;
            }
            node.r = (d / 2.0).max(self.params.min_radius);
        }
    }

    /// Top-down walk accumulating angular offsets from the root
    fn second_walk(
        &self,
        forest: &SpanningForest,
        root: usize,
        data: &[Balloon],
        centres: &mut [Point],
    ) {
        // (vertex, position, scale, angle)
        let mut stack = vec![(root, Point::origin(), 1.0_f64, 0.0_f64)];
        while let Some((v, pos, l, t)) = stack.pop() {
            centres[v] = pos;
            let node = data[v];
            let dd = l * node.d;
            let children = &forest.children[v];
            let fs = if children.is_empty() {
                0.0
            } else {
                node.f / children.len() as f64
            };
            let mut p = t + PI;
            let mut pr = 0.0;
            for &c in children {
                let aa = node.c * data[c].a;
                let tan = aa.tan();
                let rr = node.d * tan / (1.0 - tan);
                p += pr + aa + fs;
                let reach = l * rr + dd;
                let offset = Vec2::new(reach * p.cos(), reach * p.sin());
                pr = aa;
                stack.push((c, pos + offset, l * node.c, p));
            }
        }
    }
}

impl LayoutAlgorithm for BalloonTreeLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let ids: Vec<_> = self.state.admitted().map(|v| v.id).collect();
        let forest = SpanningForest::new(
            &self.state.graph,
            ids,
            self.params.spanning_tree_generation,
        );
        let n = forest.len();
        debug!(
            "Balloon tree layout of {n} vertices in {} trees",
            forest.trees.len()
        );

        let mut data = vec![Balloon::default(); n];
        let mut centres = vec![Point::origin(); n];
        let border = self.params.border;
        let mut cursor = border;

        for (k, (tree, &root)) in forest.trees.iter().zip(&forest.roots).enumerate() {
            if cancel.is_cancelled() {
                self.state
                    .progress
                    .report(k, forest.trees.len(), "cancelled", true, || {
                        self.state.positions.clone()
                    });
                return Ok(ComputeOutcome::Cancelled);
            }
            self.first_walk(&forest, tree, &mut data);
            self.second_walk(&forest, root, &data, &mut centres);

            // Shift the tree so that its bounding box starts at the cursor
            let rects: Vec<Rect> = tree
                .iter()
                .map(|&v| {
                    let size = self.state.size_of(forest.index.id(v));
                    Rect::from_point_size(centres[v] - size / 2.0, size)
                })
                .collect();
            let Some(bounds) = Rect::bounding(&rects) else {
                continue;
            };
            let shift = Vec2::new(cursor - bounds.x, border - bounds.y);
            for (&v, rect) in tree.iter().zip(&rects) {
                self.state
                    .positions
                    .insert(forest.index.id(v), rect.top_left() + shift);
            }
            cursor += bounds.width + border;
        }

        self.state.progress.report(
            forest.trees.len(),
            forest.trees.len(),
            "done",
            false,
            || self.state.positions.clone(),
        );
        Ok(ComputeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{tree_graph, uniform_sizes, vid};
    use crate::{Edge, Vertex};
    use test_log::test;

    fn run(graph: Graph) -> Positions {
        let sizes = uniform_sizes(&graph, 10.0, 10.0);
        let mut layout =
            BalloonTreeLayout::new(graph, None, Some(sizes), BalloonTreeParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        layout.vertex_positions().clone()
    }

    #[test]
    fn test_drawing_starts_at_border() {
        let positions = run(tree_graph(3, 3));
        assert_eq!(positions.len(), 40);
        let min_x = positions.values().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = positions.values().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert!((min_x - 20.0).abs() < 1e-9);
        assert!((min_y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_children_equidistant_from_parent() {
        let positions = run(tree_graph(2, 4));
        let root = positions[&vid(0)];
        let distances: Vec<f64> = (1..=4).map(|c| positions[&vid(c)].distance(root)).collect();
        for d in &distances {
            assert!((d - distances[0]).abs() < 1e-6);
            assert!(*d > 0.0);
        }
    }

    #[test]
    fn test_trees_side_by_side() {
        let graph = Graph::from_parts(
            (0..6).map(Vertex::new),
            [
                Edge::new(0, 0, 1),
                Edge::new(1, 0, 2),
                Edge::new(2, 3, 4),
                Edge::new(3, 3, 5),
            ],
        )
        .unwrap();
        let positions = run(graph);
        let first_right = [0, 1, 2]
            .iter()
            .map(|&v| positions[&vid(v)].x + 10.0)
            .fold(f64::MIN, f64::max);
        let second_left = [3, 4, 5]
            .iter()
            .map(|&v| positions[&vid(v)].x)
            .fold(f64::MAX, f64::min);
        assert!(second_left >= first_right + 20.0 - 1e-9);
    }
}
