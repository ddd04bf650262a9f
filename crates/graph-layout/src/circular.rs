//! Vertices on a single circle, spaced by their size

use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Sizes, VertexId,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::{debug, warn};

const SWEEP_TOLERANCE: f64 = 1e-9;
const MAX_BRACKET_DOUBLINGS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularParameters {
    /// Upper bound on radius correction rounds
    pub max_correction_rounds: usize,
}

impl Default for CircularParameters {
    fn default() -> Self {
        Self {
            max_correction_rounds: 100,
        }
    }
}

impl AlgorithmParameters for CircularParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        if self.max_correction_rounds == 0 {
            return Err(LayoutError::invalid_parameter(
                "max_correction_rounds",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Angle subtended on a circle of `radius` by a vertex of half-diagonal `half`
fn increment(half: f64, radius: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    2.0 * (2.0 * (half / (2.0 * radius)).min(1.0).asin())
}

fn sweep(halves: &[f64], radius: f64) -> f64 {
    halves.iter().map(|&h| increment(h, radius)).sum()
}

#[derive(Debug)]
pub struct CircularLayout {
    state: LayoutState,
    params: CircularParameters,
    radius: f64,
    sweep: f64,
}

impl CircularLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: CircularParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
            radius: 0.0,
            sweep: 0.0,
        }
    }

    /// Radius used by the last `compute`
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Sum of the angular increments of the last placement pass
    pub fn sweep(&self) -> f64 {
        self.sweep
    }

    /// Radius that makes the increments of `halves` sum to a full turn
    ///
    /// The sweep shrinks as the radius grows and is at least a full turn at
    /// `perimeter / TAU`, so the radius is bracketed and bisected.
    fn fit_radius(&self, halves: &[f64]) -> f64 {
        let perimeter: f64 = halves.iter().map(|h| 2.0 * h).sum();
        let mut lo = perimeter / TAU;
        if lo <= 0.0 || (sweep(halves, lo) - TAU).abs() <= SWEEP_TOLERANCE {
            return lo;
        }
        let mut hi = lo * 2.0;
        for _ in 0..MAX_BRACKET_DOUBLINGS {
            if sweep(halves, hi) <= TAU {
                break;
            }
            lo = hi;
            hi *= 2.0;
        }
        for _ in 0..self.params.max_correction_rounds {
            let mid = (lo + hi) / 2.0;
            let total = sweep(halves, mid);
            if (total - TAU).abs() <= SWEEP_TOLERANCE {
                return mid;
            }
            if total > TAU {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        warn!(
            "Circular radius did not settle after {} corrections, sweep {}",
            self.params.max_correction_rounds,
            sweep(halves, hi)
        );
        hi
    }
}

impl LayoutAlgorithm for CircularLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn supports_object_freeze(&self) -> bool {
        true
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let vertices: Vec<(VertexId, bool)> =
            self.state.admitted().map(|v| (v.id, v.is_frozen())).collect();
        let mut halves = Vec::with_capacity(vertices.len());
        for &(id, _) in &vertices {
            let size = self.state.require_size(id)?;
            halves.push(size.length() / 2.0);
        }

        self.radius = self.fit_radius(&halves);
        debug!(
            "Circular layout of {} vertices, radius {}",
            vertices.len(),
            self.radius
        );

        let r = self.radius;
        let mut angle = -PI;
        self.sweep = 0.0;
        for (i, (&(id, frozen), &half)) in vertices.iter().zip(&halves).enumerate() {
            if cancel.is_cancelled() {
                self.state
                    .progress
                    .report(i, vertices.len(), "cancelled", true, || self.state.positions.clone());
                return Ok(ComputeOutcome::Cancelled);
            }
            let step = increment(half, r);
            self.sweep += step;
            angle += step / 2.0;
            let placed = Point::new(angle.cos() * r + r, angle.sin() * r + r);
            angle += step / 2.0;

            if frozen && self.state.positions.contains_key(&id) {
                continue;
            }
            self.state.positions.insert(id, placed);
        }

        self.state.progress.report(
            vertices.len(),
            vertices.len(),
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
    use crate::testutils::{mixed_graph, path_graph, uniform_sizes, vid};
    use crate::{ProcessingOption, Vec2};
    use test_log::test;

    fn layout_with(graph: Graph, sizes: Sizes) -> CircularLayout {
        let mut layout = CircularLayout::new(graph, None, Some(sizes), CircularParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        layout
    }

    #[test]
    fn test_sweep_is_full_turn() {
        let graph = mixed_graph();
        let mut sizes = uniform_sizes(&graph, 30.0, 20.0);
        sizes.insert(vid(3), Vec2::new(120.0, 60.0));
        let layout = layout_with(graph, sizes);
        assert!((layout.sweep() - TAU).abs() < 1e-6, "sweep {}", layout.sweep());
    }

    #[test]
    fn test_sweep_is_full_turn_with_skewed_sizes() {
        let graph = path_graph(3);
        let mut sizes = uniform_sizes(&graph, 1.0, 1.0);
        sizes.insert(vid(0), Vec2::new(400.0, 400.0));
        let layout = layout_with(graph, sizes);
        assert!((layout.sweep() - TAU).abs() < 1e-6, "sweep {}", layout.sweep());
    }

    #[test]
    fn test_radius_grows_with_perimeter() {
        let small = layout_with(path_graph(6), uniform_sizes(&path_graph(6), 20.0, 20.0));
        let large = layout_with(path_graph(6), uniform_sizes(&path_graph(6), 40.0, 40.0));
        let more = layout_with(path_graph(12), uniform_sizes(&path_graph(12), 20.0, 20.0));
        assert!(large.radius() >= small.radius());
        assert!(more.radius() >= small.radius());
    }

    #[test]
    fn test_single_vertex() {
        let layout = layout_with(path_graph(1), uniform_sizes(&path_graph(1), 10.0, 10.0));
        assert!((layout.sweep() - TAU).abs() < 1e-9);
        assert_eq!(layout.vertex_positions().len(), 1);
    }

    #[test]
    fn test_vertices_lie_on_circle() {
        let graph = path_graph(8);
        let layout = layout_with(graph.clone(), uniform_sizes(&graph, 10.0, 10.0));
        let r = layout.radius();
        for p in layout.vertex_positions().values() {
            let d = p.distance(Point::new(r, r));
            assert!((d - r).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_size_is_reported() {
        let graph = path_graph(3);
        let mut sizes = uniform_sizes(&graph, 10.0, 10.0);
        sizes.remove(&vid(2));
        let mut layout = CircularLayout::new(graph, None, Some(sizes), CircularParameters::default());
        let err = layout.compute(&CancellationToken::new()).unwrap_err();
        assert_eq!(err, LayoutError::MissingSize(vid(2)));
    }

    #[test]
    fn test_frozen_vertex_keeps_position() {
        let mut graph = path_graph(4);
        graph.vertex_mut(vid(1)).unwrap().skip_processing = ProcessingOption::Freeze;
        graph.vertex_mut(vid(2)).unwrap().skip_processing = ProcessingOption::Freeze;
        let sizes = uniform_sizes(&graph, 10.0, 10.0);
        let positions = Positions::from([(vid(1), Point::new(500.0, 500.0))]);

        let mut layout =
            CircularLayout::new(graph, Some(positions), Some(sizes), CircularParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();

        assert_eq!(layout.vertex_positions()[&vid(1)], Point::new(500.0, 500.0));
        // Frozen without a prior position gets the computed one
        assert!(layout.vertex_positions().contains_key(&vid(2)));
    }
}
