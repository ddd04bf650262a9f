use super::{all_pairs_hops, ForceFrame, MIN_DISTANCE};
use crate::error::{ensure_non_negative, ensure_positive};
use crate::random::DEFAULT_SEED;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Rect, Sizes, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KkParameters {
    pub width: f64,
    pub height: f64,
    pub max_iterations: usize,
    /// Spring strength `K`
    pub k: f64,
    /// Stop once the largest energy gradient falls below this
    pub epsilon: f64,
    /// Multiplier of the ideal length `min(width, height) / diameter`
    pub length_factor: f64,
    /// Hop distance of unconnected pairs, relative to the diameter
    pub disconnected_multiplier: f64,
    /// Re-centre the drawing inside `width x height` after every iteration
    pub adjust_for_gravity: bool,
    pub seed: u64,
}

impl Default for KkParameters {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            max_iterations: 200,
            k: 1.0,
            epsilon: 0.1,
            length_factor: 1.0,
            disconnected_multiplier: 0.5,
            adjust_for_gravity: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl AlgorithmParameters for KkParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_positive("width", self.width)?;
        ensure_positive("height", self.height)?;
        ensure_positive("k", self.k)?;
        ensure_non_negative("epsilon", self.epsilon)?;
        ensure_positive("length_factor", self.length_factor)?;
        ensure_positive("disconnected_multiplier", self.disconnected_multiplier)
    }
}

/// Kamada-Kawai stress minimisation
#[derive(Debug)]
pub struct KamadaKawaiLayout {
    state: LayoutState,
    params: KkParameters,
}

/// Spring lengths and strengths for every pair
struct Springs {
    length: Vec<Vec<f64>>,
    strength: Vec<Vec<f64>>,
}

impl KamadaKawaiLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: KkParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    fn springs(&self, adjacency: &[Vec<usize>]) -> Springs {
        let hops = all_pairs_hops(adjacency);
        let diameter = hops
            .iter()
            .flatten()
            .filter_map(|h| *h)
            .max()
            .unwrap_or(0)
            .max(1) as f64;
        let disconnected = diameter * self.params.disconnected_multiplier;
        let ideal = self.params.width.min(self.params.height) / diameter * self.params.length_factor;

        let n = adjacency.len();
        let mut length = vec![vec![0.0; n]; n];
        let mut strength = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = hops[i][j].map_or(disconnected, |h| h as f64).max(MIN_DISTANCE);
                length[i][j] = ideal * d;
                strength[i][j] = self.params.k / (d * d);
            }
        }
        Springs { length, strength }
    }
}

/// First and second partial derivatives of the energy at vertex `m`
fn derivatives(m: usize, positions: &[Point], springs: &Springs) -> (f64, f64, f64, f64, f64) {
    let (mut dx, mut dy, mut dxx, mut dyy, mut dxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let pm = positions[m];
    for (i, &pi) in positions.iter().enumerate() {
        if i == m {
            continue;
        }
        let ddx = pm.x - pi.x;
        let ddy = pm.y - pi.y;
        let dist = (ddx * ddx + ddy * ddy).sqrt().max(MIN_DISTANCE);
        let dist3 = dist * dist * dist;
        let k = springs.strength[m][i];
        let l = springs.length[m][i];
        dx += k * (ddx - l * ddx / dist);
        dy += k * (ddy - l * ddy / dist);
        dxx += k * (1.0 - l * ddy * ddy / dist3);
        dyy += k * (1.0 - l * ddx * ddx / dist3);
        dxy += k * l * ddx * ddy / dist3;
    }
    (dx, dy, dxx, dyy, dxy)
}

impl LayoutAlgorithm for KamadaKawaiLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn supports_object_freeze(&self) -> bool {
        true
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let area = Rect::new(0.0, 0.0, self.params.width, self.params.height);
        let mut frame = ForceFrame::prepare(&mut self.state, &mut rng, area);
        let adjacency = frame.index.adjacency(&self.state.graph);
        let springs = self.springs(&adjacency);
        let gravity = self.params.adjust_for_gravity && !frame.any_frozen();
        let limit = self.params.max_iterations;
        debug!("Kamada-Kawai on {} vertices", frame.len());

        for iteration in 0..limit {
            if cancel.is_cancelled() {
                frame.write_back(&mut self.state.positions);
                self.state
                    .progress
                    .report(iteration, limit, "cancelled", true, || self.state.positions.clone());
                return Ok(ComputeOutcome::Cancelled);
            }

            let mut largest: f64 = 0.0;
            for m in 0..frame.len() {
                if !frame.movable[m] {
                    continue;
                }
                let (dx, dy, dxx, dyy, dxy) = derivatives(m, &frame.positions, &springs);
                largest = largest.max((dx * dx + dy * dy).sqrt());
                let det = dxx * dyy - dxy * dxy;
                if det.abs() < f64::EPSILON {
                    continue;
                }
                let step = Vec2::new((-dx * dyy + dy * dxy) / det, (-dy * dxx + dx * dxy) / det);
                if step.is_finite() {
                    frame.positions[m] += step;
                }
            }

            if gravity && frame.len() > 0 {
                let centroid = frame
                    .positions
                    .iter()
                    .fold(Vec2::zero(), |acc, p| acc + (*p - Point::origin()))
                    / frame.len() as f64;
                let shift = Vec2::new(self.params.width / 2.0, self.params.height / 2.0) - centroid;
                for p in &mut frame.positions {
                    *p += shift;
                }
            }

            let base = &self.state.positions;
            self.state
                .progress
                .report(iteration + 1, limit, "iteration", false, || frame.snapshot(base));

            trace!("Kamada-Kawai iteration {iteration}, largest gradient {largest}");
            if largest < self.params.epsilon {
                debug!("Kamada-Kawai converged after {} iterations", iteration + 1);
                break;
            }
        }

        frame.write_back(&mut self.state.positions);
        Ok(ComputeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mixed_graph, path_graph, vid};
    use crate::{Edge, ProcessingOption, Vertex};
    use test_log::test;

    #[test]
    fn test_path_is_stretched() {
        let mut layout = KamadaKawaiLayout::new(path_graph(4), None, None, KkParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        let p = layout.vertex_positions();
        let ends = p[&vid(0)].distance(p[&vid(3)]);
        let step = p[&vid(0)].distance(p[&vid(1)]);
        assert!(ends > step * 2.0, "ends {ends}, step {step}");
    }

    #[test]
    fn test_gravity_centres_drawing() {
        let mut layout = KamadaKawaiLayout::new(mixed_graph(), None, None, KkParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        let p = layout.vertex_positions();
        let cx = p.values().map(|p| p.x).sum::<f64>() / p.len() as f64;
        let cy = p.values().map(|p| p.y).sum::<f64>() / p.len() as f64;
        assert!((cx - 150.0).abs() < 1e-6);
        assert!((cy - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_disconnected_components() {
        let graph = Graph::from_parts(
            (0..4).map(Vertex::new),
            [Edge::new(0, 0, 1), Edge::new(1, 2, 3)],
        )
        .unwrap();
        let mut layout = KamadaKawaiLayout::new(graph, None, None, KkParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        assert!(layout.vertex_positions().values().all(|p| p.is_finite()));
    }

    #[test]
    fn test_frozen_vertex_disables_recentring() {
        let mut graph = mixed_graph();
        graph.vertex_mut(vid(0)).unwrap().skip_processing = ProcessingOption::Freeze;
        let fixed = Point::new(-400.0, 20.0);
        let mut layout = KamadaKawaiLayout::new(
            graph,
            Some(Positions::from([(vid(0), fixed)])),
            None,
            KkParameters::default(),
        );
        layout.compute(&CancellationToken::new()).unwrap();
        assert_eq!(layout.vertex_positions()[&vid(0)], fixed);
    }
}
