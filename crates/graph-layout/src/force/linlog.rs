use super::{ForceFrame, MIN_DISTANCE};
use crate::error::{ensure_non_negative, ensure_positive};
use crate::random::DEFAULT_SEED;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Rect, Sizes, Vec2,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinLogParameters {
    /// Exponent `a` of the edge attraction `w * d^a`
    pub attraction_exponent: f64,
    /// Exponent `r` of the repulsion, `0` selects the logarithmic form
    pub repulsion_exponent: f64,
    pub gravitation_multiplier: f64,
    pub iteration_count: usize,
    /// Output coordinates are the energy-space coordinates times this
    pub scale: f64,
    /// Area used to seed missing positions
    pub width: f64,
    pub height: f64,
    pub seed: u64,
}

impl Default for LinLogParameters {
    fn default() -> Self {
        Self {
            attraction_exponent: 1.0,
            repulsion_exponent: 0.0,
            gravitation_multiplier: 0.1,
            iteration_count: 100,
            scale: 100.0,
            width: 300.0,
            height: 300.0,
            seed: DEFAULT_SEED,
        }
    }
}

impl AlgorithmParameters for LinLogParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_positive("attraction_exponent", self.attraction_exponent)?;
        ensure_non_negative("gravitation_multiplier", self.gravitation_multiplier)?;
        ensure_positive("scale", self.scale)?;
        ensure_positive("width", self.width)?;
        ensure_positive("height", self.height)?;
        if !self.repulsion_exponent.is_finite()
            || self.repulsion_exponent >= self.attraction_exponent
        {
            return Err(LayoutError::invalid_parameter(
                "repulsion_exponent",
                "must be finite and smaller than attraction_exponent",
            ));
        }
        Ok(())
    }
}

/// Noack's LinLog energy model minimised vertex by vertex
#[derive(Debug)]
pub struct LinLogLayout {
    state: LayoutState,
    params: LinLogParameters,
}

/// Inputs of the energy function, fixed for one `compute`
struct EnergyModel<'a> {
    params: &'a LinLogParameters,
    /// Attraction partners per vertex, with weights
    neighbours: Vec<Vec<(usize, f64)>>,
    /// Repulsion weight per vertex (its degree, at least one)
    weight: Vec<f64>,
    repulsion_factor: f64,
}

impl EnergyModel<'_> {
    fn attraction(&self, d: f64) -> f64 {
        let a = self.params.attraction_exponent;
        d.powf(a) / a
    }

    fn repulsion(&self, d: f64) -> f64 {
        let r = self.params.repulsion_exponent;
        if r == 0.0 {
            d.ln()
        } else {
            d.powf(r) / r
        }
    }

    /// Energy of vertex `v` when placed at `p`
    fn energy(&self, v: usize, p: Point, positions: &[Point], barycentre: Point) -> f64 {
        let mut energy = 0.0;
        for (u, &q) in positions.iter().enumerate() {
            if u == v {
                continue;
            }
            let d = p.distance(q).max(MIN_DISTANCE);
            energy -= self.repulsion_factor * self.weight[v] * self.weight[u] * self.repulsion(d);
        }
        for &(u, w) in &self.neighbours[v] {
            let d = p.distance(positions[u]).max(MIN_DISTANCE);
            energy += w * self.attraction(d);
        }
        let d = p.distance(barycentre).max(MIN_DISTANCE);
        energy += self.params.gravitation_multiplier
            * self.repulsion_factor
            * self.weight[v]
            * self.attraction(d);
        energy
    }

    /// Descent direction of the energy at vertex `v`
    fn descent(&self, v: usize, positions: &[Point], barycentre: Point) -> Vec2 {
        let a = self.params.attraction_exponent;
        let r = self.params.repulsion_exponent;
        let p = positions[v];
        let mut gradient = Vec2::zero();
        for (u, &q) in positions.iter().enumerate() {
            if u == v {
                continue;
            }
            let delta = p - q;
            let d = delta.length().max(MIN_DISTANCE);
            let magnitude = self.repulsion_factor * self.weight[v] * self.weight[u] * d.powf(r - 1.0);
            gradient -= delta / d * magnitude;
        }
        for &(u, w) in &self.neighbours[v] {
            let delta = p - positions[u];
            let d = delta.length().max(MIN_DISTANCE);
            gradient += delta / d * (w * d.powf(a - 1.0));
        }
        let delta = p - barycentre;
        let d = delta.length().max(MIN_DISTANCE);
        gradient += delta / d
            * (self.params.gravitation_multiplier
                * self.repulsion_factor
                * self.weight[v]
                * d.powf(a - 1.0));
        -gradient
    }
}

fn barycentre(positions: &[Point]) -> Point {
    if positions.is_empty() {
        return Point::origin();
    }
    let sum = positions
        .iter()
        .fold(Vec2::zero(), |acc, p| acc + (*p - Point::origin()));
    Point::origin() + sum / positions.len() as f64
}

impl LinLogLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: LinLogParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    fn energy_model(&self, frame: &ForceFrame) -> EnergyModel<'_> {
        let n = frame.len();
        let mut neighbours = vec![Vec::new(); n];
        let mut total_attraction = 0.0;
        for (s, t, w) in frame.index.edge_pairs(&self.state.graph) {
            if s == t {
                continue;
            }
            neighbours[s].push((t, w));
            neighbours[t].push((s, w));
            total_attraction += w;
        }
        let weight: Vec<f64> = neighbours.iter().map(|n| n.len().max(1) as f64).collect();
        let total_weight: f64 = weight.iter().sum();
        let repulsion_factor = if total_attraction > 0.0 && total_weight > 0.0 {
            total_attraction / (total_weight * total_weight)
        } else {
            1.0
        };
        EnergyModel {
            params: &self.params,
            neighbours,
            weight,
            repulsion_factor,
        }
    }
}

impl LayoutAlgorithm for LinLogLayout {
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
        let scale = self.params.scale;
        let limit = self.params.iteration_count;

        // Work in energy space, output space divided by `scale`
        let mut positions: Vec<Point> = frame
            .positions
            .iter()
            .map(|p| Point::new(p.x / scale, p.y / scale))
            .collect();
        let model = self.energy_model(&frame);
        debug!("LinLog on {} vertices", positions.len());

        let to_output = |positions: &[Point], frame: &mut ForceFrame| {
            for (out, p) in frame.positions.iter_mut().zip(positions) {
                *out = Point::new(p.x * scale, p.y * scale);
            }
        };

        let mut outcome = ComputeOutcome::Completed;
        for iteration in 0..limit {
            if cancel.is_cancelled() {
                outcome = ComputeOutcome::Cancelled;
                break;
            }
            let centre = barycentre(&positions);
            let mean_edge = {
                let lengths: Vec<f64> = model
                    .neighbours
                    .iter()
                    .enumerate()
                    .flat_map(|(v, ns)| ns.iter().map(move |&(u, _)| (v, u)))
                    .map(|(v, u)| positions[v].distance(positions[u]))
                    .collect();
                if lengths.is_empty() {
                    1.0
                } else {
                    (lengths.iter().sum::<f64>() / lengths.len() as f64).max(MIN_DISTANCE)
                }
            };

            for v in 0..positions.len() {
                if !frame.movable[v] {
                    continue;
                }
                let direction = model.descent(v, &positions, centre).normalized();
                if direction.length_squared() == 0.0 {
                    continue;
                }
                // Line search over step lengths around the mean edge length
                let current = model.energy(v, positions[v], &positions, centre);
                let mut best = (current, positions[v]);
                for exponent in -6..=6 {
                    let step = mean_edge * 2f64.powi(exponent);
                    let candidate = positions[v] + direction * step;
                    let energy = model.energy(v, candidate, &positions, centre);
                    if energy < best.0 {
                        best = (energy, candidate);
                    }
                }
                positions[v] = best.1;
            }

            if self.state.progress.is_enabled() {
                to_output(&positions, &mut frame);
                let base = &self.state.positions;
                self.state
                    .progress
                    .report(iteration + 1, limit, "iteration", false, || frame.snapshot(base));
            }
        }

        to_output(&positions, &mut frame);
        frame.write_back(&mut self.state.positions);
        if outcome.is_cancelled() {
            self.state
                .progress
                .report(0, limit, "cancelled", true, || self.state.positions.clone());
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mixed_graph, vid};
    use crate::ProcessingOption;
    use test_log::test;

    #[test]
    fn test_clusters_are_separated() {
        let mut layout = LinLogLayout::new(mixed_graph(), None, None, LinLogParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        let p = layout.vertex_positions();
        assert_eq!(p.len(), 9);
        assert!(p.values().all(|p| p.is_finite()));
        // Vertices of a cycle are closer to each other than to the far cycle
        let inner = p[&vid(0)].distance(p[&vid(2)]);
        let outer = p[&vid(0)].distance(p[&vid(6)]);
        assert!(inner < outer, "inner {inner}, outer {outer}");
    }

    #[test]
    fn test_energy_decreases() {
        let mut layout = LinLogLayout::new(
            mixed_graph(),
            None,
            None,
            LinLogParameters {
                iteration_count: 1,
                ..Default::default()
            },
        );
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
        let frame = ForceFrame::prepare(&mut layout.state, &mut rng, Rect::new(0.0, 0.0, 3.0, 3.0));
        let model = layout.energy_model(&frame);
        let centre = barycentre(&frame.positions);
        let before = model.energy(0, frame.positions[0], &frame.positions, centre);
        let direction = model.descent(0, &frame.positions, centre).normalized();
        let after = model.energy(0, frame.positions[0] + direction * 1e-3, &frame.positions, centre);
        assert!(after <= before);
    }

    #[test]
    fn test_frozen_vertex_untouched() {
        let mut graph = mixed_graph();
        graph.vertex_mut(vid(8)).unwrap().skip_processing = ProcessingOption::Freeze;
        let fixed = Point::new(33.0, 44.0);
        let mut layout = LinLogLayout::new(
            graph,
            Some(Positions::from([(vid(8), fixed)])),
            None,
            LinLogParameters::default(),
        );
        layout.compute(&CancellationToken::new()).unwrap();
        assert_eq!(layout.vertex_positions()[&vid(8)], fixed);
    }

    #[test]
    fn test_repulsion_exponent_must_stay_below_attraction() {
        let params = LinLogParameters {
            repulsion_exponent: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
