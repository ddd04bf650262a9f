use super::{separation, ForceFrame};
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoolingFunction {
    /// `T0 * (1 - i / n)`
    #[default]
    Linear,
    /// `T * lambda` after every iteration
    Exponential,
}

/// Parameters of the free and the bounded Fruchterman-Reingold variants
///
/// The bounded variant is selected by setting `bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrParameters {
    /// Ideal edge length `k` of the free variant
    pub ideal_edge_length: f64,
    pub attraction_multiplier: f64,
    pub repulsive_multiplier: f64,
    pub iteration_limit: usize,
    pub cooling: CoolingFunction,
    /// Factor of the exponential cooling
    pub lambda: f64,
    /// Stop once the largest displacement of an iteration is smaller
    pub convergence_threshold: f64,
    /// Area the vertices are kept in
    pub bounds: Option<Rect>,
    pub seed: u64,
}

impl Default for FrParameters {
    fn default() -> Self {
        Self {
            ideal_edge_length: 50.0,
            attraction_multiplier: 1.2,
            repulsive_multiplier: 0.6,
            iteration_limit: 200,
            cooling: CoolingFunction::Exponential,
            lambda: 0.95,
            convergence_threshold: 0.01,
            bounds: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl FrParameters {
    /// Defaults of the bounded variant
    pub fn bounded() -> Self {
        Self {
            bounds: Some(Rect::new(0.0, 0.0, 800.0, 600.0)),
            ..Self::default()
        }
    }
}

impl AlgorithmParameters for FrParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_positive("ideal_edge_length", self.ideal_edge_length)?;
        ensure_non_negative("attraction_multiplier", self.attraction_multiplier)?;
        ensure_non_negative("repulsive_multiplier", self.repulsive_multiplier)?;
        ensure_non_negative("convergence_threshold", self.convergence_threshold)?;
        if !(self.lambda > 0.0 && self.lambda < 1.0) {
            return Err(LayoutError::invalid_parameter(
                "lambda",
                format!("must lie in (0, 1), got {}", self.lambda),
            ));
        }
        if let Some(bounds) = self.bounds {
            ensure_positive("bounds.width", bounds.width)?;
            ensure_positive("bounds.height", bounds.height)?;
        }
        Ok(())
    }
}

/// Fruchterman-Reingold spring embedder
#[derive(Debug)]
pub struct FruchtermanReingoldLayout {
    state: LayoutState,
    params: FrParameters,
}

impl FruchtermanReingoldLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: FrParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    fn seeding_area(&self, n: usize) -> Rect {
        match self.params.bounds {
            Some(bounds) => bounds,
            None => {
                let side = self.params.ideal_edge_length * (n.max(1) as f64).sqrt() * 2.0;
                Rect::new(0.0, 0.0, side, side)
            }
        }
    }

    /// Ideal edge length and initial temperature
    fn constants(&self, n: usize) -> (f64, f64) {
        let n = n.max(1) as f64;
        match self.params.bounds {
            Some(bounds) => (
                (bounds.width * bounds.height / n).sqrt(),
                bounds.width.min(bounds.height) / 10.0,
            ),
            None => {
                let k = self.params.ideal_edge_length;
                (k, (k * k * n).sqrt())
            }
        }
    }
}

impl LayoutAlgorithm for FruchtermanReingoldLayout {
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
        let n = self.state.admitted().count();
        let area = self.seeding_area(n);
        let mut frame = ForceFrame::prepare(&mut self.state, &mut rng, area);
        let edges = frame.index.edge_pairs(&self.state.graph);

        let (k, t0) = self.constants(n);
        let repulsion = k * k * self.params.repulsive_multiplier;
        let attraction = self.params.attraction_multiplier / k;
        let limit = self.params.iteration_limit;
        debug!("Fruchterman-Reingold on {n} vertices, k = {k}, T0 = {t0}");

        let mut temperature = t0;
        let mut disp = vec![Vec2::zero(); frame.len()];
        for iteration in 0..limit {
            if cancel.is_cancelled() {
                frame.write_back(&mut self.state.positions);
                self.state
                    .progress
                    .report(iteration, limit, "cancelled", true, || self.state.positions.clone());
                return Ok(ComputeOutcome::Cancelled);
            }

            disp.iter_mut().for_each(|d| *d = Vec2::zero());
            for i in 0..frame.len() {
                for j in (i + 1)..frame.len() {
                    let (delta, d) = separation(frame.positions[i], frame.positions[j], &mut rng);
                    let push = delta / d * (repulsion / d);
                    disp[i] += push;
                    disp[j] -= push;
                }
            }
            for &(s, t, weight) in &edges {
                if s == t {
                    continue;
                }
                let (delta, d) = separation(frame.positions[s], frame.positions[t], &mut rng);
                let pull = delta / d * (d * d * attraction * weight);
                disp[s] -= pull;
                disp[t] += pull;
            }

            let mut largest: f64 = 0.0;
            for i in 0..frame.len() {
                if !frame.movable[i] {
                    continue;
                }
                let len = disp[i].length();
                if len <= 0.0 || !len.is_finite() {
                    continue;
                }
                let step = disp[i] / len * len.min(temperature);
                let mut p = frame.positions[i] + step;
                if let Some(bounds) = self.params.bounds {
                    let size = frame.sizes[i];
                    p = Point::new(
                        p.x.clamp(bounds.x, (bounds.right() - size.x).max(bounds.x)),
                        p.y.clamp(bounds.y, (bounds.bottom() - size.y).max(bounds.y)),
                    );
                }
                largest = largest.max(p.distance(frame.positions[i]));
                frame.positions[i] = p;
            }

            temperature = match self.params.cooling {
                CoolingFunction::Linear => t0 * (1.0 - (iteration + 1) as f64 / limit as f64),
                CoolingFunction::Exponential => temperature * self.params.lambda,
            };

            let base = &self.state.positions;
            self.state
                .progress
                .report(iteration + 1, limit, "iteration", false, || frame.snapshot(base));

            if largest < self.params.convergence_threshold {
                debug!("Fruchterman-Reingold converged after {} iterations", iteration + 1);
                break;
            }
        }

        frame.write_back(&mut self.state.positions);
        Ok(ComputeOutcome::Completed)
    }
}
