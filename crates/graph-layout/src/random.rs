//! Uniform random placement inside a rectangle

use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Rect, Sizes, VertexId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seed used by parameter defaults so that runs are reproducible
pub const DEFAULT_SEED: u64 = 0x6c61_796f_7574;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomParameters {
    /// Area the vertex rectangles are placed in
    pub bounds: Rect,
    pub seed: u64,
}

impl Default for RandomParameters {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 800.0, 600.0),
            seed: DEFAULT_SEED,
        }
    }
}

impl AlgorithmParameters for RandomParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("bounds.width", self.bounds.width)?;
        ensure_non_negative("bounds.height", self.bounds.height)?;
        if !(self.bounds.x.is_finite() && self.bounds.y.is_finite()) {
            return Err(LayoutError::invalid_parameter(
                "bounds",
                "origin must be finite",
            ));
        }
        Ok(())
    }
}

/// Draw a top-left corner so that a rectangle of `size` fits in `bounds`
///
/// Rectangles larger than the bounds are pinned to the bounds origin on
/// that axis.
pub(crate) fn random_corner(rng: &mut StdRng, bounds: Rect, size: crate::Vec2) -> Point {
    let free_x = (bounds.width - size.x).max(0.0);
    let free_y = (bounds.height - size.y).max(0.0);
    Point::new(
        bounds.x + rng.random::<f64>() * free_x,
        bounds.y + rng.random::<f64>() * free_y,
    )
}

#[derive(Debug)]
pub struct RandomLayout {
    state: LayoutState,
    params: RandomParameters,
}

impl RandomLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: RandomParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    pub fn parameters(&self) -> &RandomParameters {
        &self.params
    }
}

impl LayoutAlgorithm for RandomLayout {
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
        let vertices: Vec<(VertexId, bool)> =
            self.state.admitted().map(|v| (v.id, v.is_frozen())).collect();
        debug!("Random layout of {} vertices", vertices.len());

        for (i, &(id, frozen)) in vertices.iter().enumerate() {
            if cancel.is_cancelled() {
                self.state
                    .progress
                    .report(i, vertices.len(), "cancelled", true, || self.state.positions.clone());
                return Ok(ComputeOutcome::Cancelled);
            }
            if frozen && self.state.positions.contains_key(&id) {
                continue;
            }
            let corner = random_corner(&mut rng, self.params.bounds, self.state.size_of(id));
            self.state.positions.insert(id, corner);
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
