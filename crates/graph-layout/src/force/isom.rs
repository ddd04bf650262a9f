use super::ForceFrame;
use crate::error::{ensure_non_negative, ensure_positive};
use crate::random::DEFAULT_SEED;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutState, Point, Positions, Rect, Sizes,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsomParameters {
    pub width: f64,
    pub height: f64,
    pub max_epochs: usize,
    /// Epochs between two radius reductions
    pub radius_constant_time: usize,
    pub initial_radius: usize,
    pub min_radius: usize,
    pub initial_adaption: f64,
    pub min_adaption: f64,
    pub cooling_factor: f64,
    pub seed: u64,
}

impl Default for IsomParameters {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            max_epochs: 2000,
            radius_constant_time: 100,
            initial_radius: 5,
            min_radius: 1,
            initial_adaption: 0.9,
            min_adaption: 0.0,
            cooling_factor: 2.0,
            seed: DEFAULT_SEED,
        }
    }
}

impl AlgorithmParameters for IsomParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_positive("width", self.width)?;
        ensure_positive("height", self.height)?;
        ensure_non_negative("initial_adaption", self.initial_adaption)?;
        ensure_non_negative("min_adaption", self.min_adaption)?;
        ensure_non_negative("cooling_factor", self.cooling_factor)?;
        if self.radius_constant_time == 0 {
            return Err(LayoutError::invalid_parameter(
                "radius_constant_time",
                "must be at least 1",
            ));
        }
        if self.min_radius > self.initial_radius {
            return Err(LayoutError::invalid_parameter(
                "min_radius",
                "must not exceed initial_radius",
            ));
        }
        Ok(())
    }
}

/// Inverted self-organising map
///
/// Frozen vertices can win the closest-vertex search of an epoch but are
/// never moved.
#[derive(Debug)]
pub struct IsomLayout {
    state: LayoutState,
    params: IsomParameters,
}

impl IsomLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: IsomParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
        }
    }

    fn adaption(&self, epoch: usize) -> f64 {
        let decay = (-self.params.cooling_factor * epoch as f64
            / self.params.max_epochs.max(1) as f64)
            .exp();
        (decay * self.params.initial_adaption).max(self.params.min_adaption)
    }
}

impl LayoutAlgorithm for IsomLayout {
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
        let n = frame.len();
        let epochs = self.params.max_epochs;
        debug!("ISOM on {n} vertices for {epochs} epochs");

        let mut radius = self.params.initial_radius;
        let mut hops: Vec<Option<usize>> = vec![None; n];
        let mut queue = VecDeque::new();
        for epoch in 0..epochs {
            if cancel.is_cancelled() {
                frame.write_back(&mut self.state.positions);
                self.state
                    .progress
                    .report(epoch, epochs, "cancelled", true, || self.state.positions.clone());
                return Ok(ComputeOutcome::Cancelled);
            }
            if n == 0 {
                break;
            }

            let target = Point::new(
                rng.random::<f64>() * self.params.width,
                rng.random::<f64>() * self.params.height,
            );
            let winner = (0..n)
                .min_by(|&a, &b| {
                    let da = frame.positions[a].distance(target);
                    let db = frame.positions[b].distance(target);
                    da.total_cmp(&db)
                })
                .unwrap_or(0);

            let adaption = self.adaption(epoch);
            hops.iter_mut().for_each(|h| *h = None);
            hops[winner] = Some(0);
            queue.clear();
            queue.push_back(winner);
            while let Some(v) = queue.pop_front() {
                let d = hops[v].unwrap_or(0);
                if frame.movable[v] {
                    let factor = adaption / 2f64.powi(d as i32);
                    let p = frame.positions[v];
                    frame.positions[v] = p + (target - p) * factor;
                }
                if d < radius {
                    for &w in &adjacency[v] {
                        if hops[w].is_none() {
                            hops[w] = Some(d + 1);
                            queue.push_back(w);
                        }
                    }
                }
            }

            if epoch > 0
                && epoch % self.params.radius_constant_time == 0
                && radius > self.params.min_radius
            {
                radius -= 1;
            }

            let base = &self.state.positions;
            self.state
                .progress
                .report(epoch + 1, epochs, "epoch", false, || frame.snapshot(base));
        }

        frame.write_back(&mut self.state.positions);
        Ok(ComputeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mixed_graph, vid};
    use crate::ProcessingOption;
    use test_log::test;

    #[test]
    fn test_positions_stay_in_area() {
        let mut layout = IsomLayout::new(mixed_graph(), None, None, IsomParameters::default());
        layout.compute(&CancellationToken::new()).unwrap();
        let area = Rect::new(0.0, 0.0, 300.0, 300.0);
        assert_eq!(layout.vertex_positions().len(), 9);
        for p in layout.vertex_positions().values() {
            assert!(area.contains_point(*p));
        }
    }

    #[test]
    fn test_adaption_decays_to_minimum() {
        let layout = IsomLayout::new(
            mixed_graph(),
            None,
            None,
            IsomParameters {
                min_adaption: 0.2,
                ..Default::default()
            },
        );
        assert!((layout.adaption(0) - 0.9).abs() < 1e-12);
        assert!(layout.adaption(1000) < layout.adaption(10));
        assert!(layout.adaption(2000) >= 0.2);
    }

    #[test]
    fn test_frozen_vertex_not_moved() {
        let mut graph = mixed_graph();
        graph.vertex_mut(vid(3)).unwrap().skip_processing = ProcessingOption::Freeze;
        let fixed = Point::new(150.0, 150.0);
        let mut layout = IsomLayout::new(
            graph,
            Some(Positions::from([(vid(3), fixed)])),
            None,
            IsomParameters::default(),
        );
        layout.compute(&CancellationToken::new()).unwrap();
        assert_eq!(layout.vertex_positions()[&vid(3)], fixed);
    }

    #[test]
    fn test_min_radius_above_initial_is_rejected() {
        let params = IsomParameters {
            min_radius: 9,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
