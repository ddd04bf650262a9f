use super::crossings::barycenter_sweeps;
use super::positions::{median_coordinates, Spacing};
use super::{LayeredEdgeRouting, LayoutDirection, Prepared};
use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, EdgeRoutes, Graph, LayoutAlgorithm,
    LayoutError, LayoutState, Positions, Sizes,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficientSugiyamaParameters {
    pub direction: LayoutDirection,
    /// Distance between consecutive layers
    pub layer_distance: f64,
    /// Minimum distance between neighbours within a layer
    pub vertex_distance: f64,
    /// Rounds of down and up barycenter sweeps
    pub crossing_sweeps: usize,
    /// Rounds of median alignment
    pub alignment_sweeps: usize,
    pub edge_routing: LayeredEdgeRouting,
}

impl Default for EfficientSugiyamaParameters {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            layer_distance: 30.0,
            vertex_distance: 15.0,
            crossing_sweeps: 8,
            alignment_sweeps: 4,
            edge_routing: LayeredEdgeRouting::Polyline,
        }
    }
}

impl AlgorithmParameters for EfficientSugiyamaParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("layer_distance", self.layer_distance)?;
        ensure_non_negative("vertex_distance", self.vertex_distance)
    }
}

/// Sugiyama layout with barycenter sweeps and median alignment
#[derive(Debug)]
pub struct EfficientSugiyamaLayout {
    state: LayoutState,
    params: EfficientSugiyamaParameters,
    routes: EdgeRoutes,
    crossings: usize,
}

impl EfficientSugiyamaLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: EfficientSugiyamaParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
            routes: EdgeRoutes::new(),
            crossings: 0,
        }
    }

    /// Edge crossings left after the last `compute`, dummies included
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    fn cancelled(&self, step: usize) -> Result<ComputeOutcome, LayoutError> {
        self.state
            .progress
            .report(step, 3, "cancelled", true, || self.state.positions.clone());
        Ok(ComputeOutcome::Cancelled)
    }
}

impl LayoutAlgorithm for EfficientSugiyamaLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn edge_routes(&self) -> Option<&EdgeRoutes> {
        Some(&self.routes)
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        if cancel.is_cancelled() {
            return self.cancelled(0);
        }
        let prepared = Prepared::new(&self.state, self.params.direction)?;

        let Some((layers, crossings)) = barycenter_sweeps(
            &prepared.hierarchy,
            prepared.hierarchy.layers.clone(),
            self.params.crossing_sweeps,
            cancel,
        ) else {
            return self.cancelled(1);
        };
        self.crossings = crossings;
        self.state
            .progress
            .report(2, 3, "crossings reduced", false, || self.state.positions.clone());

        if cancel.is_cancelled() {
            return self.cancelled(2);
        }
        let local = median_coordinates(
            &prepared.hierarchy,
            &layers,
            &prepared.extent,
            Spacing {
                vertex: self.params.vertex_distance,
                layer: self.params.layer_distance,
            },
            self.params.alignment_sweeps,
        );
        prepared.finish(
            &local,
            self.params.direction,
            self.params.edge_routing,
            &mut self.state.positions,
            &mut self.routes,
        );
        debug!("Efficient Sugiyama layout done, {crossings} crossings");
        self.state
            .progress
            .report(3, 3, "done", false, || self.state.positions.clone());
        Ok(ComputeOutcome::Completed)
    }
}
