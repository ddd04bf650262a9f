//! Layout, overlap removal and edge routing run as one sequence
//!
//! The factory predicates decide which stages apply to the configured
//! layout kind; the enable flags can switch the post-processing stages off
//! entirely.

use crate::factory::{
    create_edge_routing_algorithm, create_layout_algorithm, create_overlap_removal_algorithm,
    EdgeRoutingKind, LayoutAlgorithmKind, OverlapRemovalKind,
};
use crate::{
    CancellationToken, EdgeRoutes, EdgeRoutingParameters, Graph, IterationSnapshot, LayoutError,
    LayoutParameters, OverlapRemovalParameters, Positions, Rect, Rectangles, Sizes,
};
use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layout: LayoutAlgorithmKind,
    pub layout_parameters: Option<LayoutParameters>,
    pub overlap_removal: OverlapRemovalKind,
    pub overlap_parameters: Option<OverlapRemovalParameters>,
    pub edge_routing: EdgeRoutingKind,
    pub routing_parameters: Option<EdgeRoutingParameters>,
    pub enable_overlap_removal: bool,
    pub enable_edge_routing: bool,
    /// Region available to edge routes, the bounding box of the vertex
    /// rectangles when absent
    pub routing_area: Option<Rect>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutAlgorithmKind::default(),
            layout_parameters: None,
            overlap_removal: OverlapRemovalKind::default(),
            overlap_parameters: None,
            edge_routing: EdgeRoutingKind::default(),
            routing_parameters: None,
            enable_overlap_removal: true,
            enable_edge_routing: true,
            routing_area: None,
        }
    }
}

/// Everything a pipeline run produces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub positions: Positions,
    pub rectangles: Rectangles,
    pub routes: EdgeRoutes,
    /// Some stage was cancelled; the maps hold whatever was done by then
    pub cancelled: bool,
}

/// Owns a graph and runs the configured stages over it
#[derive(Debug, Default)]
pub struct LayoutPipeline {
    graph: Option<Graph>,
    positions: Option<Positions>,
    sizes: Sizes,
    config: PipelineConfig,
    progress: Option<Sender<IterationSnapshot>>,
}

impl LayoutPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = Some(graph);
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// Positions the next layout starts from
    pub fn set_positions(&mut self, positions: Positions) {
        self.positions = Some(positions);
    }

    pub fn set_sizes(&mut self, sizes: Sizes) {
        self.sizes = sizes;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Forward the layout stage's progress snapshots
    pub fn set_progress_sender(&mut self, sender: Sender<IterationSnapshot>) {
        self.progress = Some(sender);
    }

    /// Run layout, then overlap removal and edge routing where they apply
    ///
    /// # Errors
    /// [`LayoutError::GraphNotInitialized`] without a graph, otherwise any
    /// error of the stages themselves.
    pub fn compute(&mut self, cancel: &CancellationToken) -> Result<LayoutOutput, LayoutError> {
        let graph = self.graph.as_ref().ok_or(LayoutError::GraphNotInitialized)?;
        let config = &self.config;
        let kind = config.layout;

        let mut layout = create_layout_algorithm(
            kind,
            graph.clone(),
            self.positions.clone(),
            Some(self.sizes.clone()),
            config.layout_parameters.clone(),
        )?;
        if let Some(sender) = &self.progress {
            layout.set_progress_sender(sender.clone());
        }
        let outcome = layout.compute(cancel)?;

        let mut output = LayoutOutput {
            positions: layout.vertex_positions().clone(),
            rectangles: layout.state().rectangles(),
            routes: layout.edge_routes().cloned().unwrap_or_default(),
            cancelled: outcome.is_cancelled(),
        };
        if output.cancelled {
            debug!("Pipeline cancelled during {kind:?} layout");
            return Ok(output);
        }

        if config.enable_overlap_removal && kind.needs_overlap_removal() {
            let mut removal = create_overlap_removal_algorithm(
                config.overlap_removal,
                output.rectangles,
                config.overlap_parameters.clone(),
            )?;
            let outcome = removal.compute(cancel)?;
            output.rectangles = removal.into_rectangles();
            for (id, rect) in &output.rectangles {
                output.positions.insert(*id, rect.top_left());
            }
            if outcome.is_cancelled() {
                output.cancelled = true;
                return Ok(output);
            }
        }

        if config.enable_edge_routing && kind.needs_edge_routing() {
            let area = config
                .routing_area
                .or_else(|| Rect::bounding(output.rectangles.values()))
                .unwrap_or_default();
            let mut router = create_edge_routing_algorithm(
                config.edge_routing,
                area,
                graph.clone(),
                &output.positions,
                output.rectangles.clone(),
                config.routing_parameters.clone(),
            )?;
            output.cancelled = router.compute(cancel)?.is_cancelled();
            output.routes = router.into_routes();
        }

        debug!(
            "Pipeline finished: {} positions, {} routes",
            output.positions.len(),
            output.routes.len()
        );
        Ok(output)
    }
}
