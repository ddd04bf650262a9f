//! Layered (Sugiyama-style) layouts
//!
//! Both variants share the same front end: back edges of the hierarchical
//! subgraph are reversed, vertices are assigned to layers and long edges are
//! split with dummy vertices. They differ in crossing reduction and
//! coordinate assignment. General edges take no part in any of it and are
//! routed as straight lines.

mod acyclic;
mod crossings;
mod efficient;
mod layers;
mod positions;
mod routing;

pub use efficient::{EfficientSugiyamaLayout, EfficientSugiyamaParameters};
pub use routing::LayeredEdgeRouting;
pub(crate) use routing::{self_loop_route, straight_route};

pub use crate::tree::LayoutDirection;

use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, EdgeId, EdgeRoutes, Graph,
    LayoutAlgorithm, LayoutError, LayoutState, Point, Positions, Rect, Sizes, Vec2, VertexIndex,
};
use acyclic::back_edges;
use crossings::minimize_crossings;
use layers::{assign_layers, Hierarchy};
use positions::{assign_coordinates, Spacing};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the layered (Sugiyama-style) layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SugiyamaParameters {
    pub direction: LayoutDirection,
    /// Gap between consecutive layers
    pub layer_gap: f64,
    /// Gap between neighbours within a layer
    pub vertex_gap: f64,

    /// Maximum iterations for crossing minimization
    pub max_crossing_iterations: usize,

    /// Maximum iterations for position optimization within layers
    pub max_position_iterations: usize,
}

impl Default for SugiyamaParameters {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            layer_gap: 20.0,
            vertex_gap: 20.0,
            max_crossing_iterations: 10,
            max_position_iterations: 50,
        }
    }
}

impl AlgorithmParameters for SugiyamaParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("layer_gap", self.layer_gap)?;
        ensure_non_negative("vertex_gap", self.vertex_gap)
    }
}

/// Layer structure of the admitted vertices, before ordering
struct Prepared {
    index: VertexIndex,
    hierarchy: Hierarchy,
    /// Extent of every hierarchy node in the layer-local frame
    extent: Vec<Vec2>,
    /// Measured size of every original vertex
    sizes: Vec<Vec2>,
    /// Edges routed outside the hierarchy: general edges and self loops
    passthrough: Vec<(EdgeId, usize, usize)>,
}

impl Prepared {
    fn new(state: &LayoutState, direction: LayoutDirection) -> Result<Self, LayoutError> {
        let index = VertexIndex::new(state.admitted().map(|v| v.id));
        let mut sizes = Vec::with_capacity(index.len());
        for &id in index.ids() {
            sizes.push(state.require_size(id)?);
        }

        let mut hierarchical = Vec::new();
        let mut passthrough = Vec::new();
        for edge in state.graph.edges() {
            let (Some(s), Some(t)) = (index.get(edge.source), index.get(edge.target)) else {
                continue;
            };
            if edge.is_hierarchical() && s != t {
                hierarchical.push((edge.id, s, t));
            } else {
                passthrough.push((edge.id, s, t));
            }
        }

        let pairs: Vec<(usize, usize)> = hierarchical.iter().map(|&(_, s, t)| (s, t)).collect();
        let reversed = back_edges(index.len(), &pairs);
        let oriented: Vec<(EdgeId, usize, usize, bool)> = hierarchical
            .iter()
            .zip(&reversed)
            .map(|(&(id, s, t), &r)| if r { (id, t, s, true) } else { (id, s, t, false) })
            .collect();
        let layer = assign_layers(
            index.len(),
            &oriented.iter().map(|&(_, u, v, _)| (u, v)).collect::<Vec<_>>(),
        )?;
        let hierarchy = Hierarchy::new(layer, &oriented);

        let vertical = direction.is_vertical();
        let extent = (0..hierarchy.node_count())
            .map(|n| match sizes.get(n) {
                Some(size) if vertical => *size,
                Some(size) => Vec2::new(size.y, size.x),
                None => Vec2::zero(),
            })
            .collect();

        debug!(
            "Layered graph with {} vertices, {} dummies, {} layers, {} reversed edges",
            index.len(),
            hierarchy.node_count() - index.len(),
            hierarchy.layers.len(),
            reversed.iter().filter(|r| **r).count()
        );

        Ok(Self {
            index,
            hierarchy,
            extent,
            sizes,
            passthrough,
        })
    }

    /// Write positions of the original vertices and routes of all edges
    fn finish(
        &self,
        local: &[Point],
        direction: LayoutDirection,
        routing: LayeredEdgeRouting,
        positions: &mut Positions,
        routes: &mut EdgeRoutes,
    ) {
        let depth = local
            .iter()
            .zip(&self.extent)
            .map(|(p, e)| p.y + e.y)
            .fold(0.0, f64::max);
        let global: Vec<Point> = local
            .iter()
            .zip(&self.extent)
            .map(|(p, e)| {
                let across = if direction.is_reversed() {
                    depth - p.y - e.y
                } else {
                    p.y
                };
                if direction.is_vertical() {
                    Point::new(p.x, across)
                } else {
                    Point::new(across, p.x)
                }
            })
            .collect();

        for (i, &id) in self.index.ids().iter().enumerate() {
            positions.insert(id, global[i]);
        }

        let rect = |n: usize| Rect::from_point_size(global[n], self.sizes[n]);
        let centre = |n: usize| {
            if self.hierarchy.is_dummy(n) {
                global[n]
            } else {
                rect(n).center()
            }
        };
        routes.clear();
        for chain in &self.hierarchy.chains {
            let route =
                routing::chain_route(chain, centre, rect, routing, direction.is_vertical());
            routes.insert(chain.edge, route);
        }
        for &(id, s, t) in &self.passthrough {
            let route = if s == t {
                routing::self_loop_route(rect(s))
            } else {
                routing::straight_route(rect(s), rect(t))
            };
            routes.insert(id, route);
        }
    }
}

/// Sugiyama layout with greedy crossing reduction and barycenter placement
#[derive(Debug)]
pub struct SugiyamaLayout {
    state: LayoutState,
    params: SugiyamaParameters,
    routes: EdgeRoutes,
    crossings: usize,
    layer_count: usize,
}

impl SugiyamaLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: SugiyamaParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
            routes: EdgeRoutes::new(),
            crossings: 0,
            layer_count: 0,
        }
    }

    /// Edge crossings left after the last `compute`, dummies included
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    fn cancelled(&self, step: usize) -> Result<ComputeOutcome, LayoutError> {
        self.state
            .progress
            .report(step, 3, "cancelled", true, || self.state.positions.clone());
        Ok(ComputeOutcome::Cancelled)
    }
}

impl LayoutAlgorithm for SugiyamaLayout {
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
        self.state
            .progress
            .report(1, 3, "layers assigned", false, || self.state.positions.clone());

        let Some((layers, crossings)) = minimize_crossings(
            &prepared.hierarchy,
            prepared.hierarchy.layers.clone(),
            self.params.max_crossing_iterations,
            cancel,
        ) else {
            return self.cancelled(1);
        };
        self.crossings = crossings;
        self.layer_count = layers.len();
        self.state
            .progress
            .report(2, 3, "crossings reduced", false, || self.state.positions.clone());

        if cancel.is_cancelled() {
            return self.cancelled(2);
        }
        let local = assign_coordinates(
            &prepared.hierarchy,
            &layers,
            &prepared.extent,
            Spacing {
                vertex: self.params.vertex_gap,
                layer: self.params.layer_gap,
            },
            self.params.max_position_iterations,
        );
        prepared.finish(
            &local,
            self.params.direction,
            LayeredEdgeRouting::Polyline,
            &mut self.state.positions,
            &mut self.routes,
        );
        debug!(
            "Sugiyama layout done, {} layers, {crossings} crossings",
            self.layer_count
        );
        self.state
            .progress
            .report(3, 3, "done", false, || self.state.positions.clone());
        Ok(ComputeOutcome::Completed)
    }
}
