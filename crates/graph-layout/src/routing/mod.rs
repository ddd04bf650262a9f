//! Edge routing over laid-out vertex rectangles
//!
//! Routers read positions and rectangles and only ever write routes. Every
//! route runs from the source rectangle border to the target rectangle
//! border.

mod bundling;
mod pathfinder;
mod simple;

pub use bundling::{BundlingEdgeRouting, BundlingParameters};
pub use pathfinder::{PathFinderEdgeRouting, PathFinderParameters};
pub use simple::{SimpleEdgeRouting, SimpleRoutingParameters};

use crate::{
    CancellationToken, ComputeOutcome, Edge, EdgeRoutes, Graph, LayoutError, Positions, Rect,
    Rectangles, Vec2, VertexId,
};

/// A post-processing stage that computes control points for edges
pub trait EdgeRoutingAlgorithm: Send {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError>;

    fn routes(&self) -> &EdgeRoutes;

    fn into_routes(self: Box<Self>) -> EdgeRoutes;
}

/// Graph and geometry a router works on
#[derive(Debug, Clone)]
pub(crate) struct RoutingInput {
    pub area: Rect,
    pub graph: Graph,
    pub rects: Rectangles,
}

impl RoutingInput {
    /// Vertices with a position but no rectangle are treated as points
    pub fn new(area: Rect, graph: Graph, positions: &Positions, rectangles: Rectangles) -> Self {
        let mut rects = rectangles;
        for (id, p) in positions {
            rects
                .entry(*id)
                .or_insert_with(|| Rect::from_point_size(*p, Vec2::zero()));
        }
        Self { area, graph, rects }
    }

    /// Edges whose endpoints are both admitted and have a rectangle, in graph
    /// order
    pub fn routable_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.graph
            .edges()
            .filter(|e| self.is_routable(e.source) && self.is_routable(e.target))
    }

    fn is_routable(&self, id: VertexId) -> bool {
        self.rects.contains_key(&id)
            && self.graph.vertex(id).is_some_and(|v| !v.is_excluded())
    }

    /// Rectangles other routes have to avoid
    pub fn obstacles(&self) -> impl Iterator<Item = (VertexId, &Rect)> + '_ {
        self.rects
            .iter()
            .filter(|(id, _)| self.is_routable(**id))
            .map(|(id, r)| (*id, r))
    }

    pub fn endpoints(&self, edge: &Edge) -> (Rect, Rect) {
        (self.rects[&edge.source], self.rects[&edge.target])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{path_graph, vid};
    use crate::Point;
    use test_log::test;

    #[test]
    fn test_positions_fill_missing_rectangles() {
        let graph = path_graph(3);
        let positions = Positions::from([
            (vid(0), Point::new(0.0, 0.0)),
            (vid(1), Point::new(50.0, 0.0)),
        ]);
        let rectangles = Rectangles::from([(vid(0), Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let input = RoutingInput::new(Rect::default(), graph, &positions, rectangles);
        assert_eq!(input.rects[&vid(0)].width, 10.0);
        assert_eq!(input.rects[&vid(1)].width, 0.0);
        // Vertex 2 has no geometry, so only the first edge is routable
        assert_eq!(input.routable_edges().count(), 1);
    }
}
