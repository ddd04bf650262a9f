use super::{EdgeRoutingAlgorithm, RoutingInput};
use crate::error::ensure_non_negative;
use crate::layered::{self_loop_route, straight_route};
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Edge, EdgeRoutes, Graph, LayoutError,
    Point, Positions, Rect, Rectangles, VertexId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleRoutingParameters {
    /// Perpendicular distance between the control points of parallel edges
    pub parallel_edge_offset: f64,
    /// Clearance kept from a rectangle an edge has to step around
    pub side_step: f64,
}

impl Default for SimpleRoutingParameters {
    fn default() -> Self {
        Self {
            parallel_edge_offset: 10.0,
            side_step: 10.0,
        }
    }
}

impl AlgorithmParameters for SimpleRoutingParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("parallel_edge_offset", self.parallel_edge_offset)?;
        ensure_non_negative("side_step", self.side_step)
    }
}

/// Straight routes with fanned-out parallel edges and a single side step
/// around the first rectangle in the way
#[derive(Debug, Clone)]
pub struct SimpleEdgeRouting {
    input: RoutingInput,
    params: SimpleRoutingParameters,
    routes: EdgeRoutes,
}

impl SimpleEdgeRouting {
    pub fn new(
        area: Rect,
        graph: Graph,
        positions: &Positions,
        rectangles: Rectangles,
        params: SimpleRoutingParameters,
    ) -> Self {
        Self {
            input: RoutingInput::new(area, graph, positions, rectangles),
            params,
            routes: EdgeRoutes::new(),
        }
    }

    /// Route through a control point, clipping both ends towards it
    fn via(source: Rect, target: Rect, control: Point) -> Vec<Point> {
        vec![
            source.clip_from_center(control),
            control,
            target.clip_from_center(control),
        ]
    }

    fn single(&self, edge: &Edge) -> Vec<Point> {
        let (source, target) = self.input.endpoints(edge);
        let (a, b) = (source.center(), target.center());
        let obstacle = self
            .input
            .obstacles()
            .filter(|(id, _)| *id != edge.source && *id != edge.target)
            .filter(|(_, r)| r.intersects_segment(a, b))
            .min_by(|(ia, ra), (ib, rb)| {
                a.distance(ra.center())
                    .total_cmp(&a.distance(rb.center()))
                    .then(ia.cmp(ib))
            });
        let Some((_, obstacle)) = obstacle else {
            return straight_route(source, target);
        };

        let normal = (b - a).perpendicular().normalized();
        let c = obstacle.center();
        // Step to the side of the segment the obstacle centre is not on
        let side = if (c - a).dot(normal) > 0.0 { -1.0 } else { 1.0 };
        let reach = obstacle.width / 2.0 * normal.x.abs()
            + obstacle.height / 2.0 * normal.y.abs()
            + self.params.side_step;
        Self::via(source, target, c + normal * (side * reach))
    }

    fn parallel(&self, edge: &Edge, slot: usize, count: usize) -> Vec<Point> {
        let (source, target) = self.input.endpoints(edge);
        // Offsets are measured in the frame of the lower id so that edges in
        // both directions fan out consistently
        let (lo, hi) = if edge.source <= edge.target {
            (source, target)
        } else {
            (target, source)
        };
        let (a, b) = (lo.center(), hi.center());
        let normal = (b - a).perpendicular().normalized();
        let offset = (slot as f64 - (count as f64 - 1.0) / 2.0) * self.params.parallel_edge_offset;
        Self::via(source, target, a.midpoint(b) + normal * offset)
    }
}

impl EdgeRoutingAlgorithm for SimpleEdgeRouting {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let mut groups: HashMap<(VertexId, VertexId), Vec<&Edge>> = HashMap::new();
        for edge in self.input.routable_edges() {
            let key = (edge.source.min(edge.target), edge.source.max(edge.target));
            groups.entry(key).or_default().push(edge);
        }

        let mut routes = EdgeRoutes::new();
        for edge in self.input.routable_edges() {
            if cancel.is_cancelled() {
                self.routes = routes;
                return Ok(ComputeOutcome::Cancelled);
            }
            let route = if edge.is_self_loop() {
                self_loop_route(self.input.rects[&edge.source])
            } else {
                let key = (edge.source.min(edge.target), edge.source.max(edge.target));
                let group = &groups[&key];
                if group.len() == 1 {
                    self.single(edge)
                } else {
                    let slot = group.iter().position(|e| e.id == edge.id).unwrap_or(0);
                    self.parallel(edge, slot, group.len())
                }
            };
            routes.insert(edge.id, route);
        }
        debug!("Simple routing produced {} routes", routes.len());
        self.routes = routes;
        Ok(ComputeOutcome::Completed)
    }

    fn routes(&self) -> &EdgeRoutes {
        &self.routes
    }

    fn into_routes(self: Box<Self>) -> EdgeRoutes {
        self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::vid;
    use crate::{EdgeId, Vertex};
    use test_log::test;

    fn route(graph: Graph, rects: Rectangles) -> EdgeRoutes {
        let mut router = SimpleEdgeRouting::new(
            Rect::new(0.0, 0.0, 500.0, 500.0),
            graph,
            &Positions::new(),
            rects,
            SimpleRoutingParameters::default(),
        );
        router.compute(&CancellationToken::new()).unwrap();
        router.routes().clone()
    }

    #[test]
    fn test_straight_edge_clipped() {
        let graph =
            Graph::from_parts([Vertex::new(0), Vertex::new(1)], [Edge::new(0, 0, 1)]).unwrap();
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(100.0, 0.0, 10.0, 10.0)),
        ]);
        let routes = route(graph, rects);
        assert_eq!(
            routes[&EdgeId(0)],
            vec![Point::new(10.0, 5.0), Point::new(100.0, 5.0)]
        );
    }

    #[test]
    fn test_parallel_edges_fan_out() {
        let graph = Graph::from_parts(
            [Vertex::new(0), Vertex::new(1)],
            [Edge::new(0, 0, 1), Edge::new(1, 1, 0)],
        )
        .unwrap();
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(100.0, 0.0, 10.0, 10.0)),
        ]);
        let routes = route(graph, rects);
        let (a, b) = (routes[&EdgeId(0)][1], routes[&EdgeId(1)][1]);
        assert!(((a.y - b.y).abs() - 10.0).abs() < 1e-9);
        assert_eq!(a.x, b.x);
        // The reversed edge still starts at its own source
        assert_eq!(routes[&EdgeId(1)][0].x, 100.0);
    }

    #[test]
    fn test_side_step_around_obstacle() {
        let graph = Graph::from_parts(
            (0..3).map(Vertex::new),
            [Edge::new(0, 0, 1)],
        )
        .unwrap();
        let obstacle = Rect::new(45.0, -5.0, 20.0, 20.0);
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(100.0, 0.0, 10.0, 10.0)),
            (vid(2), obstacle),
        ]);
        let routes = route(graph, rects);
        let r = &routes[&EdgeId(0)];
        assert_eq!(r.len(), 3);
        for pair in r.windows(2) {
            assert!(!obstacle.intersects_segment(pair[0], pair[1]));
        }
    }

    #[test]
    fn test_self_loop_and_missing_endpoint() {
        let graph = Graph::from_parts(
            (0..3).map(Vertex::new),
            [Edge::new(0, 0, 0), Edge::new(1, 0, 2)],
        )
        .unwrap();
        let rects = Rectangles::from([(vid(0), Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let routes = route(graph, rects);
        assert_eq!(routes[&EdgeId(0)].len(), 4);
        assert!(!routes.contains_key(&EdgeId(1)));
    }
}
