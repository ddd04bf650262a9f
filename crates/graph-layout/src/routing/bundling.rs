//! Force-directed edge bundling
//!
//! Every edge is subdivided into evenly spaced points. Each iteration pulls
//! the points of compatible edges towards each other while a spring keeps
//! each edge smooth; points of incompatible edges that come too close push
//! each other apart. A final straightening pass blends the result back
//! towards the straight line.

use super::{EdgeRoutingAlgorithm, RoutingInput};
use crate::error::{ensure_non_negative, ensure_positive};
use crate::layered::{self_loop_route, straight_route};
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, EdgeId, EdgeRoutes, Graph,
    LayoutError, Point, Positions, Rect, Rectangles,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlingParameters {
    /// Interior control points per edge
    pub subdivision_points: usize,
    pub iterations: usize,
    /// Stiffness of the springs between consecutive control points
    pub spring_constant: f64,
    /// Step length of the first iteration, decreasing linearly to zero
    pub step_size: f64,
    /// Pairs below this compatibility do not attract each other
    pub compatibility_threshold: f64,
    /// Strength of the push between incompatible edges
    pub repulsion: f64,
    /// Distance under which incompatible control points repel
    pub repulsion_distance: f64,
    /// Blend towards the straight line applied at the end, in `[0, 1]`
    pub straightening: f64,
    /// Compute per-edge forces on the rayon thread pool
    pub use_threading: bool,
}

impl Default for BundlingParameters {
    fn default() -> Self {
        Self {
            subdivision_points: 10,
            iterations: 100,
            spring_constant: 10.0,
            step_size: 1.0,
            compatibility_threshold: 0.6,
            repulsion: 0.1,
            repulsion_distance: 20.0,
            straightening: 0.15,
            use_threading: true,
        }
    }
}

impl AlgorithmParameters for BundlingParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        if self.subdivision_points == 0 {
            return Err(LayoutError::invalid_parameter(
                "subdivision_points",
                "must be at least 1",
            ));
        }
        ensure_non_negative("spring_constant", self.spring_constant)?;
        ensure_positive("step_size", self.step_size)?;
        ensure_non_negative("repulsion", self.repulsion)?;
        ensure_non_negative("repulsion_distance", self.repulsion_distance)?;
        if !(0.0..=1.0).contains(&self.compatibility_threshold) {
            return Err(LayoutError::invalid_parameter(
                "compatibility_threshold",
                "must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.straightening) {
            return Err(LayoutError::invalid_parameter(
                "straightening",
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Compatibility of two straight edges in `[0, 1]`: angle, scale and
/// position terms multiplied together
fn compatibility(p: (Point, Point), q: (Point, Point)) -> f64 {
    let (vp, vq) = (p.1 - p.0, q.1 - q.0);
    let (lp, lq) = (vp.length(), vq.length());
    if lp < EPSILON || lq < EPSILON {
        return 0.0;
    }
    let angle = (vp.dot(vq) / (lp * lq)).abs();
    let avg = (lp + lq) / 2.0;
    let scale = 2.0 / (avg / lp.min(lq) + lp.max(lq) / avg);
    let mid_distance = p.0.midpoint(p.1).distance(q.0.midpoint(q.1));
    let position = avg / (avg + mid_distance);
    (angle * scale * position).clamp(0.0, 1.0)
}

/// Another edge interacting with an edge
#[derive(Debug, Clone, Copy)]
struct Link {
    other: usize,
    /// Positive: attraction weight; otherwise the pair only repels
    weight: f64,
    /// The other edge runs the opposite way, so its points pair in reverse
    flipped: bool,
}

#[derive(Debug)]
struct Bundle {
    points: Vec<Vec<Point>>,
    links: Vec<Vec<Link>>,
    /// Spring constant scaled by edge length and subdivision
    stiffness: Vec<f64>,
}

impl Bundle {
    fn new(segments: &[(Point, Point)], params: &BundlingParameters) -> Self {
        let p = params.subdivision_points;
        let points = segments
            .iter()
            .map(|&(a, b)| (0..=p + 1).map(|k| a.lerp(b, k as f64 / (p + 1) as f64)).collect())
            .collect();
        let links = segments
            .iter()
            .enumerate()
            .map(|(i, &si)| {
                segments
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, &sj)| {
                        let c = compatibility(si, sj);
                        Link {
                            other: j,
                            weight: if c >= params.compatibility_threshold { c } else { 0.0 },
                            flipped: (si.1 - si.0).dot(sj.1 - sj.0) < 0.0,
                        }
                    })
                    .collect()
            })
            .collect();
        let stiffness = segments
            .iter()
            .map(|&(a, b)| params.spring_constant / (a.distance(b).max(EPSILON) * (p + 1) as f64))
            .collect();
        Self {
            points,
            links,
            stiffness,
        }
    }

    /// Move the interior points of edge `e` into `out`, reading only the
    /// current state
    fn step_edge(&self, e: usize, step: f64, params: &BundlingParameters, out: &mut [Point]) {
        let current = &self.points[e];
        let last = current.len() - 1;
        out.copy_from_slice(current);
        for i in 1..last {
            let p = current[i];
            let mut force =
                ((current[i - 1] - p) + (current[i + 1] - p)) * self.stiffness[e];
            for link in &self.links[e] {
                let other = &self.points[link.other];
                let q = other[if link.flipped { last - i } else { i }];
                let d = q - p;
                let dist = d.length();
                if dist < EPSILON {
                    continue;
                }
                if link.weight > 0.0 {
                    force += d * (link.weight / dist);
                } else if dist < params.repulsion_distance {
                    force -= d * (params.repulsion / dist);
                }
            }
            out[i] = p + force * step;
        }
    }

    fn iterate(&mut self, step: f64, params: &BundlingParameters) {
        let mut next: Vec<Vec<Point>> = self.points.clone();
        if params.use_threading {
            next.par_iter_mut()
                .enumerate()
                .for_each(|(e, buf)| self.step_edge(e, step, params, buf));
        } else {
            next.iter_mut()
                .enumerate()
                .for_each(|(e, buf)| self.step_edge(e, step, params, buf));
        }
        self.points = next;
    }

    fn straighten(&mut self, amount: f64) {
        for points in &mut self.points {
            let last = points.len() - 1;
            let (a, b) = (points[0], points[last]);
            for (k, p) in points.iter_mut().enumerate() {
                let straight = a.lerp(b, k as f64 / last as f64);
                *p = p.lerp(straight, amount);
            }
        }
    }
}

/// Force-directed bundling of the straight edges; self loops get a small
/// loop and zero-length edges keep a straight route
#[derive(Debug, Clone)]
pub struct BundlingEdgeRouting {
    input: RoutingInput,
    params: BundlingParameters,
    routes: EdgeRoutes,
}

impl BundlingEdgeRouting {
    pub fn new(
        area: Rect,
        graph: Graph,
        positions: &Positions,
        rectangles: Rectangles,
        params: BundlingParameters,
    ) -> Self {
        Self {
            input: RoutingInput::new(area, graph, positions, rectangles),
            params,
            routes: EdgeRoutes::new(),
        }
    }

    fn write_routes(&mut self, ids: &[EdgeId], bundle: &Bundle) {
        for (id, points) in ids.iter().zip(&bundle.points) {
            let Some(edge) = self.input.graph.edge(*id) else {
                continue;
            };
            let (source, target) = self.input.endpoints(edge);
            let mut route = points.clone();
            let last = route.len() - 1;
            route[0] = source.clip_from_center(route[1]);
            route[last] = target.clip_from_center(route[last - 1]);
            self.routes.insert(*id, route);
        }
    }
}

impl EdgeRoutingAlgorithm for BundlingEdgeRouting {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        self.routes.clear();
        let mut ids = Vec::new();
        let mut segments = Vec::new();
        for edge in self.input.routable_edges() {
            let (source, target) = self.input.endpoints(edge);
            let (a, b) = (source.center(), target.center());
            if edge.is_self_loop() {
                self.routes.insert(edge.id, self_loop_route(source));
            } else if a.distance(b) < EPSILON {
                self.routes.insert(edge.id, straight_route(source, target));
            } else {
                ids.push(edge.id);
                segments.push((a, b));
            }
        }

        let mut bundle = Bundle::new(&segments, &self.params);
        let total = self.params.iterations;
        for iteration in 0..total {
            if cancel.is_cancelled() {
                self.write_routes(&ids, &bundle);
                return Ok(ComputeOutcome::Cancelled);
            }
            let step = self.params.step_size * (1.0 - iteration as f64 / total as f64);
            bundle.iterate(step, &self.params);
            if iteration % 20 == 0 {
                trace!("Bundling iteration {iteration}/{total}");
            }
        }
        bundle.straighten(self.params.straightening);
        self.write_routes(&ids, &bundle);
        debug!("Bundled {} edges", ids.len());
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
    use crate::{Edge, Vertex};
    use test_log::test;

    /// Two long horizontal edges 20 apart plus a short vertical one far away
    fn input() -> (Graph, Rectangles) {
        let graph = Graph::from_parts(
            (0..6).map(Vertex::new),
            [Edge::new(0, 0, 1), Edge::new(1, 2, 3), Edge::new(2, 4, 5)],
        )
        .unwrap();
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(300.0, 0.0, 10.0, 10.0)),
            (vid(2), Rect::new(0.0, 20.0, 10.0, 10.0)),
            (vid(3), Rect::new(300.0, 20.0, 10.0, 10.0)),
            (vid(4), Rect::new(600.0, 0.0, 10.0, 10.0)),
            (vid(5), Rect::new(600.0, 40.0, 10.0, 10.0)),
        ]);
        (graph, rects)
    }

    fn run(params: BundlingParameters) -> EdgeRoutes {
        let (graph, rects) = input();
        let mut router = BundlingEdgeRouting::new(
            Rect::new(0.0, 0.0, 700.0, 100.0),
            graph,
            &Positions::new(),
            rects,
            params,
        );
        assert_eq!(
            router.compute(&CancellationToken::new()).unwrap(),
            ComputeOutcome::Completed
        );
        router.routes().clone()
    }

    #[test]
    fn test_compatibility_terms() {
        let a = (Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((compatibility(a, a) - 1.0).abs() < 1e-9);
        let perpendicular = (Point::new(50.0, -50.0), Point::new(50.0, 50.0));
        assert!(compatibility(a, perpendicular) < 1e-9);
        let far = (Point::new(1000.0, 0.0), Point::new(1100.0, 0.0));
        assert!(compatibility(a, far) < compatibility(a, a));
    }

    #[test]
    fn test_compatible_edges_move_closer() {
        let routes = run(BundlingParameters::default());
        let (top, bottom) = (&routes[&EdgeId(0)], &routes[&EdgeId(1)]);
        let mid = top.len() / 2;
        assert!((bottom[mid].y - top[mid].y).abs() < 20.0);
        // Endpoints stay on the rectangle borders
        assert!((top[0].x - 10.0).abs() < 1e-9);
        assert_eq!(top.len(), 12);
    }

    #[test]
    fn test_threading_does_not_change_result() {
        let parallel = run(BundlingParameters::default());
        let sequential = run(BundlingParameters {
            use_threading: false,
            ..Default::default()
        });
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_full_straightening() {
        let routes = run(BundlingParameters {
            straightening: 1.0,
            ..Default::default()
        });
        for p in &routes[&EdgeId(0)][1..11] {
            assert!((p.y - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cancelled_still_reports_routes() {
        let (graph, rects) = input();
        let mut router = BundlingEdgeRouting::new(
            Rect::default(),
            graph,
            &Positions::new(),
            rects,
            BundlingParameters::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(router.compute(&cancel).unwrap().is_cancelled());
        assert_eq!(router.routes().len(), 3);
    }

    #[test]
    fn test_self_loop_gets_loop_route() {
        let graph = Graph::from_parts([Vertex::new(0)], [Edge::new(0, 0, 0)]).unwrap();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut router = BundlingEdgeRouting::new(
            rect,
            graph,
            &Positions::new(),
            Rectangles::from([(vid(0), rect)]),
            BundlingParameters::default(),
        );
        router.compute(&CancellationToken::new()).unwrap();
        let route = &router.routes()[&EdgeId(0)];
        assert_eq!(route, &self_loop_route(rect));
        assert!(route.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_invalid_threshold() {
        let params = BundlingParameters {
            compatibility_threshold: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
