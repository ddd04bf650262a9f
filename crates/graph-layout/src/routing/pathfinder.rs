//! Grid A* edge routing
//!
//! The routing area is sampled with a regular grid. Grid nodes within half a
//! step of any rectangle other than the two endpoints are blocked, so no grid
//! move touches an obstacle. Found paths are
//! reduced to their corners; when the search fails the edge falls back to
//! a straight route.

use super::{EdgeRoutingAlgorithm, RoutingInput};
use crate::error::{ensure_non_negative, ensure_positive};
use crate::layered::{self_loop_route, straight_route};
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Edge, EdgeRoutes, Graph, LayoutError,
    Point, Positions, Rect, Rectangles,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

const ORTHOGONAL_COST: u64 = 10;
const DIAGONAL_COST: u64 = 14;
const POINT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFinderParameters {
    /// Distance between neighbouring grid nodes
    pub grid_size: f64,
    /// Extra space around the routing area the grid also covers
    pub margin: f64,
    pub allow_diagonal: bool,
    /// Upper bound on expanded grid nodes per edge
    pub search_limit: usize,
}

impl Default for PathFinderParameters {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            margin: 20.0,
            allow_diagonal: true,
            search_limit: 50_000,
        }
    }
}

impl AlgorithmParameters for PathFinderParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_positive("grid_size", self.grid_size)?;
        ensure_non_negative("margin", self.margin)?;
        if self.search_limit == 0 {
            return Err(LayoutError::invalid_parameter(
                "search_limit",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Regular grid of nodes over the routing area
#[derive(Debug, Clone)]
struct Grid {
    origin: Point,
    step: f64,
    cols: usize,
    rows: usize,
}

impl Grid {
    fn new(area: Rect, step: f64) -> Self {
        Self {
            origin: area.top_left(),
            step,
            cols: (area.width / step).ceil() as usize + 1,
            rows: (area.height / step).ceil() as usize + 1,
        }
    }

    fn point(&self, idx: usize) -> Point {
        let (c, r) = (idx % self.cols, idx / self.cols);
        Point::new(
            self.origin.x + c as f64 * self.step,
            self.origin.y + r as f64 * self.step,
        )
    }

    fn nearest(&self, p: Point) -> usize {
        let clamp = |v: f64, n: usize| (v.round().max(0.0) as usize).min(n - 1);
        let c = clamp((p.x - self.origin.x) / self.step, self.cols);
        let r = clamp((p.y - self.origin.y) / self.step, self.rows);
        r * self.cols + c
    }

    /// Neighbouring nodes with their move cost and, for diagonal moves, the
    /// two nodes whose corner the move passes
    fn neighbours(
        &self,
        idx: usize,
        diagonal: bool,
    ) -> impl Iterator<Item = (usize, u64, Option<[usize; 2]>)> + '_ {
        const DIRS: [(i64, i64); 8] = [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ];
        let (c, r) = ((idx % self.cols) as i64, (idx / self.cols) as i64);
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        let count = if diagonal { 8 } else { 4 };
        DIRS[..count].iter().filter_map(move |&(dc, dr)| {
            let (nc, nr) = (c + dc, r + dr);
            if nc < 0 || nr < 0 || nc >= cols || nr >= rows {
                return None;
            }
            let at = |c: i64, r: i64| (r * cols + c) as usize;
            if dc != 0 && dr != 0 {
                // Diagonal moves may not cut a blocked corner
                Some((at(nc, nr), DIAGONAL_COST, Some([at(nc, r), at(c, nr)])))
            } else {
                Some((at(nc, nr), ORTHOGONAL_COST, None))
            }
        })
    }

    /// Padding that puts a node into every rectangle a move from it could
    /// touch: each point of a move is within half a step of one of its ends
    fn clearance(&self) -> f64 {
        self.step / 2.0 + self.step * 1e-6
    }

    /// Number of rectangles, grown by the clearance, containing each node
    fn cover<'a>(&self, rects: impl Iterator<Item = &'a Rect>) -> Vec<u32> {
        let mut cover = vec![0; self.cols * self.rows];
        let pad = self.clearance();
        let span = |lo: f64, hi: f64, origin: f64, n: usize| {
            let first = ((lo - origin) / self.step).floor().max(0.0) as usize;
            let last = (((hi - origin) / self.step).ceil().max(0.0) as usize).min(n - 1);
            first..=last
        };
        for r in rects.map(|r| r.inflate(pad, pad)) {
            for row in span(r.y, r.bottom(), self.origin.y, self.rows) {
                for col in span(r.x, r.right(), self.origin.x, self.cols) {
                    let idx = row * self.cols + col;
                    if r.contains_point(self.point(idx)) {
                        cover[idx] += 1;
                    }
                }
            }
        }
        cover
    }

    fn heuristic(&self, a: usize, b: usize, diagonal: bool) -> u64 {
        let dc = (a % self.cols).abs_diff(b % self.cols) as u64;
        let dr = (a / self.cols).abs_diff(b / self.cols) as u64;
        if diagonal {
            let (lo, hi) = (dc.min(dr), dc.max(dr));
            lo * DIAGONAL_COST + (hi - lo) * ORTHOGONAL_COST
        } else {
            (dc + dr) * ORTHOGONAL_COST
        }
    }
}

/// Shortest path between two grid nodes avoiding `blocked` ones
fn a_star(
    grid: &Grid,
    blocked: &[bool],
    start: usize,
    goal: usize,
    diagonal: bool,
    limit: usize,
) -> Option<Vec<usize>> {
    let n = blocked.len();
    let mut cost = vec![u64::MAX; n];
    let mut came_from = vec![usize::MAX; n];
    // Min-heap: (Reverse(priority), Reverse(counter), node)
    let mut open: BinaryHeap<(Reverse<u64>, Reverse<u64>, usize)> = BinaryHeap::new();
    let mut counter = 0u64;
    cost[start] = 0;
    open.push((Reverse(grid.heuristic(start, goal, diagonal)), Reverse(counter), start));

    let mut expanded = 0;
    while let Some((Reverse(priority), _, current)) = open.pop() {
        if current == goal {
            let mut path = vec![goal];
            let mut at = goal;
            while at != start {
                at = came_from[at];
                path.push(at);
            }
            path.reverse();
            return Some(path);
        }
        if priority > cost[current] + grid.heuristic(current, goal, diagonal) {
            continue;
        }
        expanded += 1;
        if expanded > limit {
            return None;
        }
        for (next, step, corners) in grid.neighbours(current, diagonal) {
            let free = |i: usize| !blocked[i] || i == goal;
            if !free(next) || corners.is_some_and(|cs| cs.iter().any(|&c| blocked[c])) {
                continue;
            }
            let new_cost = cost[current] + step;
            if new_cost < cost[next] {
                cost[next] = new_cost;
                came_from[next] = current;
                counter += 1;
                open.push((
                    Reverse(new_cost + grid.heuristic(next, goal, diagonal)),
                    Reverse(counter),
                    next,
                ));
            }
        }
    }
    None
}

/// Drop points lying on a straight line between their neighbours
fn simplify(points: Vec<Point>) -> Vec<Point> {
    if points.len() <= 2 {
        return points;
    }
    let mut out = vec![points[0]];
    for w in points.windows(3) {
        let (a, b, c) = (w[0], w[1], w[2]);
        let (u, v) = (b - a, c - b);
        let cross = u.x * v.y - u.y * v.x;
        if cross.abs() > 1e-9 || u.dot(v) < 0.0 {
            out.push(b);
        }
    }
    out.push(points[points.len() - 1]);
    out
}

/// Obstacle-avoiding routes found by A* over a grid
#[derive(Debug, Clone)]
pub struct PathFinderEdgeRouting {
    input: RoutingInput,
    params: PathFinderParameters,
    routes: EdgeRoutes,
}

impl PathFinderEdgeRouting {
    pub fn new(
        area: Rect,
        graph: Graph,
        positions: &Positions,
        rectangles: Rectangles,
        params: PathFinderParameters,
    ) -> Self {
        Self {
            input: RoutingInput::new(area, graph, positions, rectangles),
            params,
            routes: EdgeRoutes::new(),
        }
    }

    fn route(&self, grid: &Grid, cover: &[u32], edge: &Edge) -> Vec<Point> {
        let (source, target) = self.input.endpoints(edge);
        let pad = grid.clearance();
        let (source_zone, target_zone) = (source.inflate(pad, pad), target.inflate(pad, pad));
        let blocked: Vec<bool> = cover
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let p = grid.point(i);
                let own = u32::from(source_zone.contains_point(p))
                    + u32::from(target_zone.contains_point(p));
                count > own
            })
            .collect();
        let (start, goal) = (grid.nearest(source.center()), grid.nearest(target.center()));

        let Some(path) = a_star(
            grid,
            &blocked,
            start,
            goal,
            self.params.allow_diagonal,
            self.params.search_limit,
        ) else {
            warn!("No path found for edge {}, routing it straight", edge.id);
            return straight_route(source, target);
        };

        let mut points = vec![source.center()];
        points.extend(
            path.into_iter()
                .map(|i| grid.point(i))
                .skip_while(|p| source.contains_point(*p)),
        );
        while points.len() > 1 && target.contains_point(points[points.len() - 1]) {
            points.pop();
        }
        points.push(target.center());
        points.dedup_by(|a, b| a.distance(*b) < POINT_EPSILON);
        let mut points = simplify(points);
        if points.len() < 2 {
            return straight_route(source, target);
        }
        let last = points.len() - 1;
        points[0] = source.clip_from_center(points[1]);
        points[last] = target.clip_from_center(points[last - 1]);
        points.dedup_by(|a, b| a.distance(*b) < POINT_EPSILON);
        if points.len() < 2 {
            return straight_route(source, target);
        }
        points
    }
}

impl EdgeRoutingAlgorithm for PathFinderEdgeRouting {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let area = Rect::bounding(self.input.rects.values())
            .map_or(self.input.area, |bb| bb.union(&self.input.area))
            .inflate(self.params.margin, self.params.margin);
        let grid = Grid::new(area, self.params.grid_size);
        let cover = grid.cover(self.input.obstacles().map(|(_, r)| r));
        debug!("Path finding on a {}x{} grid", grid.cols, grid.rows);

        let mut routes = EdgeRoutes::new();
        for edge in self.input.routable_edges() {
            if cancel.is_cancelled() {
                self.routes = routes;
                return Ok(ComputeOutcome::Cancelled);
            }
            let route = if edge.is_self_loop() {
                self_loop_route(self.input.rects[&edge.source])
            } else {
                self.route(&grid, &cover, edge)
            };
            routes.insert(edge.id, route);
        }
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

    fn blocked_line() -> (Graph, Rectangles, Rect) {
        let graph = Graph::from_parts((0..3).map(Vertex::new), [Edge::new(0, 0, 1)]).unwrap();
        let obstacle = Rect::new(40.0, -20.0, 20.0, 60.0);
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(90.0, 0.0, 10.0, 10.0)),
            (vid(2), obstacle),
        ]);
        (graph, rects, obstacle)
    }

    fn run(params: PathFinderParameters) -> (Vec<Point>, Rect) {
        let (graph, rects, obstacle) = blocked_line();
        let mut router = PathFinderEdgeRouting::new(
            Rect::new(-50.0, -100.0, 250.0, 250.0),
            graph,
            &Positions::new(),
            rects,
            params,
        );
        router.compute(&CancellationToken::new()).unwrap();
        (router.routes()[&EdgeId(0)].clone(), obstacle)
    }

    #[test]
    fn test_route_avoids_obstacle() {
        for allow_diagonal in [true, false] {
            let (route, obstacle) = run(PathFinderParameters {
                allow_diagonal,
                ..Default::default()
            });
            assert!(route.len() > 2, "{route:?}");
            for pair in route.windows(2) {
                assert!(!obstacle.intersects_segment(pair[0], pair[1]), "{route:?}");
                assert!(pair[0].distance(pair[1]) > 1e-9, "{route:?}");
            }
        }
    }

    #[test]
    fn test_small_obstacle_between_grid_nodes() {
        let graph = Graph::from_parts((0..3).map(Vertex::new), [Edge::new(0, 0, 1)]).unwrap();
        let obstacle = Rect::new(43.0, 8.0, 4.0, 4.0);
        let rects = Rectangles::from([
            (vid(0), Rect::new(0.0, 0.0, 10.0, 10.0)),
            (vid(1), Rect::new(90.0, 0.0, 10.0, 10.0)),
            (vid(2), obstacle),
        ]);
        for allow_diagonal in [true, false] {
            let mut router = PathFinderEdgeRouting::new(
                Rect::new(0.0, 0.0, 100.0, 10.0),
                graph.clone(),
                &Positions::new(),
                rects.clone(),
                PathFinderParameters {
                    allow_diagonal,
                    ..Default::default()
                },
            );
            router.compute(&CancellationToken::new()).unwrap();
            let route = &router.routes()[&EdgeId(0)];
            for pair in route.windows(2) {
                assert!(!obstacle.intersects_segment(pair[0], pair[1]), "{route:?}");
                assert!(pair[0].distance(pair[1]) > 1e-9, "{route:?}");
            }
            // Ends sit on the endpoint borders
            let near = |r: &Rect, p: Point| r.inflate(1e-9, 1e-9).contains_point(p);
            assert!(near(&rects[&vid(0)], route[0]), "{route:?}");
            assert!(near(&rects[&vid(1)], route[route.len() - 1]), "{route:?}");
        }
    }

    #[test]
    fn test_search_limit_falls_back_to_straight() {
        let (route, _) = run(PathFinderParameters {
            search_limit: 1,
            ..Default::default()
        });
        assert_eq!(route, vec![Point::new(10.0, 5.0), Point::new(90.0, 5.0)]);
    }

    #[test]
    fn test_simplify_keeps_corners() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
        ];
        assert_eq!(
            simplify(points),
            vec![
                Point::new(0.0, 0.0),
                Point::new(20.0, 0.0),
                Point::new(20.0, 10.0)
            ]
        );
    }

    #[test]
    fn test_orthogonal_grid_route() {
        let (route, _) = run(PathFinderParameters {
            allow_diagonal: false,
            ..Default::default()
        });
        for pair in route[1..route.len() - 1].windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }
}
