use super::layers::Chain;
use crate::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Shape of the routes produced by the layered layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayeredEdgeRouting {
    /// Straight segments through the dummy vertices
    #[default]
    Polyline,
    /// Axis-aligned segments with bends half way between layers
    Orthogonal,
}

/// Route of a layered edge from its source to its target
///
/// `centre` gives the centre of every hierarchy node, `rect` the rectangle
/// of an original vertex.
pub(crate) fn chain_route(
    chain: &Chain,
    centre: impl Fn(usize) -> Point,
    rect: impl Fn(usize) -> Rect,
    routing: LayeredEdgeRouting,
    vertical: bool,
) -> Vec<Point> {
    let mut nodes = chain.nodes.clone();
    if chain.reversed {
        nodes.reverse();
    }
    let (first, last) = (nodes[0], nodes[nodes.len() - 1]);
    let mut points: Vec<Point> = nodes.iter().map(|&n| centre(n)).collect();

    if routing == LayeredEdgeRouting::Orthogonal {
        points = orthogonalize(&points, vertical);
    }

    let count = points.len();
    if count >= 2 {
        points[0] = rect(first).clip_from_center(points[1]);
        points[count - 1] = rect(last).clip_from_center(points[count - 2]);
    }
    points
}

/// Insert bends so that consecutive points are joined by axis-aligned
/// segments, turning half way across the layer gap
fn orthogonalize(points: &[Point], vertical: bool) -> Vec<Point> {
    let mut out = Vec::with_capacity(points.len() * 3);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);
        if vertical {
            let mid = (a.y + b.y) / 2.0;
            if a.x != b.x {
                out.push(Point::new(a.x, mid));
                out.push(Point::new(b.x, mid));
            }
        } else {
            let mid = (a.x + b.x) / 2.0;
            if a.y != b.y {
                out.push(Point::new(mid, a.y));
                out.push(Point::new(mid, b.y));
            }
        }
    }
    if let Some(&last) = points.last() {
        out.push(last);
    }
    out
}

/// Straight route between two rectangles, clipped at their borders
pub(crate) fn straight_route(source: Rect, target: Rect) -> Vec<Point> {
    vec![
        source.clip_from_center(target.center()),
        target.clip_from_center(source.center()),
    ]
}

/// Small loop on the right side of a rectangle
pub(crate) fn self_loop_route(rect: Rect) -> Vec<Point> {
    let c = rect.center();
    let reach = (rect.width.min(rect.height) / 2.0).max(5.0);
    vec![
        Point::new(rect.right(), c.y - reach / 2.0),
        Point::new(rect.right() + reach, c.y - reach / 2.0),
        Point::new(rect.right() + reach, c.y + reach / 2.0),
        Point::new(rect.right(), c.y + reach / 2.0),
    ]
}
