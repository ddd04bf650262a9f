//! Coordinate assignment in a layer-local frame
//!
//! `x` runs along a layer and `y` across layers. Node extents use the same
//! frame: `extent.x` is the breadth within the layer, `extent.y` the
//! thickness across it.

use super::layers::Hierarchy;
use crate::{Point, Vec2};
use std::cmp::Ordering;

/// Gaps between nodes, in the layer-local frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct Spacing {
    /// Between neighbours within a layer
    pub vertex: f64,
    /// Between consecutive layers
    pub layer: f64,
}

/// Assign coordinates to nodes based on their layer structure and sizes
///
/// Returns the top-left corner of every node, dummies included.
pub(crate) fn assign_coordinates(
    h: &Hierarchy,
    layers: &[Vec<usize>],
    extent: &[Vec2],
    spacing: Spacing,
    max_position_iterations: usize,
) -> Vec<Point> {
    let mut positions = vec![Point::origin(); h.node_count()];

    // First pass: across layers
    assign_layer_positions(layers, extent, &mut positions, spacing);

    // Second pass: along layers
    assign_in_layer_positions(
        h,
        layers,
        extent,
        &mut positions,
        spacing,
        max_position_iterations,
    );

    positions
}

/// Place every layer after the previous one, centring nodes in their layer
pub(crate) fn assign_layer_positions(
    layers: &[Vec<usize>],
    extent: &[Vec2],
    positions: &mut [Point],
    spacing: Spacing,
) {
    let mut y = 0.0;
    for layer in layers {
        let thickness = layer
            .iter()
            .map(|&node| extent[node].y)
            .fold(0.0, f64::max);
        for &node in layer {
            positions[node].y = y + (thickness - extent[node].y) / 2.0;
        }
        y += thickness + spacing.layer;
    }
}

/// Place nodes along their layer with barycenter optimization
fn assign_in_layer_positions(
    h: &Hierarchy,
    layers: &[Vec<usize>],
    extent: &[Vec2],
    positions: &mut [Point],
    spacing: Spacing,
    max_iterations: usize,
) {
    // Initial positioning
    pack_layers(layers, extent, positions, spacing);

    // Iterative optimization
    for _ in 0..max_iterations {
        let mut changed = false;

        for layer_idx in (0..layers.len().saturating_sub(1)).rev() {
            changed |= align_layer(&layers[layer_idx], &h.succ, extent, positions, spacing);
        }
        for layer in layers.iter().skip(1) {
            changed |= align_layer(layer, &h.pred, extent, positions, spacing);
        }

        if !changed {
            break;
        }
    }

    // Final adjustments
    normalize(positions);
}

/// Move every node towards the barycenter of its neighbours
fn align_layer(
    layer: &[usize],
    neighbours: &[Vec<usize>],
    extent: &[Vec2],
    positions: &mut [Point],
    spacing: Spacing,
) -> bool {
    let desired: Vec<f64> = layer
        .iter()
        .map(|&node| match barycenter(&neighbours[node], extent, positions) {
            Some(centre) => centre - extent[node].x / 2.0,
            None => positions[node].x,
        })
        .collect();
    settle(layer, &desired, extent, positions, spacing)
}

/// Calculate the barycenter (average centre) of connected nodes
fn barycenter(nodes: &[usize], extent: &[Vec2], positions: &[Point]) -> Option<f64> {
    if nodes.is_empty() {
        return None;
    }
    let sum: f64 = nodes
        .iter()
        .map(|&n| positions[n].x + extent[n].x / 2.0)
        .sum();
    Some(sum / nodes.len() as f64)
}

/// Place a layer as close as possible to the desired positions
///
/// Overlaps are resolved left to right in layer order, then the layer is
/// shifted so that the mean deviation from the desired positions is zero.
/// Returns whether any node moved noticeably.
fn settle(
    layer: &[usize],
    desired: &[f64],
    extent: &[Vec2],
    positions: &mut [Point],
    spacing: Spacing,
) -> bool {
    if layer.is_empty() {
        return false;
    }
    let mut placed = Vec::with_capacity(layer.len());
    let mut min_x = f64::NEG_INFINITY;
    for (&node, &want) in layer.iter().zip(desired) {
        let x = want.max(min_x);
        placed.push(x);
        min_x = x + extent[node].x + spacing.vertex;
    }
    let shift = desired
        .iter()
        .zip(&placed)
        .map(|(want, got)| want - got)
        .sum::<f64>()
        / placed.len() as f64;

    let mut changed = false;
    for (&node, x) in layer.iter().zip(placed) {
        let x = x + shift;
        if (x - positions[node].x).abs() > 0.1 {
            changed = true;
        }
        positions[node].x = x;
    }
    changed
}

/// Initial positioning with uniform spacing
fn pack_layers(layers: &[Vec<usize>], extent: &[Vec2], positions: &mut [Point], spacing: Spacing) {
    for layer in layers {
        let mut x = 0.0;
        for &node in layer {
            positions[node].x = x;
            x += spacing.vertex + extent[node].x;
        }
    }
}

/// Align every node with the median of its neighbours, packing layers
/// compactly while keeping the order
pub(crate) fn median_coordinates(
    h: &Hierarchy,
    layers: &[Vec<usize>],
    extent: &[Vec2],
    spacing: Spacing,
    sweeps: usize,
) -> Vec<Point> {
    let mut positions = vec![Point::origin(); h.node_count()];
    assign_layer_positions(layers, extent, &mut positions, spacing);
    pack_layers(layers, extent, &mut positions, spacing);

    for _ in 0..sweeps {
        for layer in layers.iter().skip(1) {
            place_at_medians(layer, &h.pred, extent, &mut positions, spacing);
        }
        for layer in layers.iter().rev().skip(1) {
            place_at_medians(layer, &h.succ, extent, &mut positions, spacing);
        }
    }

    normalize(&mut positions);
    positions
}

fn place_at_medians(
    layer: &[usize],
    neighbours: &[Vec<usize>],
    extent: &[Vec2],
    positions: &mut [Point],
    spacing: Spacing,
) {
    let desired: Vec<f64> = layer
        .iter()
        .map(|&node| {
            let mut centres: Vec<f64> = neighbours[node]
                .iter()
                .map(|&n| positions[n].x + extent[n].x / 2.0)
                .collect();
            if centres.is_empty() {
                return positions[node].x;
            }
            centres.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let mid = centres.len() / 2;
            let median = if centres.len() % 2 == 0 {
                (centres[mid - 1] + centres[mid]) / 2.0
            } else {
                centres[mid]
            };
            median - extent[node].x / 2.0
        })
        .collect();

    settle(layer, &desired, extent, positions, spacing);
}

/// Normalize positions along the layers to start from x=0
fn normalize(positions: &mut [Point]) {
    let min_x = positions
        .iter()
        .map(|pos| pos.x)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);

    for pos in positions.iter_mut() {
        pos.x -= min_x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeId;
    use test_log::test;

    const SPACING: Spacing = Spacing {
        vertex: 10.0,
        layer: 20.0,
    };

    /// 0 -> 2, 1 -> 2 with all nodes 10 x 10
    fn fork() -> (Hierarchy, Vec<Vec2>) {
        let h = Hierarchy::new(
            vec![0, 0, 1],
            &[(EdgeId(0), 0, 2, false), (EdgeId(1), 1, 2, false)],
        );
        (h, vec![Vec2::new(10.0, 10.0); 3])
    }

    fn assert_no_overlap(layers: &[Vec<usize>], extent: &[Vec2], positions: &[Point]) {
        for layer in layers {
            for pair in layer.windows(2) {
                let gap = positions[pair[1]].x - (positions[pair[0]].x + extent[pair[0]].x);
                assert!(gap >= SPACING.vertex - 1e-9, "gap {gap}");
            }
        }
    }

    #[test]
    fn test_barycenter_centres_child() {
        let (h, extent) = fork();
        let p = assign_coordinates(&h, &h.layers, &extent, SPACING, 50);
        assert_eq!(p[2].y, 30.0);
        assert!((p[2].x - (p[0].x + p[1].x) / 2.0).abs() < 0.2);
        assert_no_overlap(&h.layers, &extent, &p);
        assert!(p.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).abs() < 1e-9);
    }

    #[test]
    fn test_median_centres_child() {
        let (h, extent) = fork();
        let p = median_coordinates(&h, &h.layers, &extent, SPACING, 4);
        assert!((p[2].x - (p[0].x + p[1].x) / 2.0).abs() < 1e-9);
        assert_no_overlap(&h.layers, &extent, &p);
    }

    #[test]
    fn test_thick_layer_centres_nodes() {
        let h = Hierarchy::new(vec![0, 0], &[]);
        let extent = vec![Vec2::new(10.0, 40.0), Vec2::new(10.0, 10.0)];
        let mut p = vec![Point::origin(); 2];
        assign_layer_positions(&h.layers, &extent, &mut p, SPACING);
        assert_eq!(p[1].y, 15.0);
    }
}
