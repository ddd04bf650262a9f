use super::layers::Hierarchy;
use crate::CancellationToken;
use std::cmp::Ordering;

/// Minimize edge crossings by swapping adjacent nodes in layers
///
/// Uses a greedy local search approach with multiple iterations. Returns
/// `None` when cancelled.
pub(crate) fn minimize_crossings(
    h: &Hierarchy,
    mut layers: Vec<Vec<usize>>,
    max_iterations: usize,
    cancel: &CancellationToken,
) -> Option<(Vec<Vec<usize>>, usize)> {
    for _ in 0..max_iterations {
        if cancel.is_cancelled() {
            return None;
        }
        let mut improved = false;

        for layer_index in 0..layers.len() {
            let layer_len = layers[layer_index].len();
            for i in 0..layer_len.saturating_sub(1) {
                let crossings_before = crossings_around(h, &layers, layer_index);
                layers[layer_index].swap(i, i + 1);
                let crossings_after = crossings_around(h, &layers, layer_index);

                if crossings_after > crossings_before
                    || (crossings_after == crossings_before
                        && layers[layer_index][i] > layers[layer_index][i + 1])
                {
                    // Swap back if no improvement
                    layers[layer_index].swap(i, i + 1);
                } else if crossings_after < crossings_before {
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    let crossings = count_crossings(h, &layers);
    Some((layers, crossings))
}

/// Alternate downward and upward barycenter sweeps, keeping the ordering
/// with the fewest crossings. Returns `None` when cancelled.
pub(crate) fn barycenter_sweeps(
    h: &Hierarchy,
    mut layers: Vec<Vec<usize>>,
    iterations: usize,
    cancel: &CancellationToken,
) -> Option<(Vec<Vec<usize>>, usize)> {
    let mut best_crossings = count_crossings(h, &layers);
    let mut best = layers.clone();

    for _ in 0..iterations {
        if cancel.is_cancelled() {
            return None;
        }
        if best_crossings == 0 {
            break;
        }
        for l in 1..layers.len() {
            let (upper, rest) = layers.split_at_mut(l);
            sort_by_barycenter(&mut rest[0], &upper[l - 1], &h.pred);
        }
        for l in (0..layers.len().saturating_sub(1)).rev() {
            let (head, lower) = layers.split_at_mut(l + 1);
            sort_by_barycenter(&mut head[l], &lower[0], &h.succ);
        }

        let crossings = count_crossings(h, &layers);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        } else {
            break;
        }
    }

    Some((best, best_crossings))
}

/// Stable sort of `layer` by the mean position of its neighbours in `fixed`
///
/// Nodes without neighbours there keep their current position as key.
fn sort_by_barycenter(layer: &mut [usize], fixed: &[usize], neighbours: &[Vec<usize>]) {
    let mut rank = vec![None; neighbours.len()];
    for (i, &v) in fixed.iter().enumerate() {
        rank[v] = Some(i as f64);
    }
    let mut keyed: Vec<(f64, usize)> = layer
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let ranks: Vec<f64> = neighbours[v].iter().filter_map(|&w| rank[w]).collect();
            let key = if ranks.is_empty() {
                i as f64
            } else {
                ranks.iter().sum::<f64>() / ranks.len() as f64
            };
            (key, v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    for (slot, (_, v)) in layer.iter_mut().zip(keyed) {
        *slot = v;
    }
}

/// Count the number of edge crossings in the current ordering
pub(crate) fn count_crossings(h: &Hierarchy, layers: &[Vec<usize>]) -> usize {
    (0..layers.len().saturating_sub(1))
        .map(|i| count_between(h, &layers[i], &layers[i + 1]))
        .sum()
}

/// Crossings on both sides of one layer
fn crossings_around(h: &Hierarchy, layers: &[Vec<usize>], index: usize) -> usize {
    let above = if index > 0 {
        count_between(h, &layers[index - 1], &layers[index])
    } else {
        0
    };
    let below = if index + 1 < layers.len() {
        count_between(h, &layers[index], &layers[index + 1])
    } else {
        0
    };
    above + below
}

fn count_between(h: &Hierarchy, upper_layer: &[usize], lower_layer: &[usize]) -> usize {
    let mut position = vec![None; h.node_count()];
    for (i, &v) in lower_layer.iter().enumerate() {
        position[v] = Some(i);
    }
    let segments: Vec<(usize, usize)> = upper_layer
        .iter()
        .enumerate()
        .flat_map(|(idx, &node)| {
            h.succ[node]
                .iter()
                .filter_map(|&target| position[target])
                .map(move |pos| (idx, pos))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut crossings = 0;
    for (k, &(idx1, pos1)) in segments.iter().enumerate() {
        for &(idx2, pos2) in &segments[k + 1..] {
            if idx1 != idx2 && pos1 != pos2 && (idx1 < idx2) != (pos1 < pos2) {
                crossings += 1;
            }
        }
    }
    crossings
}
