//! Force-directed layouts
//!
//! All algorithms here share the same preparation: existing positions are
//! kept, missing ones are drawn from the parameter seed, and the working set
//! is copied into dense vectors before the first cancellation check. Frozen
//! vertices stay in the working set so that they still exert forces, but are
//! never written back.

mod fr;
mod isom;
mod kk;
mod linlog;

pub use fr::{CoolingFunction, FrParameters, FruchtermanReingoldLayout};
pub use isom::{IsomLayout, IsomParameters};
pub use kk::{KamadaKawaiLayout, KkParameters};
pub use linlog::{LinLogLayout, LinLogParameters};

use crate::random::random_corner;
use crate::{LayoutState, Point, Positions, Rect, Vec2, VertexIndex};
use rand::rngs::StdRng;
use rand::Rng;

/// Distances are clamped to this before dividing by them
pub(crate) const MIN_DISTANCE: f64 = 1e-4;

/// Dense working copy of the admitted vertices
#[derive(Debug, Clone)]
pub(crate) struct ForceFrame {
    pub index: VertexIndex,
    pub positions: Vec<Point>,
    pub sizes: Vec<Vec2>,
    pub movable: Vec<bool>,
}

impl ForceFrame {
    /// Fill in missing positions inside `area` and capture the working set
    pub fn prepare(state: &mut LayoutState, rng: &mut StdRng, area: Rect) -> Self {
        let admitted: Vec<(crate::VertexId, bool)> =
            state.admitted().map(|v| (v.id, v.is_frozen())).collect();
        let mut positions = Vec::with_capacity(admitted.len());
        let mut sizes = Vec::with_capacity(admitted.len());
        let mut movable = Vec::with_capacity(admitted.len());
        for &(id, frozen) in &admitted {
            let size = state.size_of(id);
            let p = match state.positions.get(&id) {
                Some(p) => *p,
                None => {
                    let p = random_corner(rng, area, size);
                    state.positions.insert(id, p);
                    p
                }
            };
            positions.push(p);
            sizes.push(size);
            movable.push(!frozen);
        }
        Self {
            index: VertexIndex::new(admitted.iter().map(|&(id, _)| id)),
            positions,
            sizes,
            movable,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn any_frozen(&self) -> bool {
        self.movable.iter().any(|m| !m)
    }

    /// Copy the movable positions back into `positions`
    pub fn write_back(&self, positions: &mut Positions) {
        for (i, p) in self.positions.iter().enumerate() {
            if self.movable[i] {
                positions.insert(self.index.id(i), *p);
            }
        }
    }

    /// Position map built from the working set, for progress snapshots
    pub fn snapshot(&self, base: &Positions) -> Positions {
        let mut positions = base.clone();
        self.write_back(&mut positions);
        positions
    }
}

/// Separation vector from `b` to `a` and its clamped length
///
/// Coincident points get a small random separation so that they can push
/// each other apart.
pub(crate) fn separation(a: Point, b: Point, rng: &mut StdRng) -> (Vec2, f64) {
    let mut delta = a - b;
    if delta.length_squared() < MIN_DISTANCE * MIN_DISTANCE {
        delta = Vec2::new(
            rng.random_range(-1.0..1.0) * MIN_DISTANCE,
            rng.random_range(-1.0..1.0) * MIN_DISTANCE,
        );
    }
    let distance = delta.length().max(MIN_DISTANCE);
    (delta, distance)
}

/// Hop distances between all pairs, `None` when unreachable
pub(crate) fn all_pairs_hops(adjacency: &[Vec<usize>]) -> Vec<Vec<Option<usize>>> {
    let n = adjacency.len();
    (0..n)
        .map(|source| {
            let mut hops = vec![None; n];
            hops[source] = Some(0);
            let mut queue = std::collections::VecDeque::from([source]);
            while let Some(v) = queue.pop_front() {
                let next = hops[v].map_or(0, |h| h + 1);
                for &w in &adjacency[v] {
                    if hops[w].is_none() {
                        hops[w] = Some(next);
                        queue.push_back(w);
                    }
                }
            }
            hops
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{path_graph, vid};
    use crate::ProcessingOption;
    use rand::SeedableRng;
    use test_log::test;

    #[test]
    fn test_prepare_keeps_existing_positions() {
        let mut graph = path_graph(3);
        graph.vertex_mut(vid(1)).unwrap().skip_processing = ProcessingOption::Freeze;
        let mut state = LayoutState::new(
            graph,
            Some(Positions::from([(vid(1), Point::new(7.0, 7.0))])),
            None,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let frame = ForceFrame::prepare(&mut state, &mut rng, Rect::new(0.0, 0.0, 10.0, 10.0));

        assert_eq!(state.positions.len(), 3);
        assert_eq!(frame.positions[1], Point::new(7.0, 7.0));
        assert_eq!(frame.movable, vec![true, false, true]);
        assert!(frame.any_frozen());
    }

    #[test]
    fn test_separation_of_coincident_points() {
        let mut rng = StdRng::seed_from_u64(3);
        let (delta, d) = separation(Point::origin(), Point::origin(), &mut rng);
        assert!(d >= MIN_DISTANCE);
        assert!(delta.is_finite());
    }

    #[test]
    fn test_all_pairs_hops() {
        let adjacency = vec![vec![1], vec![0, 2], vec![1], vec![]];
        let hops = all_pairs_hops(&adjacency);
        assert_eq!(hops[0][2], Some(2));
        assert_eq!(hops[0][3], None);
    }
}
