//! Overlap removal on vertex rectangles
//!
//! Algorithms only ever translate rectangles; sizes are left untouched.

mod fsa;

pub use fsa::{FsaAlgorithm, FsaParameters, OneWayFsaAlgorithm, OneWayFsaParameters, SweepAxis};

pub(crate) use fsa::{remove_overlaps, FsaMode};

use crate::{CancellationToken, ComputeOutcome, LayoutError, Rectangles};

/// A post-processing stage that separates overlapping rectangles
pub trait OverlapRemovalAlgorithm: Send {
    /// Translate the rectangles until none overlap or the iteration limit
    /// is used up
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError>;

    fn rectangles(&self) -> &Rectangles;

    fn into_rectangles(self: Box<Self>) -> Rectangles;
}

/// Whether any two rectangles overlap
pub fn has_overlaps(rectangles: &Rectangles) -> bool {
    let rects: Vec<_> = rectangles.values().collect();
    rects
        .iter()
        .enumerate()
        .any(|(i, a)| rects[i + 1..].iter().any(|b| a.intersects(b)))
}
