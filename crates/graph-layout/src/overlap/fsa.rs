use super::OverlapRemovalAlgorithm;
use crate::error::ensure_non_negative;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, LayoutError, Rect, Rectangles, Vec2,
    VertexId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsaParameters {
    /// Minimum horizontal distance between rectangles
    pub horizontal_gap: f64,
    /// Minimum vertical distance between rectangles
    pub vertical_gap: f64,
    /// Upper bound on horizontal + vertical scan rounds
    pub max_iterations: usize,
}

impl Default for FsaParameters {
    fn default() -> Self {
        Self {
            horizontal_gap: 10.0,
            vertical_gap: 10.0,
            max_iterations: 50,
        }
    }
}

impl AlgorithmParameters for FsaParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("horizontal_gap", self.horizontal_gap)?;
        ensure_non_negative("vertical_gap", self.vertical_gap)?;
        if self.max_iterations == 0 {
            return Err(LayoutError::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SweepAxis {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneWayFsaParameters {
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
    pub max_iterations: usize,
    /// The only axis rectangles are moved along, always towards positive
    /// coordinates
    pub axis: SweepAxis,
}

impl Default for OneWayFsaParameters {
    fn default() -> Self {
        Self {
            horizontal_gap: 10.0,
            vertical_gap: 10.0,
            max_iterations: 50,
            axis: SweepAxis::Horizontal,
        }
    }
}

impl AlgorithmParameters for OneWayFsaParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        FsaParameters {
            horizontal_gap: self.horizontal_gap,
            vertical_gap: self.vertical_gap,
            max_iterations: self.max_iterations,
        }
        .validate()
    }
}

/// How the scans move rectangles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FsaMode {
    /// Horizontal then vertical scans, each pass re-centred so that the mean
    /// displacement is zero
    Balanced,
    /// Single axis, positive displacements only
    OneWay(SweepAxis),
}

/// Minimum translation of `b` away from `a` along the line of their centres
///
/// Positive components mean the rectangles overlap in that direction.
fn force(a: &Rect, b: &Rect) -> Vec2 {
    let d = b.center() - a.center();
    let (adx, ady) = (d.x.abs(), d.y.abs());
    let wsum = a.width + b.width;
    let hsum = a.height + b.height;
    if adx == 0.0 && ady == 0.0 {
        return Vec2::new(wsum / 2.0, hsum / 2.0);
    }
    if ady * wsum <= adx * hsum {
        // Touching with the vertical sides
        let fx = d.x.signum() * (wsum / 2.0 - adx);
        Vec2::new(fx, fx * d.y / d.x)
    } else {
        // Touching with the horizontal sides
        let fy = d.y.signum() * (hsum / 2.0 - ady);
        Vec2::new(fy * d.x / d.y, fy)
    }
}

/// Translation along one axis only, for pairs overlapping on the other one
fn axis_force(a: &Rect, b: &Rect, axis: SweepAxis) -> Vec2 {
    match axis {
        SweepAxis::Horizontal => {
            if a.y < b.bottom() && b.y < a.bottom() {
                let d = b.center().x - a.center().x;
                Vec2::new((a.width + b.width) / 2.0 - d, 0.0)
            } else {
                Vec2::new(f64::NEG_INFINITY, 0.0)
            }
        }
        SweepAxis::Vertical => {
            if a.x < b.right() && b.x < a.right() {
                let d = b.center().y - a.center().y;
                Vec2::new(0.0, (a.height + b.height) / 2.0 - d)
            } else {
                Vec2::new(0.0, f64::NEG_INFINITY)
            }
        }
    }
}

fn coordinate(r: &Rect, axis: SweepAxis) -> (f64, f64) {
    match axis {
        SweepAxis::Horizontal => (r.center().x, r.x),
        SweepAxis::Vertical => (r.center().y, r.y),
    }
}

fn component(v: Vec2, axis: SweepAxis) -> f64 {
    match axis {
        SweepAxis::Horizontal => v.x,
        SweepAxis::Vertical => v.y,
    }
}

/// One force-scan pass along `axis`, returning the displacement of every
/// rectangle
fn scan(rects: &[Rect], axis: SweepAxis, force: impl Fn(&Rect, &Rect) -> Vec2) -> Vec<f64> {
    let n = rects.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        coordinate(&rects[a], axis)
            .0
            .partial_cmp(&coordinate(&rects[b], axis).0)
            .unwrap_or(Ordering::Equal)
    });

    let mut displacement = vec![0.0; n];
    let Some(&first) = order.first() else {
        return displacement;
    };
    let mut gamma = vec![0.0; n];
    let mut lmin = first;
    let mut sigma = 0.0;
    for (pos, &i) in order.iter().enumerate() {
        let mut g = 0.0;
        if pos > 0 {
            let pushed = order[..pos]
                .iter()
                .map(|&j| component(force(&rects[j], &rects[i]), axis) + gamma[j])
                .fold(0.0, f64::max);
            let start = coordinate(&rects[i], axis).1;
            g = if start + pushed < coordinate(&rects[lmin], axis).1 {
                sigma
            } else {
                pushed
            };
        }
        gamma[i] = g;
        displacement[i] = g;
        if coordinate(&rects[i], axis).1 < coordinate(&rects[lmin], axis).1 {
            lmin = i;
        }

        let delta = order[pos + 1..]
            .iter()
            .map(|&j| component(force(&rects[i], &rects[j]), axis))
            .fold(0.0, f64::max);
        sigma += delta;
    }
    displacement
}

fn translate(rects: &mut [Rect], displacement: &[f64], axis: SweepAxis) {
    for (r, &d) in rects.iter_mut().zip(displacement) {
        match axis {
            SweepAxis::Horizontal => r.x += d,
            SweepAxis::Vertical => r.y += d,
        }
    }
}

fn any_overlap(rects: &[Rect]) -> bool {
    rects
        .iter()
        .enumerate()
        .any(|(i, a)| rects[i + 1..].iter().any(|b| a.intersects(b)))
}

/// Separate `rects` in place, keeping at least `gap` between them
pub(crate) fn remove_overlaps(
    rects: &mut [Rect],
    gap: Vec2,
    max_iterations: usize,
    mode: FsaMode,
    cancel: &CancellationToken,
) -> ComputeOutcome {
    let start: Vec<Rect> = rects
        .iter()
        .map(|r| r.inflate(gap.x / 2.0, gap.y / 2.0))
        .collect();
    let mut inflated = start.clone();

    let mut iteration = 0;
    while iteration < max_iterations && any_overlap(&inflated) {
        if cancel.is_cancelled() {
            break;
        }
        match mode {
            FsaMode::Balanced => {
                for axis in [SweepAxis::Horizontal, SweepAxis::Vertical] {
                    let mut displacement = scan(&inflated, axis, force);
                    let mean = displacement.iter().sum::<f64>() / displacement.len() as f64;
                    displacement.iter_mut().for_each(|d| *d -= mean);
                    translate(&mut inflated, &displacement, axis);
                }
            }
            FsaMode::OneWay(axis) => {
                let displacement = scan(&inflated, axis, |a, b| axis_force(a, b, axis));
                translate(&mut inflated, &displacement, axis);
            }
        }
        iteration += 1;
        trace!("Force scan round {iteration} done");
    }
    debug!("Overlap removal finished after {iteration} rounds");

    // Apply the net displacement to the original rectangles
    for ((r, i), s) in rects.iter_mut().zip(&inflated).zip(&start) {
        r.x += i.x - s.x;
        r.y += i.y - s.y;
    }
    if cancel.is_cancelled() {
        ComputeOutcome::Cancelled
    } else {
        ComputeOutcome::Completed
    }
}

/// Run [`remove_overlaps`] over a rectangle map in id order
fn remove_overlaps_in_map(
    rectangles: &mut Rectangles,
    gap: Vec2,
    max_iterations: usize,
    mode: FsaMode,
    cancel: &CancellationToken,
) -> ComputeOutcome {
    let mut ids: Vec<VertexId> = rectangles.keys().copied().collect();
    ids.sort();
    let mut rects: Vec<Rect> = ids.iter().map(|id| rectangles[id]).collect();
    let outcome = remove_overlaps(&mut rects, gap, max_iterations, mode, cancel);
    for (id, r) in ids.into_iter().zip(rects) {
        rectangles.insert(id, r);
    }
    outcome
}

/// Force-scan overlap removal moving rectangles in both directions
#[derive(Debug, Clone)]
pub struct FsaAlgorithm {
    rectangles: Rectangles,
    params: FsaParameters,
}

impl FsaAlgorithm {
    pub fn new(rectangles: Rectangles, params: FsaParameters) -> Self {
        Self { rectangles, params }
    }
}

impl OverlapRemovalAlgorithm for FsaAlgorithm {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        Ok(remove_overlaps_in_map(
            &mut self.rectangles,
            Vec2::new(self.params.horizontal_gap, self.params.vertical_gap),
            self.params.max_iterations,
            FsaMode::Balanced,
            cancel,
        ))
    }

    fn rectangles(&self) -> &Rectangles {
        &self.rectangles
    }

    fn into_rectangles(self: Box<Self>) -> Rectangles {
        self.rectangles
    }
}

/// Force-scan overlap removal along a single axis, in the positive direction
#[derive(Debug, Clone)]
pub struct OneWayFsaAlgorithm {
    rectangles: Rectangles,
    params: OneWayFsaParameters,
}

impl OneWayFsaAlgorithm {
    pub fn new(rectangles: Rectangles, params: OneWayFsaParameters) -> Self {
        Self { rectangles, params }
    }
}

impl OverlapRemovalAlgorithm for OneWayFsaAlgorithm {
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        Ok(remove_overlaps_in_map(
            &mut self.rectangles,
            Vec2::new(self.params.horizontal_gap, self.params.vertical_gap),
            self.params.max_iterations,
            FsaMode::OneWay(self.params.axis),
            cancel,
        ))
    }

    fn rectangles(&self) -> &Rectangles {
        &self.rectangles
    }

    fn into_rectangles(self: Box<Self>) -> Rectangles {
        self.rectangles
    }
}
