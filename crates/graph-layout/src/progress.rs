use crate::Positions;
use crossbeam::channel::Sender;
use tracing::trace;

/// Progress record emitted by iterative algorithms
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSnapshot {
    pub iteration: usize,
    /// Completion in `[0, 100]`
    pub percent: f64,
    pub message: String,
    pub positions: Positions,
    /// Set on the last snapshot of a cancelled run
    pub aborted: bool,
}

/// Optional channel on which an algorithm publishes [`IterationSnapshot`]s
///
/// Snapshots are sent synchronously from within `compute`. Building a
/// snapshot clones the position map, so it is skipped entirely when nobody
/// listens.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<Sender<IterationSnapshot>>,
}

impl ProgressReporter {
    pub fn new(sender: Sender<IterationSnapshot>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn set_sender(&mut self, sender: Sender<IterationSnapshot>) {
        self.sender = Some(sender);
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Publish a snapshot, building the position map only when someone listens
    pub fn report(
        &self,
        iteration: usize,
        total: usize,
        message: &str,
        aborted: bool,
        positions: impl FnOnce() -> Positions,
    ) {
        let Some(sender) = &self.sender else {
            return;
        };
        let percent = if total == 0 {
            100.0
        } else {
            (iteration as f64 / total as f64 * 100.0).min(100.0)
        };
        let snapshot = IterationSnapshot {
            iteration,
            percent,
            message: message.to_string(),
            positions: positions(),
            aborted,
        };
        if sender.send(snapshot).is_err() {
            trace!("Progress receiver dropped, snapshot {iteration} discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, VertexId};
    use crossbeam::channel::unbounded;
    use test_log::test;

    #[test]
    fn test_report_computes_percent() {
        let (tx, rx) = unbounded();
        let reporter = ProgressReporter::new(tx);
        reporter.report(5, 20, "step", false, || {
            Positions::from([(VertexId(1), Point::new(1.0, 2.0))])
        });
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.iteration, 5);
        assert!((snapshot.percent - 25.0).abs() < 1e-12);
        assert_eq!(snapshot.positions.len(), 1);
        assert!(!snapshot.aborted);
    }

    #[test]
    fn test_disabled_reporter_skips_work() {
        let reporter = ProgressReporter::default();
        reporter.report(1, 1, "unused", false, || {
            panic!("positions must not be built without a receiver")
        });
    }
}
