//! Parameter objects for every algorithm family
//!
//! Each algorithm has its own parameter struct defined next to it. The enums
//! here let the factory and the pipeline carry "parameters for some variant"
//! without knowing the concrete type.

use crate::circular::CircularParameters;
use crate::compound::{CompoundFdpParameters, GroupingParameters};
use crate::force::{FrParameters, IsomParameters, KkParameters, LinLogParameters};
use crate::layered::{EfficientSugiyamaParameters, SugiyamaParameters};
use crate::overlap::{FsaParameters, OneWayFsaParameters};
use crate::random::RandomParameters;
use crate::routing::{BundlingParameters, PathFinderParameters, SimpleRoutingParameters};
use crate::tree::{BalloonTreeParameters, SimpleTreeParameters};
use crate::LayoutError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Common behaviour of all parameter objects
#[enum_dispatch]
pub trait AlgorithmParameters {
    /// Check the values before an algorithm is built from them
    fn validate(&self) -> Result<(), LayoutError>;
}

#[enum_dispatch(AlgorithmParameters)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutParameters {
    Random(RandomParameters),
    Circular(CircularParameters),
    SimpleTree(SimpleTreeParameters),
    BalloonTree(BalloonTreeParameters),
    FruchtermanReingold(FrParameters),
    KamadaKawai(KkParameters),
    Isom(IsomParameters),
    LinLog(LinLogParameters),
    Sugiyama(SugiyamaParameters),
    EfficientSugiyama(EfficientSugiyamaParameters),
    CompoundFdp(CompoundFdpParameters),
    Grouping(GroupingParameters),
}

#[enum_dispatch(AlgorithmParameters)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlapRemovalParameters {
    Fsa(FsaParameters),
    OneWayFsa(OneWayFsaParameters),
}

#[enum_dispatch(AlgorithmParameters)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeRoutingParameters {
    Simple(SimpleRoutingParameters),
    Bundling(BundlingParameters),
    PathFinder(PathFinderParameters),
}

impl LayoutParameters {
    /// Name of the algorithm family these parameters belong to
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random(_) => "Random",
            Self::Circular(_) => "Circular",
            Self::SimpleTree(_) => "SimpleTree",
            Self::BalloonTree(_) => "BalloonTree",
            Self::FruchtermanReingold(_) => "FruchtermanReingold",
            Self::KamadaKawai(_) => "KamadaKawai",
            Self::Isom(_) => "Isom",
            Self::LinLog(_) => "LinLog",
            Self::Sugiyama(_) => "Sugiyama",
            Self::EfficientSugiyama(_) => "EfficientSugiyama",
            Self::CompoundFdp(_) => "CompoundFdp",
            Self::Grouping(_) => "Grouping",
        }
    }
}

impl OverlapRemovalParameters {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fsa(_) => "Fsa",
            Self::OneWayFsa(_) => "OneWayFsa",
        }
    }
}

impl EdgeRoutingParameters {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple(_) => "Simple",
            Self::Bundling(_) => "Bundling",
            Self::PathFinder(_) => "PathFinder",
        }
    }
}

/// Parameter value that publishes every accepted change to its subscribers
///
/// Algorithms take a copy of the value when they are built, so updates
/// never reach a computation that is already running.
#[derive(Debug)]
pub struct ObservableParameters<P> {
    value: P,
    subscribers: Vec<Sender<P>>,
}

impl<P> ObservableParameters<P>
where
    P: AlgorithmParameters + Clone,
{
    pub fn new(value: P) -> Result<Self, LayoutError> {
        value.validate()?;
        Ok(Self {
            value,
            subscribers: Vec::new(),
        })
    }

    pub fn get(&self) -> &P {
        &self.value
    }

    /// Receive a copy of the value after every successful [`Self::update`]
    pub fn subscribe(&mut self) -> Receiver<P> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Apply `change` to a copy, validate it, then commit and notify
    ///
    /// # Errors
    /// The stored value is left untouched if validation fails.
    pub fn update(&mut self, change: impl FnOnce(&mut P)) -> Result<(), LayoutError> {
        let mut next = self.value.clone();
        change(&mut next);
        next.validate()?;
        self.value = next;
        let value = &self.value;
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_update_notifies_subscribers() {
        let mut params = ObservableParameters::new(FsaParameters::default()).unwrap();
        let rx = params.subscribe();

        params.update(|p| p.horizontal_gap = 42.0).unwrap();
        assert_eq!(rx.try_recv().unwrap().horizontal_gap, 42.0);
        assert_eq!(params.get().horizontal_gap, 42.0);
    }

    #[test]
    fn test_rejected_update_keeps_value() {
        let mut params = ObservableParameters::new(FsaParameters::default()).unwrap();
        let rx = params.subscribe();
        let before = params.get().clone();

        assert!(params.update(|p| p.vertical_gap = -1.0).is_err());
        assert_eq!(params.get(), &before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut params = ObservableParameters::new(FsaParameters::default()).unwrap();
        drop(params.subscribe());
        params.update(|p| p.horizontal_gap = 1.0).unwrap();
        assert!(params.subscribers.is_empty());
    }

    #[test]
    fn test_enum_dispatch_validation() {
        let params: LayoutParameters = RandomParameters::default().into();
        assert!(params.validate().is_ok());
    }
}
