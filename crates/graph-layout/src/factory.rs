//! Mapping from algorithm kinds to concrete algorithms
//!
//! Every `create_*` function validates the parameters before building
//! anything and rejects parameters that belong to another algorithm.

use crate::circular::{CircularLayout, CircularParameters};
use crate::compound::{
    CompoundFdpLayout, CompoundFdpParameters, GroupingLayout, GroupingParameters,
};
use crate::force::{
    FrParameters, FruchtermanReingoldLayout, IsomLayout, IsomParameters, KamadaKawaiLayout,
    KkParameters, LinLogLayout, LinLogParameters,
};
use crate::layered::{
    EfficientSugiyamaLayout, EfficientSugiyamaParameters, SugiyamaLayout, SugiyamaParameters,
};
use crate::overlap::{
    FsaAlgorithm, FsaParameters, OneWayFsaAlgorithm, OneWayFsaParameters, OverlapRemovalAlgorithm,
};
use crate::random::{RandomLayout, RandomParameters};
use crate::routing::{
    BundlingEdgeRouting, BundlingParameters, EdgeRoutingAlgorithm, PathFinderEdgeRouting,
    PathFinderParameters, SimpleEdgeRouting, SimpleRoutingParameters,
};
use crate::tree::{BalloonTreeLayout, BalloonTreeParameters, SimpleTreeLayout, SimpleTreeParameters};
use crate::{
    AlgorithmParameters, CompoundGraph, EdgeRoutingParameters, Graph, LayoutAlgorithm,
    LayoutError, LayoutParameters, OverlapRemovalParameters, Positions, Rect, Rectangles, Sizes,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutAlgorithmKind {
    Random,
    Circular,
    SimpleTree,
    BalloonTree,
    #[default]
    FruchtermanReingold,
    BoundedFruchtermanReingold,
    KamadaKawai,
    Isom,
    LinLog,
    Sugiyama,
    EfficientSugiyama,
    CompoundFdp,
    Grouping,
}

impl LayoutAlgorithmKind {
    pub const ALL: [LayoutAlgorithmKind; 13] = [
        Self::Random,
        Self::Circular,
        Self::SimpleTree,
        Self::BalloonTree,
        Self::FruchtermanReingold,
        Self::BoundedFruchtermanReingold,
        Self::KamadaKawai,
        Self::Isom,
        Self::LinLog,
        Self::Sugiyama,
        Self::EfficientSugiyama,
        Self::CompoundFdp,
        Self::Grouping,
    ];

    /// Whether the algorithm reads vertex sizes
    ///
    /// For `Grouping` this depends on its groups, see
    /// [`GroupingParameters::needs_sizes`].
    pub fn needs_sizes(self) -> bool {
        matches!(
            self,
            Self::Circular
                | Self::SimpleTree
                | Self::Sugiyama
                | Self::EfficientSugiyama
                | Self::CompoundFdp
        )
    }

    /// Whether a separate routing stage should follow; layered layouts route
    /// their own edges
    pub fn needs_edge_routing(self) -> bool {
        !matches!(self, Self::Sugiyama | Self::EfficientSugiyama)
    }

    /// Whether the algorithm ignores sizes and may therefore leave
    /// overlapping rectangles
    pub fn needs_overlap_removal(self) -> bool {
        matches!(
            self,
            Self::Random
                | Self::FruchtermanReingold
                | Self::BoundedFruchtermanReingold
                | Self::KamadaKawai
                | Self::Isom
                | Self::LinLog
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverlapRemovalKind {
    #[default]
    Fsa,
    OneWayFsa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeRoutingKind {
    #[default]
    Simple,
    Bundling,
    PathFinder,
}

/// Default parameters of a layout kind
pub fn create_layout_parameters(kind: LayoutAlgorithmKind) -> LayoutParameters {
    use LayoutAlgorithmKind as K;
    match kind {
        K::Random => RandomParameters::default().into(),
        K::Circular => CircularParameters::default().into(),
        K::SimpleTree => SimpleTreeParameters::default().into(),
        K::BalloonTree => BalloonTreeParameters::default().into(),
        K::FruchtermanReingold => FrParameters::default().into(),
        K::BoundedFruchtermanReingold => FrParameters::bounded().into(),
        K::KamadaKawai => KkParameters::default().into(),
        K::Isom => IsomParameters::default().into(),
        K::LinLog => LinLogParameters::default().into(),
        K::Sugiyama => SugiyamaParameters::default().into(),
        K::EfficientSugiyama => EfficientSugiyamaParameters::default().into(),
        K::CompoundFdp => CompoundFdpParameters::default().into(),
        K::Grouping => GroupingParameters::default().into(),
    }
}

fn mismatch(kind: impl std::fmt::Debug, given: &str) -> LayoutError {
    LayoutError::invalid_parameter(
        "parameters",
        format!("{given} parameters do not belong to {kind:?}"),
    )
}

/// Build the layout algorithm of `kind` over `graph`
///
/// `positions` and `sizes` seed the algorithm's maps; missing parameters
/// are replaced by the defaults of `kind`.
///
/// # Errors
/// [`LayoutError::InvalidParameter`] when the parameters fail validation or
/// belong to another kind.
pub fn create_layout_algorithm(
    kind: LayoutAlgorithmKind,
    graph: Graph,
    positions: Option<Positions>,
    sizes: Option<Sizes>,
    parameters: Option<LayoutParameters>,
) -> Result<Box<dyn LayoutAlgorithm>, LayoutError> {
    use LayoutAlgorithmKind as K;
    use LayoutParameters as P;

    let parameters = parameters.unwrap_or_else(|| create_layout_parameters(kind));
    parameters.validate()?;
    debug!("Creating {kind:?} layout for {} vertices", graph.vertex_count());

    let algorithm: Box<dyn LayoutAlgorithm> = match (kind, parameters) {
        (K::Random, P::Random(p)) => Box::new(RandomLayout::new(graph, positions, sizes, p)),
        (K::Circular, P::Circular(p)) => Box::new(CircularLayout::new(graph, positions, sizes, p)),
        (K::SimpleTree, P::SimpleTree(p)) => {
            Box::new(SimpleTreeLayout::new(graph, positions, sizes, p))
        }
        (K::BalloonTree, P::BalloonTree(p)) => {
            Box::new(BalloonTreeLayout::new(graph, positions, sizes, p))
        }
        (K::FruchtermanReingold, P::FruchtermanReingold(p)) => {
            Box::new(FruchtermanReingoldLayout::new(graph, positions, sizes, p))
        }
        (K::BoundedFruchtermanReingold, P::FruchtermanReingold(p)) => {
            if p.bounds.is_none() {
                return Err(LayoutError::invalid_parameter(
                    "bounds",
                    "required by the bounded variant",
                ));
            }
            Box::new(FruchtermanReingoldLayout::new(graph, positions, sizes, p))
        }
        (K::KamadaKawai, P::KamadaKawai(p)) => {
            Box::new(KamadaKawaiLayout::new(graph, positions, sizes, p))
        }
        (K::Isom, P::Isom(p)) => Box::new(IsomLayout::new(graph, positions, sizes, p)),
        (K::LinLog, P::LinLog(p)) => Box::new(LinLogLayout::new(graph, positions, sizes, p)),
        (K::Sugiyama, P::Sugiyama(p)) => Box::new(SugiyamaLayout::new(graph, positions, sizes, p)),
        (K::EfficientSugiyama, P::EfficientSugiyama(p)) => {
            Box::new(EfficientSugiyamaLayout::new(graph, positions, sizes, p))
        }
        (K::CompoundFdp, P::CompoundFdp(p)) => Box::new(CompoundFdpLayout::new(
            CompoundGraph::from_graph(graph),
            positions,
            sizes,
            p,
        )),
        (K::Grouping, P::Grouping(p)) => Box::new(GroupingLayout::new(graph, positions, sizes, p)),
        (kind, other) => return Err(mismatch(kind, other.name())),
    };
    Ok(algorithm)
}

/// Build the compound force-directed layout over a graph with containment
pub fn create_compound_layout_algorithm(
    graph: CompoundGraph,
    positions: Option<Positions>,
    sizes: Option<Sizes>,
    parameters: Option<LayoutParameters>,
) -> Result<CompoundFdpLayout, LayoutError> {
    let params = match parameters {
        None => Default::default(),
        Some(LayoutParameters::CompoundFdp(p)) => p,
        Some(other) => return Err(mismatch(LayoutAlgorithmKind::CompoundFdp, other.name())),
    };
    params.validate()?;
    Ok(CompoundFdpLayout::new(graph, positions, sizes, params))
}

pub fn create_overlap_removal_parameters(kind: OverlapRemovalKind) -> OverlapRemovalParameters {
    match kind {
        OverlapRemovalKind::Fsa => FsaParameters::default().into(),
        OverlapRemovalKind::OneWayFsa => OneWayFsaParameters::default().into(),
    }
}

pub fn create_overlap_removal_algorithm(
    kind: OverlapRemovalKind,
    rectangles: Rectangles,
    parameters: Option<OverlapRemovalParameters>,
) -> Result<Box<dyn OverlapRemovalAlgorithm>, LayoutError> {
    let parameters = parameters.unwrap_or_else(|| create_overlap_removal_parameters(kind));
    parameters.validate()?;
    Ok(match (kind, parameters) {
        (OverlapRemovalKind::Fsa, OverlapRemovalParameters::Fsa(p)) => {
            Box::new(FsaAlgorithm::new(rectangles, p))
        }
        (OverlapRemovalKind::OneWayFsa, OverlapRemovalParameters::OneWayFsa(p)) => {
            Box::new(OneWayFsaAlgorithm::new(rectangles, p))
        }
        (kind, other) => return Err(mismatch(kind, other.name())),
    })
}

pub fn create_edge_routing_parameters(kind: EdgeRoutingKind) -> EdgeRoutingParameters {
    match kind {
        EdgeRoutingKind::Simple => SimpleRoutingParameters::default().into(),
        EdgeRoutingKind::Bundling => BundlingParameters::default().into(),
        EdgeRoutingKind::PathFinder => PathFinderParameters::default().into(),
    }
}

/// Build an edge router over laid-out geometry
///
/// `area` is the region routes may use; `rectangles` take precedence over
/// `positions` for vertices present in both.
pub fn create_edge_routing_algorithm(
    kind: EdgeRoutingKind,
    area: Rect,
    graph: Graph,
    positions: &Positions,
    rectangles: Rectangles,
    parameters: Option<EdgeRoutingParameters>,
) -> Result<Box<dyn EdgeRoutingAlgorithm>, LayoutError> {
    use EdgeRoutingParameters as P;

    let parameters = parameters.unwrap_or_else(|| create_edge_routing_parameters(kind));
    parameters.validate()?;
    Ok(match (kind, parameters) {
        (EdgeRoutingKind::Simple, P::Simple(p)) => {
            Box::new(SimpleEdgeRouting::new(area, graph, positions, rectangles, p))
        }
        (EdgeRoutingKind::Bundling, P::Bundling(p)) => {
            Box::new(BundlingEdgeRouting::new(area, graph, positions, rectangles, p))
        }
        (EdgeRoutingKind::PathFinder, P::PathFinder(p)) => {
            Box::new(PathFinderEdgeRouting::new(area, graph, positions, rectangles, p))
        }
        (kind, other) => return Err(mismatch(kind, other.name())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mixed_graph, uniform_sizes};
    use crate::{CancellationToken, ComputeOutcome, ErrorKind};
    use test_log::test;

    #[test]
    fn test_every_kind_builds_and_computes() {
        for kind in LayoutAlgorithmKind::ALL {
            let graph = mixed_graph();
            let sizes = uniform_sizes(&graph, 20.0, 10.0);
            let mut layout = create_layout_algorithm(kind, graph, None, Some(sizes), None)
                .unwrap_or_else(|e| panic!("{kind:?}: {e}"));
            assert_eq!(layout.needs_vertex_sizes(), kind.needs_sizes(), "{kind:?}");
            let outcome = layout.compute(&CancellationToken::new()).unwrap();
            assert_eq!(outcome, ComputeOutcome::Completed, "{kind:?}");
            assert_eq!(layout.vertex_positions().len(), 9, "{kind:?}");
            assert_eq!(
                layout.edge_routes().is_some(),
                !kind.needs_edge_routing(),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_wrong_family_rejected() {
        let err = create_layout_algorithm(
            LayoutAlgorithmKind::Circular,
            mixed_graph(),
            None,
            None,
            Some(KkParameters::default().into()),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let err = create_overlap_removal_algorithm(
            OverlapRemovalKind::Fsa,
            Rectangles::new(),
            Some(OneWayFsaParameters::default().into()),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_bounded_fr_requires_bounds() {
        let result = create_layout_algorithm(
            LayoutAlgorithmKind::BoundedFruchtermanReingold,
            mixed_graph(),
            None,
            None,
            Some(FrParameters::default().into()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parameters_validated_first() {
        let params = FsaParameters {
            horizontal_gap: -1.0,
            ..Default::default()
        };
        let result = create_overlap_removal_algorithm(
            OverlapRemovalKind::Fsa,
            Rectangles::new(),
            Some(params.into()),
        );
        assert!(matches!(result, Err(LayoutError::InvalidParameter { .. })));
    }

    #[test]
    fn test_predicates() {
        use LayoutAlgorithmKind as K;
        assert!(K::Circular.needs_sizes());
        assert!(!K::Random.needs_sizes());
        assert!(!K::Sugiyama.needs_edge_routing());
        assert!(K::Isom.needs_overlap_removal());
        assert!(!K::SimpleTree.needs_overlap_removal());
    }

    #[test]
    fn test_edge_routing_from_factory() {
        let graph = mixed_graph();
        let sizes = uniform_sizes(&graph, 20.0, 10.0);
        let mut layout =
            create_layout_algorithm(LayoutAlgorithmKind::Circular, graph, None, Some(sizes), None)
                .unwrap();
        layout.compute(&CancellationToken::new()).unwrap();
        let rects = layout.state().rectangles();
        for kind in [
            EdgeRoutingKind::Simple,
            EdgeRoutingKind::Bundling,
            EdgeRoutingKind::PathFinder,
        ] {
            let mut router = create_edge_routing_algorithm(
                kind,
                Rect::new(0.0, 0.0, 400.0, 400.0),
                layout.graph().clone(),
                layout.vertex_positions(),
                rects.clone(),
                None,
            )
            .unwrap();
            router.compute(&CancellationToken::new()).unwrap();
            assert_eq!(router.routes().len(), 10, "{kind:?}");
        }
    }
}
