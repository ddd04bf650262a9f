//! Graph layout algorithms
//!
//! This crate computes 2D positions for the vertices of a directed graph,
//! then optionally separates overlapping vertex rectangles and routes the
//! edges around them. Positions are the top-left corners of the vertex
//! rectangles.
//!
//! # Layout algorithms
//!
//! - [`random::RandomLayout`] and [`circular::CircularLayout`]
//! - [`tree::SimpleTreeLayout`] and [`tree::BalloonTreeLayout`]
//! - [`force::FruchtermanReingoldLayout`], [`force::KamadaKawaiLayout`],
//!   [`force::IsomLayout`] and [`force::LinLogLayout`]
//! - [`layered::SugiyamaLayout`] and [`layered::EfficientSugiyamaLayout`],
//!   which also route their own edges
//! - [`compound::CompoundFdpLayout`] for graphs with containment, and
//!   [`compound::GroupingLayout`] for vertices partitioned by group id
//!
//! [`overlap`] and [`routing`] hold the post-processing stages, [`factory`]
//! maps variant kinds to algorithms and [`pipeline::LayoutPipeline`] chains
//! all three stages. [`state::StateStorage`] keeps named pipeline results and
//! [`visibility::HidableGraph`] hides parts of a graph between runs.
//!
//! # Example
//!
//! ```
//! use graph_layout::factory::{create_layout_algorithm, LayoutAlgorithmKind};
//! use graph_layout::{CancellationToken, Edge, Graph, Vertex};
//!
//! let graph = Graph::from_parts(
//!     [Vertex::new(1), Vertex::new(2), Vertex::new(3)],
//!     [Edge::new(1, 1, 2), Edge::new(2, 2, 3)],
//! )
//! .unwrap();
//!
//! let mut layout =
//!     create_layout_algorithm(LayoutAlgorithmKind::FruchtermanReingold, graph, None, None, None)
//!         .unwrap();
//! layout.compute(&CancellationToken::new()).unwrap();
//! assert_eq!(layout.vertex_positions().len(), 3);
//! ```

mod cancel;
mod engine;
mod error;
mod geometry;
mod graph;
mod params;
mod progress;
mod sizes;

pub mod circular;
pub mod compound;
pub mod factory;
pub mod force;
pub mod layered;
pub mod overlap;
pub mod pipeline;
pub mod random;
pub mod routing;
pub mod state;
pub mod tree;
pub mod visibility;

#[cfg(test)]
mod testutils;

pub use cancel::{CancellationToken, ComputeOutcome};
pub use engine::{EdgeRoutes, LayoutAlgorithm, LayoutState, Positions, Rectangles, Sizes};
pub(crate) use engine::VertexIndex;
pub use error::{ErrorKind, LayoutError};
pub use geometry::{Point, Rect, Thickness, Vec2};
pub use graph::{
    CompoundGraph, Edge, EdgeId, EdgeType, Graph, ProcessingOption, Vertex, VertexId,
};
pub use params::{
    AlgorithmParameters, EdgeRoutingParameters, LayoutParameters, ObservableParameters,
    OverlapRemovalParameters,
};
pub use progress::{IterationSnapshot, ProgressReporter};
pub use sizes::VertexSizes;
