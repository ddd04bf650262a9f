use crate::graph::{EdgeId, VertexId};
use thiserror::Error;

/// Broad category of a [`LayoutError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required input missing or malformed
    InvalidData,
    /// A registry or structural invariant would be violated
    Consistency,
    /// A lookup by id failed
    ObjectNotFound,
    /// Anything else, e.g. a construction the engine does not support
    General,
}

/// Errors that can occur while building graphs or computing layouts
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// `compute` was called before a graph was provided
    #[error("no graph has been provided")]
    GraphNotInitialized,

    /// The algorithm needs a measured size for this vertex
    #[error("vertex {0} has no size but the algorithm requires one")]
    MissingSize(VertexId),

    /// A parameter failed validation
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An edge cannot be restored while one of its endpoints is hidden
    #[error("edge {edge} cannot be restored while vertex {vertex} is hidden")]
    EndpointHidden { edge: EdgeId, vertex: VertexId },

    #[error("vertex {0} already exists")]
    DuplicateVertex(VertexId),

    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),

    #[error("state `{0}` already exists")]
    DuplicateState(String),

    /// Making `child` a child of `parent` would create a containment cycle
    #[error("vertex {child} cannot be contained in {parent}: {parent} is a descendant of {child}")]
    ContainmentCycle { parent: VertexId, child: VertexId },

    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("tag `{0}` not found")]
    TagNotFound(String),

    #[error("state `{0}` not found")]
    StateNotFound(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::GraphNotInitialized
            | LayoutError::MissingSize(_)
            | LayoutError::InvalidParameter { .. }
            | LayoutError::EndpointHidden { .. } => ErrorKind::InvalidData,
            LayoutError::DuplicateVertex(_)
            | LayoutError::DuplicateEdge(_)
            | LayoutError::DuplicateState(_)
            | LayoutError::ContainmentCycle { .. } => ErrorKind::Consistency,
            LayoutError::VertexNotFound(_)
            | LayoutError::EdgeNotFound(_)
            | LayoutError::TagNotFound(_)
            | LayoutError::StateNotFound(_) => ErrorKind::ObjectNotFound,
            LayoutError::Unsupported(_) => ErrorKind::General,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        LayoutError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fail with [`LayoutError::InvalidParameter`] unless `value` is finite and `>= 0`
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::invalid_parameter(
            name,
            format!("must be a finite non-negative number, got {value}"),
        ))
    }
}

/// Fail with [`LayoutError::InvalidParameter`] unless `value` is finite and `> 0`
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::invalid_parameter(
            name,
            format!("must be a finite positive number, got {value}"),
        ))
    }
}
