use crate::{LayoutError, Vec2, VertexId};
use std::collections::HashMap;
use std::hash::Hash;

/// Trait for providing vertex sizes during layout computation
pub trait VertexSizes<N> {
    /// Get the size of a vertex, if one was measured
    fn size(&self, vertex: N) -> Option<Vec2>;

    /// Size of a vertex, or zero when unknown
    fn size_or_zero(&self, vertex: N) -> Vec2 {
        self.size(vertex).unwrap_or_else(Vec2::zero)
    }
}

// Blanket implementation for closures
impl<N, F> VertexSizes<N> for F
where
    F: Fn(N) -> Option<Vec2>,
{
    fn size(&self, vertex: N) -> Option<Vec2> {
        self(vertex)
    }
}

// Implementation for HashMap
impl<N: Eq + Hash + Copy> VertexSizes<N> for HashMap<N, Vec2> {
    fn size(&self, vertex: N) -> Option<Vec2> {
        self.get(&vertex).copied()
    }
}

/// Look up a size that the calling algorithm cannot do without
pub(crate) fn require_size<S>(sizes: &S, vertex: VertexId) -> Result<Vec2, LayoutError>
where
    S: VertexSizes<VertexId> + ?Sized,
{
    sizes
        .size(vertex)
        .ok_or(LayoutError::MissingSize(vertex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_map_and_closure_sizes() {
        let map = HashMap::from([(VertexId(1), Vec2::new(10.0, 5.0))]);
        assert_eq!(map.size(VertexId(1)), Some(Vec2::new(10.0, 5.0)));
        assert_eq!(map.size_or_zero(VertexId(2)), Vec2::zero());

        let uniform = |_v: VertexId| Some(Vec2::new(3.0, 3.0));
        assert_eq!(uniform.size(VertexId(9)), Some(Vec2::new(3.0, 3.0)));
    }

    #[test]
    fn test_require_size_reports_vertex() {
        let map: HashMap<VertexId, Vec2> = HashMap::new();
        assert_eq!(
            require_size(&map, VertexId(4)),
            Err(LayoutError::MissingSize(VertexId(4)))
        );
    }
}
