use crate::sizes::{require_size, VertexSizes};
use crate::{
    CancellationToken, ComputeOutcome, Edge, EdgeId, Graph, IterationSnapshot, LayoutError, Point,
    ProgressReporter, Rect, Vec2, Vertex, VertexId,
};
use crossbeam::channel::Sender;
use std::collections::HashMap;

/// Vertex positions (top-left corners)
pub type Positions = HashMap<VertexId, Point>;
/// Measured vertex sizes
pub type Sizes = HashMap<VertexId, Vec2>;
/// Vertex rectangles, input and output of overlap removal
pub type Rectangles = HashMap<VertexId, Rect>;
/// Route control points per edge
pub type EdgeRoutes = HashMap<EdgeId, Vec<Point>>;

/// A layout algorithm that computes positions for the vertices of its graph
///
/// Every algorithm owns a [`LayoutState`] holding its graph, positions and
/// sizes; the accessors below are provided on top of it. `compute` mutates
/// the positions in place and can be called repeatedly on the same instance.
pub trait LayoutAlgorithm: Send {
    fn state(&self) -> &LayoutState;

    fn state_mut(&mut self) -> &mut LayoutState;

    /// Compute positions for the graph
    ///
    /// # Errors
    /// Returns an error when required input (e.g. a vertex size) is missing.
    /// Cancellation is reported as [`ComputeOutcome::Cancelled`], not as an
    /// error.
    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError>;

    /// Whether `compute` reads the vertex sizes
    fn needs_vertex_sizes(&self) -> bool {
        false
    }

    /// Whether [`crate::ProcessingOption::Freeze`] vertices keep their position
    fn supports_object_freeze(&self) -> bool {
        false
    }

    /// Routes computed alongside the layout, for algorithms that route
    /// their own edges
    fn edge_routes(&self) -> Option<&EdgeRoutes> {
        None
    }

    /// Rebuild the internal graph from flat sequences, keeping positions and
    /// sizes of the vertices that survive
    fn reset_graph(&mut self, vertices: Vec<Vertex>, edges: Vec<Edge>) -> Result<(), LayoutError> {
        self.state_mut().reset_graph(vertices, edges)
    }

    fn graph(&self) -> &Graph {
        &self.state().graph
    }

    fn vertex_positions(&self) -> &Positions {
        &self.state().positions
    }

    fn vertex_positions_mut(&mut self) -> &mut Positions {
        &mut self.state_mut().positions
    }

    fn vertex_sizes(&self) -> &Sizes {
        &self.state().sizes
    }

    fn vertex_sizes_mut(&mut self) -> &mut Sizes {
        &mut self.state_mut().sizes
    }

    fn set_progress_sender(&mut self, sender: Sender<IterationSnapshot>) {
        self.state_mut().progress.set_sender(sender);
    }
}

/// Graph, positions and sizes shared by every layout algorithm
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    pub graph: Graph,
    pub positions: Positions,
    pub sizes: Sizes,
    pub progress: ProgressReporter,
}

impl LayoutState {
    /// Use the given maps as a warm start, or allocate fresh ones sized to
    /// the graph
    pub fn new(graph: Graph, positions: Option<Positions>, sizes: Option<Sizes>) -> Self {
        let n = graph.vertex_count();
        Self {
            graph,
            positions: positions.unwrap_or_else(|| HashMap::with_capacity(n)),
            sizes: sizes.unwrap_or_else(|| HashMap::with_capacity(n)),
            progress: ProgressReporter::default(),
        }
    }

    pub fn reset_graph(&mut self, vertices: Vec<Vertex>, edges: Vec<Edge>) -> Result<(), LayoutError> {
        let graph = Graph::from_parts(vertices, edges)?;
        self.positions.retain(|id, _| graph.contains_vertex(*id));
        self.sizes.retain(|id, _| graph.contains_vertex(*id));
        self.graph = graph;
        Ok(())
    }

    /// Vertices that take part in the layout, in graph order
    pub fn admitted(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.graph.vertices().filter(|v| !v.is_excluded())
    }

    pub fn size_of(&self, id: VertexId) -> Vec2 {
        self.sizes.size_or_zero(id)
    }

    pub fn require_size(&self, id: VertexId) -> Result<Vec2, LayoutError> {
        require_size(&self.sizes, id)
    }

    /// Fail with [`LayoutError::MissingSize`] unless every admitted vertex
    /// has a size
    pub fn ensure_sizes(&self) -> Result<(), LayoutError> {
        for v in self.admitted() {
            self.require_size(v.id)?;
        }
        Ok(())
    }

    /// Position and size of each admitted vertex that has a position
    pub fn rectangles(&self) -> Rectangles {
        self.admitted()
            .filter_map(|v| {
                let p = self.positions.get(&v.id)?;
                Some((v.id, Rect::from_point_size(*p, self.size_of(v.id))))
            })
            .collect()
    }
}

/// Dense index over a set of vertices
///
/// Algorithms store per-vertex data in `Vec`s aligned with this index and
/// translate back to ids at the API boundary.
#[derive(Debug, Clone, Default)]
pub(crate) struct VertexIndex {
    ids: Vec<VertexId>,
    lookup: HashMap<VertexId, usize>,
}

impl VertexIndex {
    pub fn new(ids: impl IntoIterator<Item = VertexId>) -> Self {
        let ids: Vec<VertexId> = ids.into_iter().collect();
        let lookup = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { ids, lookup }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: VertexId) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    pub fn id(&self, i: usize) -> VertexId {
        self.ids[i]
    }

    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Edges with both endpoints in the index, as index pairs with weights
    pub fn edge_pairs(&self, graph: &Graph) -> Vec<(usize, usize, f64)> {
        graph
            .edges()
            .filter_map(|e| Some((self.get(e.source)?, self.get(e.target)?, e.weight)))
            .collect()
    }

    /// Undirected adjacency lists, deduplicated, self loops dropped
    pub fn adjacency(&self, graph: &Graph) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.len()];
        for (s, t, _) in self.edge_pairs(graph) {
            if s == t {
                continue;
            }
            if !adj[s].contains(&t) {
                adj[s].push(t);
            }
            if !adj[t].contains(&s) {
                adj[t].push(s);
            }
        }
        adj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::path_graph;
    use crate::ProcessingOption;
    use test_log::test;

    #[test]
    fn test_reset_graph_keeps_surviving_positions() {
        let mut state = LayoutState::new(path_graph(3), None, None);
        state.positions.insert(VertexId(0), Point::new(1.0, 1.0));
        state.positions.insert(VertexId(2), Point::new(2.0, 2.0));

        state
            .reset_graph(vec![Vertex::new(0), Vertex::new(5)], vec![Edge::new(0, 0, 5)])
            .unwrap();

        assert_eq!(state.graph.vertex_count(), 2);
        assert_eq!(state.positions.len(), 1);
        assert!(state.positions.contains_key(&VertexId(0)));
    }

    #[test]
    fn test_admitted_skips_excluded() {
        let mut g = path_graph(3);
        g.vertex_mut(VertexId(1)).unwrap().skip_processing = ProcessingOption::Exclude;
        let state = LayoutState::new(g, None, None);
        let ids: Vec<_> = state.admitted().map(|v| v.id).collect();
        assert_eq!(ids, vec![VertexId(0), VertexId(2)]);
    }

    #[test]
    fn test_vertex_index_adjacency() {
        let g = path_graph(3);
        let index = VertexIndex::new(g.vertex_ids());
        let adj = index.adjacency(&g);
        assert_eq!(adj[1], vec![0, 2]);
        assert_eq!(index.get(VertexId(2)), Some(2));
    }
}
