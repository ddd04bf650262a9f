//! Directed multigraph used as input by every algorithm
//!
//! Vertices and edges carry caller-chosen ids. Storage is a petgraph
//! [`StableDiGraph`] so indices stay valid across removals. Iteration follows
//! storage order (insertion order until something is removed, after which new
//! items may fill vacated slots), which keeps layouts reproducible.

mod compound;

pub use compound::CompoundGraph;

use crate::LayoutError;
use derive_more::{Display, From};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[display("v{_0}")]
pub struct VertexId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[display("e{_0}")]
pub struct EdgeId(pub u64);

/// How an algorithm treats a vertex
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize, Default)]
pub enum ProcessingOption {
    #[default]
    Include,
    /// Ignored by layout, overlap removal and routing
    Exclude,
    /// Kept at its current position by algorithms that support freezing
    Freeze,
}

/// Edge classification used by layered layouts
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum EdgeType {
    General,
    Hierarchical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(default)]
    pub group_id: Option<u32>,
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub skip_processing: ProcessingOption,
}

impl Vertex {
    pub fn new(id: impl Into<VertexId>) -> Self {
        Self {
            id: id.into(),
            group_id: None,
            angle: 0.0,
            skip_processing: ProcessingOption::Include,
        }
    }

    pub fn with_group(mut self, group_id: u32) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_processing(mut self, option: ProcessingOption) -> Self {
        self.skip_processing = option;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.skip_processing == ProcessingOption::Exclude
    }

    pub fn is_frozen(&self) -> bool {
        self.skip_processing == ProcessingOption::Freeze
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub edge_type: Option<EdgeType>,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<VertexId>,
        target: impl Into<VertexId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            weight: default_weight(),
            edge_type: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = Some(edge_type);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Untyped edges count as hierarchical
    pub fn is_hierarchical(&self) -> bool {
        self.edge_type != Some(EdgeType::General)
    }

    /// The endpoint opposite to `v`
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.source == v {
            self.target
        } else {
            self.source
        }
    }
}

/// Mutable directed multigraph keyed by [`VertexId`] and [`EdgeId`]
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: StableDiGraph<Vertex, Edge>,
    vertex_index: HashMap<VertexId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from flat vertex and edge sequences
    ///
    /// # Errors
    /// Fails on duplicate ids or edges referring to missing vertices
    pub fn from_parts(
        vertices: impl IntoIterator<Item = Vertex>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, LayoutError> {
        let mut graph = Graph::new();
        for v in vertices {
            graph.add_vertex(v)?;
        }
        for e in edges {
            graph.add_edge(e)?;
        }
        Ok(graph)
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<VertexId, LayoutError> {
        let id = vertex.id;
        if self.vertex_index.contains_key(&id) {
            return Err(LayoutError::DuplicateVertex(id));
        }
        let ix = self.inner.add_node(vertex);
        self.vertex_index.insert(id, ix);
        Ok(id)
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, LayoutError> {
        let id = edge.id;
        if self.edge_index.contains_key(&id) {
            return Err(LayoutError::DuplicateEdge(id));
        }
        let source = self.node_index(edge.source)?;
        let target = self.node_index(edge.target)?;
        let ix = self.inner.add_edge(source, target, edge);
        self.edge_index.insert(id, ix);
        Ok(id)
    }

    /// Remove a vertex and its incident edges, returning both
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<(Vertex, Vec<Edge>)> {
        let incident: Vec<EdgeId> = self.incident_edges(id).map(|e| e.id).collect();
        let ix = self.vertex_index.remove(&id)?;
        let mut removed = Vec::with_capacity(incident.len());
        for eid in incident {
            if let Some(e) = self.remove_edge(eid) {
                removed.push(e);
            }
        }
        let vertex = self.inner.remove_node(ix)?;
        Some((vertex, removed))
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let ix = self.edge_index.remove(&id)?;
        self.inner.remove_edge(ix)
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex_index.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge_index.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_index
            .get(&id)
            .and_then(|&ix| self.inner.node_weight(ix))
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        let ix = *self.vertex_index.get(&id)?;
        self.inner.node_weight_mut(ix)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index
            .get(&id)
            .and_then(|&ix| self.inner.edge_weight(ix))
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Vertices in storage order
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.inner
            .node_indices()
            .filter_map(move |ix| self.inner.node_weight(ix))
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices().map(|v| v.id)
    }

    /// Edges in storage order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.inner
            .edge_indices()
            .filter_map(move |ix| self.inner.edge_weight(ix))
    }

    pub fn out_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.directed_edges(id, Direction::Outgoing)
    }

    pub fn in_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.directed_edges(id, Direction::Incoming)
    }

    /// Outgoing then incoming edges, self loops reported once
    pub fn incident_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> + '_ {
        self.out_edges(id)
            .chain(self.in_edges(id).filter(|e| !e.is_self_loop()))
    }

    pub fn successors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.out_edges(id).map(|e| e.target)
    }

    pub fn predecessors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.in_edges(id).map(|e| e.source)
    }

    /// Distinct neighbours regardless of direction, in first-seen order
    pub fn neighbors(&self, id: VertexId) -> Vec<VertexId> {
        let mut seen = Vec::new();
        for e in self.incident_edges(id) {
            let other = e.other(id);
            if other != id && !seen.contains(&other) {
                seen.push(other);
            }
        }
        seen
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.in_edges(id).count()
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.out_edges(id).count()
    }

    pub fn degree(&self, id: VertexId) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    /// Copy of the vertices accepted by `keep` and the edges between them
    pub fn subgraph(&self, mut keep: impl FnMut(&Vertex) -> bool) -> Graph {
        let mut graph = Graph::new();
        for v in self.vertices() {
            if keep(v) {
                // ids are unique in self, so this cannot fail
                let _ = graph.add_vertex(v.clone());
            }
        }
        for e in self.edges() {
            if graph.contains_vertex(e.source) && graph.contains_vertex(e.target) {
                let _ = graph.add_edge(e.clone());
            }
        }
        graph
    }

    fn node_index(&self, id: VertexId) -> Result<NodeIndex, LayoutError> {
        self.vertex_index
            .get(&id)
            .copied()
            .ok_or(LayoutError::VertexNotFound(id))
    }

    fn directed_edges(&self, id: VertexId, dir: Direction) -> impl Iterator<Item = &Edge> + '_ {
        let ix = self.vertex_index.get(&id).copied();
        ix.into_iter()
            .flat_map(move |ix| self.inner.edges_directed(ix, dir))
            .map(|e| e.weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::path_graph;
    use crate::ErrorKind;
    use test_log::test;

    #[test]
    fn test_insertion_order_is_preserved() {
        let g = Graph::from_parts([Vertex::new(5), Vertex::new(2), Vertex::new(9)], []).unwrap();
        let ids: Vec<_> = g.vertex_ids().collect();
        assert_eq!(ids, vec![VertexId(5), VertexId(2), VertexId(9)]);
    }

    #[test]
    fn test_duplicate_and_missing_ids() {
        let mut g = path_graph(3);
        let err = g.add_vertex(Vertex::new(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);

        let err = g.add_edge(Edge::new(10, 0, 42)).unwrap_err();
        assert_eq!(err, LayoutError::VertexNotFound(VertexId(42)));
    }

    #[test]
    fn test_parallel_edges_and_self_loops() {
        let mut g = path_graph(2);
        g.add_edge(Edge::new(7, 0, 1)).unwrap();
        g.add_edge(Edge::new(8, 1, 1)).unwrap();

        assert_eq!(g.out_degree(VertexId(0)), 2);
        assert_eq!(g.incident_edges(VertexId(1)).count(), 3);
        assert_eq!(g.neighbors(VertexId(1)), vec![VertexId(0)]);
    }

    #[test]
    fn test_remove_vertex_removes_incident_edges() {
        let mut g = path_graph(3);
        let (v, edges) = g.remove_vertex(VertexId(1)).unwrap();
        assert_eq!(v.id, VertexId(1));
        assert_eq!(edges.len(), 2);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.vertex_count(), 2);
        // Ids can be reused once removed
        g.add_vertex(Vertex::new(1)).unwrap();
    }

    #[test]
    fn test_subgraph() {
        let g = path_graph(4);
        let sub = g.subgraph(|v| v.id.0 < 3);
        assert_eq!(sub.vertex_count(), 3);
        assert_eq!(sub.edge_count(), 2);
    }
}
