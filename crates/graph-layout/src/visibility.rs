//! Temporarily hiding parts of a graph
//!
//! [`HidableGraph`] removes vertices and edges from the live [`Graph`] while
//! keeping them around for a later restore. Hidden items can be grouped under
//! a string tag and restored together.

use crate::{Edge, EdgeId, Graph, LayoutError, Vertex, VertexId};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Tag {
    vertices: BTreeSet<VertexId>,
    edges: BTreeSet<EdgeId>,
}

/// A graph whose vertices and edges can be hidden and restored by id
#[derive(Debug, Clone, Default)]
pub struct HidableGraph {
    graph: Graph,
    hidden_vertices: HashMap<VertexId, Vertex>,
    hidden_edges: HashMap<EdgeId, Edge>,
    /// Edges that were hidden because the key vertex was hidden
    cascaded: HashMap<VertexId, Vec<EdgeId>>,
    tags: HashMap<String, Tag>,
}

impl HidableGraph {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            ..Default::default()
        }
    }

    /// The visible part of the graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Restore everything and hand back the full graph
    pub fn into_graph(mut self) -> Graph {
        self.unhide_all();
        self.graph
    }

    /// Hide a vertex and every edge touching it
    ///
    /// Returns `false` when the vertex was already hidden.
    pub fn hide_vertex(&mut self, id: VertexId) -> Result<bool, LayoutError> {
        if self.hidden_vertices.contains_key(&id) {
            return Ok(false);
        }
        let (vertex, edges) = self
            .graph
            .remove_vertex(id)
            .ok_or(LayoutError::VertexNotFound(id))?;
        let index = self.cascaded.entry(id).or_default();
        for edge in edges {
            index.push(edge.id);
            self.hidden_edges.insert(edge.id, edge);
        }
        debug!("Hid vertex {id} with {} edges", index.len());
        self.hidden_vertices.insert(id, vertex);
        Ok(true)
    }

    /// Hide a vertex and remember it under `tag`
    pub fn hide_vertex_tagged(&mut self, id: VertexId, tag: &str) -> Result<bool, LayoutError> {
        let hidden = self.hide_vertex(id)?;
        self.tags.entry(tag.to_string()).or_default().vertices.insert(id);
        Ok(hidden)
    }

    /// Hide several vertices, stopping at the first unknown id
    ///
    /// Returns how many were newly hidden.
    pub fn hide_vertices(
        &mut self,
        ids: impl IntoIterator<Item = VertexId>,
    ) -> Result<usize, LayoutError> {
        let mut count = 0;
        for id in ids {
            if self.hide_vertex(id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn hide_edge(&mut self, id: EdgeId) -> Result<bool, LayoutError> {
        if self.hidden_edges.contains_key(&id) {
            return Ok(false);
        }
        let edge = self
            .graph
            .remove_edge(id)
            .ok_or(LayoutError::EdgeNotFound(id))?;
        self.hidden_edges.insert(id, edge);
        Ok(true)
    }

    pub fn hide_edge_tagged(&mut self, id: EdgeId, tag: &str) -> Result<bool, LayoutError> {
        let hidden = self.hide_edge(id)?;
        self.tags.entry(tag.to_string()).or_default().edges.insert(id);
        Ok(hidden)
    }

    /// Restore a vertex without its edges
    ///
    /// Returns `false` when the vertex was visible.
    pub fn unhide_vertex(&mut self, id: VertexId) -> Result<bool, LayoutError> {
        match self.hidden_vertices.remove(&id) {
            Some(vertex) => {
                self.graph.add_vertex(vertex)?;
                Ok(true)
            }
            None if self.graph.contains_vertex(id) => Ok(false),
            None => Err(LayoutError::VertexNotFound(id)),
        }
    }

    /// Restore a vertex and the edges hidden along with it
    ///
    /// Edges whose other endpoint is still hidden stay hidden. Returns the
    /// number of restored edges.
    pub fn unhide_vertex_and_edges(&mut self, id: VertexId) -> Result<usize, LayoutError> {
        self.unhide_vertex(id)?;
        let edges = self.cascaded.remove(&id).unwrap_or_default();
        let mut restored = 0;
        let mut pending = Vec::new();
        for eid in edges {
            match self.unhide_edge(eid) {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(LayoutError::EndpointHidden { .. }) => pending.push(eid),
                Err(e) => return Err(e),
            }
        }
        if !pending.is_empty() {
            self.cascaded.insert(id, pending);
        }
        Ok(restored)
    }

    /// Restore a single edge
    ///
    /// # Errors
    /// [`LayoutError::EndpointHidden`] while either endpoint is hidden,
    /// [`LayoutError::EdgeNotFound`] for unknown ids.
    pub fn unhide_edge(&mut self, id: EdgeId) -> Result<bool, LayoutError> {
        let Some(edge) = self.hidden_edges.get(&id) else {
            return if self.graph.contains_edge(id) {
                Ok(false)
            } else {
                Err(LayoutError::EdgeNotFound(id))
            };
        };
        if let Some(vertex) = [edge.source, edge.target]
            .into_iter()
            .find(|v| !self.graph.contains_vertex(*v))
        {
            return Err(LayoutError::EndpointHidden { edge: id, vertex });
        }
        if let Some(edge) = self.hidden_edges.remove(&id) {
            let (source, target) = (edge.source, edge.target);
            self.graph.add_edge(edge)?;
            for v in [source, target] {
                if let Some(list) = self.cascaded.get_mut(&v) {
                    list.retain(|e| *e != id);
                    if list.is_empty() {
                        self.cascaded.remove(&v);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Restore everything hidden under `tag`, relinking edges of the tagged
    /// vertices whose endpoints are visible again
    pub fn unhide_tag(&mut self, tag: &str) -> Result<(), LayoutError> {
        let entry = self
            .tags
            .remove(tag)
            .ok_or_else(|| LayoutError::TagNotFound(tag.to_string()))?;
        for &v in &entry.vertices {
            self.unhide_vertex(v)?;
        }
        for &v in &entry.vertices {
            self.unhide_vertex_and_edges(v)?;
        }
        for &e in &entry.edges {
            match self.unhide_edge(e) {
                Ok(_) | Err(LayoutError::EndpointHidden { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        debug!(
            "Restored tag {tag}: {} vertices, {} edges",
            entry.vertices.len(),
            entry.edges.len()
        );
        Ok(())
    }

    /// Restore every hidden vertex and edge
    pub fn unhide_all(&mut self) {
        let mut vertices: Vec<Vertex> = self.hidden_vertices.drain().map(|(_, v)| v).collect();
        vertices.sort_by_key(|v| v.id);
        for vertex in vertices {
            // Ids of hidden vertices never collide with live ones
            let _ = self.graph.add_vertex(vertex);
        }
        let mut edges: Vec<Edge> = self.hidden_edges.drain().map(|(_, e)| e).collect();
        edges.sort_by_key(|e| e.id);
        for edge in edges {
            let _ = self.graph.add_edge(edge);
        }
        self.cascaded.clear();
        self.tags.clear();
    }

    pub fn is_vertex_hidden(&self, id: VertexId) -> Result<bool, LayoutError> {
        if self.hidden_vertices.contains_key(&id) {
            Ok(true)
        } else if self.graph.contains_vertex(id) {
            Ok(false)
        } else {
            Err(LayoutError::VertexNotFound(id))
        }
    }

    pub fn is_edge_hidden(&self, id: EdgeId) -> Result<bool, LayoutError> {
        if self.hidden_edges.contains_key(&id) {
            Ok(true)
        } else if self.graph.contains_edge(id) {
            Ok(false)
        } else {
            Err(LayoutError::EdgeNotFound(id))
        }
    }

    /// Edges hidden together with `id` that have not been restored yet
    pub fn hidden_edges_of(&self, id: VertexId) -> Result<Vec<EdgeId>, LayoutError> {
        self.is_vertex_hidden(id)?;
        let mut edges = self.cascaded.get(&id).cloned().unwrap_or_default();
        edges.sort_unstable();
        Ok(edges)
    }

    pub fn hidden_vertex_count(&self) -> usize {
        self.hidden_vertices.len()
    }

    pub fn hidden_edge_count(&self) -> usize {
        self.hidden_edges.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}
