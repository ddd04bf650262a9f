use super::{Edge, EdgeId, Graph, Vertex, VertexId};
use crate::LayoutError;
use std::collections::HashMap;

/// A [`Graph`] extended with parent/child containment
///
/// Every vertex has at most one parent and containment never forms a cycle.
#[derive(Debug, Clone, Default)]
pub struct CompoundGraph {
    graph: Graph,
    parent: HashMap<VertexId, VertexId>,
    children: HashMap<VertexId, Vec<VertexId>>,
}

impl CompoundGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a flat graph, every vertex at the top level
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph,
            ..Default::default()
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<VertexId, LayoutError> {
        self.graph.add_vertex(vertex)
    }

    /// Add `vertex` and make it a child of `parent` in one step
    pub fn add_child_vertex(
        &mut self,
        parent: VertexId,
        vertex: Vertex,
    ) -> Result<VertexId, LayoutError> {
        if !self.graph.contains_vertex(parent) {
            return Err(LayoutError::VertexNotFound(parent));
        }
        let id = self.graph.add_vertex(vertex)?;
        self.set_parent(id, parent)?;
        Ok(id)
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, LayoutError> {
        self.graph.add_edge(edge)
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent
    ///
    /// # Errors
    /// [`LayoutError::ContainmentCycle`] if `parent` is `child` or one of its
    /// descendants.
    pub fn set_parent(&mut self, child: VertexId, parent: VertexId) -> Result<(), LayoutError> {
        for id in [child, parent] {
            if !self.graph.contains_vertex(id) {
                return Err(LayoutError::VertexNotFound(id));
            }
        }
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(LayoutError::ContainmentCycle { parent, child });
        }
        self.detach(child);
        self.parent.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        Ok(())
    }

    /// Move `child` back to the top level
    pub fn detach(&mut self, child: VertexId) {
        if let Some(old) = self.parent.remove(&child) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.retain(|&c| c != child);
                if siblings.is_empty() {
                    self.children.remove(&old);
                }
            }
        }
    }

    /// Remove a vertex, its edges and its containment links; its children
    /// move to the top level
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<(Vertex, Vec<Edge>)> {
        let removed = self.graph.remove_vertex(id)?;
        self.detach(id);
        for child in self.children.remove(&id).unwrap_or_default() {
            self.parent.remove(&child);
        }
        Some(removed)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        self.graph.remove_edge(id)
    }

    pub fn parent_of(&self, id: VertexId) -> Option<VertexId> {
        self.parent.get(&id).copied()
    }

    pub fn children_of(&self, id: VertexId) -> &[VertexId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_compound(&self, id: VertexId) -> bool {
        !self.children_of(id).is_empty()
    }

    /// Whether `ancestor` contains `id`, directly or transitively
    pub fn is_ancestor_of(&self, ancestor: VertexId, id: VertexId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Number of ancestors of `id`
    pub fn depth(&self, id: VertexId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent_of(p);
        }
        depth
    }

    /// Top-level vertices in storage order
    pub fn roots(&self) -> Vec<VertexId> {
        self.graph
            .vertex_ids()
            .filter(|id| !self.parent.contains_key(id))
            .collect()
    }

    /// All descendants of `id`, parents before their children
    pub fn descendants(&self, id: VertexId) -> Vec<VertexId> {
        let mut out = Vec::new();
        let mut stack: Vec<VertexId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(v) = stack.pop() {
            out.push(v);
            stack.extend(self.children_of(v).iter().rev().copied());
        }
        out
    }

    /// Post-order traversal of the containment forest: children before parents
    pub fn post_order(&self) -> Vec<VertexId> {
        fn dfs(cg: &CompoundGraph, id: VertexId, out: &mut Vec<VertexId>) {
            for &c in cg.children_of(id) {
                dfs(cg, c, out);
            }
            out.push(id);
        }
        let mut out = Vec::with_capacity(self.graph.vertex_count());
        for root in self.roots() {
            dfs(self, root, &mut out);
        }
        out
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use test_log::test;

    fn nested() -> CompoundGraph {
        // 0 contains 1, 1 contains 2, 3 is free
        let mut cg = CompoundGraph::new();
        cg.add_vertex(Vertex::new(0)).unwrap();
        cg.add_child_vertex(VertexId(0), Vertex::new(1)).unwrap();
        cg.add_child_vertex(VertexId(1), Vertex::new(2)).unwrap();
        cg.add_vertex(Vertex::new(3)).unwrap();
        cg
    }

    #[test]
    fn test_rejects_containment_cycles() {
        let mut cg = nested();
        let err = cg.set_parent(VertexId(0), VertexId(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
        assert!(cg.set_parent(VertexId(1), VertexId(1)).is_err());
        // Structure unchanged after the rejected operations
        assert_eq!(cg.parent_of(VertexId(0)), None);
        assert_eq!(cg.parent_of(VertexId(1)), Some(VertexId(0)));
    }

    #[test]
    fn test_reparenting() {
        let mut cg = nested();
        cg.set_parent(VertexId(2), VertexId(3)).unwrap();
        assert!(cg.children_of(VertexId(1)).is_empty());
        assert_eq!(cg.children_of(VertexId(3)), &[VertexId(2)]);
        assert!(!cg.is_compound(VertexId(1)));
    }

    #[test]
    fn test_remove_vertex_unlinks_both_directions() {
        let mut cg = nested();
        cg.remove_vertex(VertexId(1)).unwrap();
        assert_eq!(cg.parent_of(VertexId(2)), None);
        assert!(cg.children_of(VertexId(0)).is_empty());
        assert_eq!(cg.roots(), vec![VertexId(0), VertexId(2), VertexId(3)]);
    }

    #[test]
    fn test_traversals() {
        let cg = nested();
        assert_eq!(cg.descendants(VertexId(0)), vec![VertexId(1), VertexId(2)]);
        assert_eq!(
            cg.post_order(),
            vec![VertexId(2), VertexId(1), VertexId(0), VertexId(3)]
        );
        assert_eq!(cg.depth(VertexId(2)), 2);
        assert!(cg.is_ancestor_of(VertexId(0), VertexId(2)));
    }
}
