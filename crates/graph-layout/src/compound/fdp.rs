use crate::error::ensure_non_negative;
use crate::force::{FrParameters, FruchtermanReingoldLayout};
use crate::overlap::{remove_overlaps, FsaMode, FsaParameters};
use crate::{
    AlgorithmParameters, CancellationToken, CompoundGraph, ComputeOutcome, Edge, Graph,
    LayoutAlgorithm, LayoutError, LayoutState, Point, Positions, Rect, Sizes, Thickness, Vec2,
    Vertex, VertexId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// How the size of a compound vertex is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompoundSizing {
    /// Bounding box of the children plus the border
    #[default]
    Automatic,
    /// The supplied vertex size, children centred inside
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundFdpParameters {
    /// Force-directed run applied to the children of every compound vertex
    /// and to the top level. Without `bounds` the area is derived from the
    /// total size of the vertices being placed.
    pub inner: FrParameters,
    /// Separation of siblings after each force-directed run
    pub overlap: FsaParameters,
    /// Border of compound vertices without an explicit one
    pub default_border: Thickness,
}

impl Default for CompoundFdpParameters {
    fn default() -> Self {
        Self {
            inner: FrParameters::default(),
            overlap: FsaParameters::default(),
            default_border: Thickness::uniform(10.0),
        }
    }
}

impl AlgorithmParameters for CompoundFdpParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        self.inner.validate()?;
        self.overlap.validate()?;
        validate_border(&self.default_border)
    }
}

fn validate_border(border: &Thickness) -> Result<(), LayoutError> {
    ensure_non_negative("border.left", border.left)?;
    ensure_non_negative("border.top", border.top)?;
    ensure_non_negative("border.right", border.right)?;
    ensure_non_negative("border.bottom", border.bottom)
}

/// Containment restricted to admitted vertices: the children of an excluded
/// vertex are lifted to its nearest admitted ancestor
#[derive(Debug, Default)]
struct Forest {
    parent: HashMap<VertexId, VertexId>,
    roots: Vec<VertexId>,
    children: HashMap<VertexId, Vec<VertexId>>,
}

impl Forest {
    fn new(graph: &CompoundGraph) -> Self {
        let admitted = |id: VertexId| {
            graph
                .graph()
                .vertex(id)
                .is_some_and(|v| !v.is_excluded())
        };
        let mut forest = Forest::default();
        for v in graph.graph().vertices().filter(|v| !v.is_excluded()) {
            let mut ancestor = graph.parent_of(v.id);
            while let Some(a) = ancestor.filter(|&a| !admitted(a)) {
                ancestor = graph.parent_of(a);
            }
            match ancestor {
                Some(p) => {
                    forest.parent.insert(v.id, p);
                    forest.children.entry(p).or_default().push(v.id);
                }
                None => forest.roots.push(v.id),
            }
        }
        forest
    }

    /// Vertices with children, children before parents
    fn containers(&self) -> Vec<VertexId> {
        fn visit(forest: &Forest, id: VertexId, out: &mut Vec<VertexId>) {
            if let Some(children) = forest.children.get(&id) {
                for &c in children {
                    visit(forest, c, out);
                }
                out.push(id);
            }
        }
        let mut out = Vec::new();
        for &root in &self.roots {
            visit(self, root, &mut out);
        }
        out
    }

    fn members(&self, container: Option<VertexId>) -> &[VertexId] {
        match container {
            Some(c) => self.children.get(&c).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// The member of `members` that is `id` or contains it
    fn owner(&self, id: VertexId, members: &HashSet<VertexId>) -> Option<VertexId> {
        let mut current = Some(id);
        while let Some(v) = current {
            if members.contains(&v) {
                return Some(v);
            }
            current = self.parent.get(&v).copied();
        }
        None
    }
}

/// Force-directed layout of a compound graph, laid out bottom-up
///
/// Each level is a bounded Fruchterman-Reingold run over the children of
/// one compound vertex, with edges between descendants lifted to the
/// children that contain them, followed by force-scan overlap removal.
/// Positions of compound vertices and their computed sizes are written to
/// the position and size maps.
#[derive(Debug)]
pub struct CompoundFdpLayout {
    graph: CompoundGraph,
    state: LayoutState,
    params: CompoundFdpParameters,
    borders: HashMap<VertexId, Thickness>,
    sizing: HashMap<VertexId, CompoundSizing>,
    inner_canvas: HashMap<VertexId, Vec2>,
}

impl CompoundFdpLayout {
    pub fn new(
        graph: CompoundGraph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: CompoundFdpParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph.graph().clone(), positions, sizes),
            graph,
            params,
            borders: HashMap::new(),
            sizing: HashMap::new(),
            inner_canvas: HashMap::new(),
        }
    }

    pub fn compound_graph(&self) -> &CompoundGraph {
        &self.graph
    }

    pub fn set_border(&mut self, id: VertexId, border: Thickness) -> Result<(), LayoutError> {
        if !self.graph.graph().contains_vertex(id) {
            return Err(LayoutError::VertexNotFound(id));
        }
        validate_border(&border)?;
        self.borders.insert(id, border);
        Ok(())
    }

    pub fn set_sizing(&mut self, id: VertexId, sizing: CompoundSizing) -> Result<(), LayoutError> {
        if !self.graph.graph().contains_vertex(id) {
            return Err(LayoutError::VertexNotFound(id));
        }
        self.sizing.insert(id, sizing);
        Ok(())
    }

    /// Canvas size computed for every compound vertex by the last `compute`
    pub fn inner_canvas_sizes(&self) -> &HashMap<VertexId, Vec2> {
        &self.inner_canvas
    }

    fn border(&self, id: VertexId) -> Thickness {
        self.borders
            .get(&id)
            .copied()
            .unwrap_or(self.params.default_border)
    }

    /// Lay out `members` around the origin and separate them
    ///
    /// Returns `None` when cancelled.
    fn arrange(
        &self,
        forest: &Forest,
        members: &[VertexId],
        sizes: &[Vec2],
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Rect>>, LayoutError> {
        if members.len() == 1 {
            return Ok(Some(vec![Rect::from_point_size(Point::origin(), sizes[0])]));
        }

        let member_set: HashSet<VertexId> = members.iter().copied().collect();
        let mut local = Graph::new();
        for &m in members {
            local.add_vertex(Vertex::new(m))?;
        }
        let mut next_edge = 0u64;
        for edge in self.state.graph.edges() {
            let (Some(s), Some(t)) = (
                forest.owner(edge.source, &member_set),
                forest.owner(edge.target, &member_set),
            ) else {
                continue;
            };
            if s != t {
                local.add_edge(Edge::new(next_edge, s, t).with_weight(edge.weight))?;
                next_edge += 1;
            }
        }

        let gap = Vec2::new(
            self.params.overlap.horizontal_gap,
            self.params.overlap.vertical_gap,
        );
        let mut inner = self.params.inner.clone();
        if inner.bounds.is_none() {
            let area: f64 = sizes.iter().map(|s| (s.x + gap.x) * (s.y + gap.y)).sum();
            let side = (area.sqrt() * 1.5).max(1.0);
            inner.bounds = Some(Rect::new(0.0, 0.0, side, side));
        }
        let local_sizes: Sizes = members.iter().copied().zip(sizes.iter().copied()).collect();
        let mut fr = FruchtermanReingoldLayout::new(local, None, Some(local_sizes), inner);
        if fr.compute(cancel)?.is_cancelled() {
            return Ok(None);
        }

        let mut rects: Vec<Rect> = members
            .iter()
            .zip(sizes)
            .map(|(m, s)| {
                let p = fr
                    .vertex_positions()
                    .get(m)
                    .copied()
                    .unwrap_or_else(Point::origin);
                Rect::from_point_size(p, *s)
            })
            .collect();
        let outcome = remove_overlaps(
            &mut rects,
            gap,
            self.params.overlap.max_iterations,
            FsaMode::Balanced,
            cancel,
        );
        Ok((!outcome.is_cancelled()).then_some(rects))
    }

    fn cancelled(&self, step: usize, total: usize) -> Result<ComputeOutcome, LayoutError> {
        self.state
            .progress
            .report(step, total, "cancelled", true, || self.state.positions.clone());
        Ok(ComputeOutcome::Cancelled)
    }
}

impl LayoutAlgorithm for CompoundFdpLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    /// Rebuild the graph and keep the containment links whose endpoints
    /// both survive
    fn reset_graph(&mut self, vertices: Vec<Vertex>, edges: Vec<Edge>) -> Result<(), LayoutError> {
        self.state.reset_graph(vertices, edges)?;
        let old = std::mem::take(&mut self.graph);
        let mut graph = CompoundGraph::from_graph(self.state.graph.clone());
        let ids: Vec<VertexId> = graph.graph().vertex_ids().collect();
        for id in ids {
            if let Some(parent) = old.parent_of(id) {
                if graph.graph().contains_vertex(parent) {
                    graph.set_parent(id, parent)?;
                }
            }
        }
        self.borders.retain(|id, _| graph.graph().contains_vertex(*id));
        self.sizing.retain(|id, _| graph.graph().contains_vertex(*id));
        self.inner_canvas.clear();
        self.graph = graph;
        Ok(())
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let forest = Forest::new(&self.graph);
        let containers = forest.containers();
        let total = containers.len() + 1;
        debug!(
            "Compound layout of {} vertices, {} compound",
            self.state.admitted().count(),
            containers.len()
        );

        let mut canvas: HashMap<VertexId, Vec2> = HashMap::new();
        let mut relative: Positions = Positions::new();
        let levels = containers.iter().copied().map(Some).chain([None]);
        for (step, container) in levels.enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled(step, total);
            }
            let members = forest.members(container);
            if members.is_empty() {
                continue;
            }
            let sizes = members
                .iter()
                .map(|m| match canvas.get(m) {
                    Some(size) => Ok(*size),
                    None => self.state.require_size(*m),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let Some(rects) = self.arrange(&forest, members, &sizes, cancel)? else {
                return self.cancelled(step, total);
            };
            let Some(bbox) = Rect::bounding(&rects) else {
                continue;
            };

            let offset = match container {
                None => Point::origin() - bbox.top_left(),
                Some(c) => {
                    let border = self.border(c);
                    let sizing = self.sizing.get(&c).copied().unwrap_or_default();
                    let (size, offset) = match sizing {
                        CompoundSizing::Automatic => (
                            Vec2::new(
                                bbox.width + border.horizontal(),
                                bbox.height + border.vertical(),
                            ),
                            Point::new(border.left, border.top) - bbox.top_left(),
                        ),
                        CompoundSizing::Fixed => {
                            let size = self.state.require_size(c)?;
                            let content = Rect::new(
                                border.left,
                                border.top,
                                size.x - border.horizontal(),
                                size.y - border.vertical(),
                            );
                            if bbox.width > content.width || bbox.height > content.height {
                                warn!("Children of {c} do not fit its fixed size");
                            }
                            (size, content.center() - bbox.center())
                        }
                    };
                    canvas.insert(c, size);
                    offset
                }
            };
            for (m, r) in members.iter().zip(&rects) {
                relative.insert(*m, r.top_left() + offset);
            }
            self.state
                .progress
                .report(step + 1, total, "level", false, || self.state.positions.clone());
        }

        // Accumulate absolute positions parents first
        let mut stack: Vec<(VertexId, Vec2)> =
            forest.roots.iter().map(|&r| (r, Vec2::zero())).collect();
        while let Some((id, base)) = stack.pop() {
            let Some(rel) = relative.get(&id) else {
                continue;
            };
            let absolute = *rel + base;
            self.state.positions.insert(id, absolute);
            for &child in forest.members(Some(id)) {
                stack.push((child, absolute - Point::origin()));
            }
        }
        for (id, size) in &canvas {
            self.state.sizes.insert(*id, *size);
        }
        self.inner_canvas = canvas;
        Ok(ComputeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::vid;
    use crate::{ErrorKind, ProcessingOption};
    use test_log::test;

    /// 0 contains 1, 2 and 3; 4 is a top-level leaf
    fn nested() -> CompoundGraph {
        let mut g = CompoundGraph::new();
        g.add_vertex(Vertex::new(0)).unwrap();
        for id in 1..4 {
            g.add_child_vertex(vid(0), Vertex::new(id)).unwrap();
        }
        g.add_vertex(Vertex::new(4)).unwrap();
        for (i, (s, t)) in [(1, 2), (2, 3), (3, 4)].into_iter().enumerate() {
            g.add_edge(Edge::new(i as u64, s, t)).unwrap();
        }
        g
    }

    fn leaf_sizes(ids: impl IntoIterator<Item = u64>) -> Sizes {
        ids.into_iter()
            .map(|id| (vid(id), Vec2::new(20.0, 20.0)))
            .collect()
    }

    fn rect_of(layout: &CompoundFdpLayout, id: u64) -> Rect {
        Rect::from_point_size(
            layout.vertex_positions()[&vid(id)],
            layout.vertex_sizes()[&vid(id)],
        )
    }

    #[test]
    fn test_children_inside_automatic_parent() {
        let mut layout = CompoundFdpLayout::new(
            nested(),
            None,
            Some(leaf_sizes([1, 2, 3, 4])),
            CompoundFdpParameters::default(),
        );
        let outcome = layout.compute(&CancellationToken::new()).unwrap();
        assert_eq!(outcome, ComputeOutcome::Completed);

        let parent = rect_of(&layout, 0);
        assert_eq!(layout.inner_canvas_sizes()[&vid(0)], parent.size());
        let inner = Rect::new(
            parent.x + 10.0,
            parent.y + 10.0,
            parent.width - 20.0,
            parent.height - 20.0,
        );
        for id in 1..4 {
            assert!(inner.contains_rect(&rect_of(&layout, id)));
        }
        assert!(!parent.intersects(&rect_of(&layout, 4)));
        for a in 1..4 {
            for b in (a + 1)..4 {
                assert!(!rect_of(&layout, a).intersects(&rect_of(&layout, b)));
            }
        }
    }

    #[test]
    fn test_fixed_parent_centres_children() {
        let mut sizes = leaf_sizes([1, 2, 3, 4]);
        sizes.insert(vid(0), Vec2::new(300.0, 300.0));
        let mut layout =
            CompoundFdpLayout::new(nested(), None, Some(sizes), CompoundFdpParameters::default());
        layout.set_sizing(vid(0), CompoundSizing::Fixed).unwrap();
        layout.compute(&CancellationToken::new()).unwrap();

        let parent = rect_of(&layout, 0);
        assert_eq!(parent.size(), Vec2::new(300.0, 300.0));
        let children = [1, 2, 3].map(|id| rect_of(&layout, id));
        let bbox = Rect::bounding(&children).unwrap();
        assert!(bbox.center().distance(parent.center()) < 1e-6);
    }

    #[test]
    fn test_deep_nesting_and_custom_border() {
        let mut g = CompoundGraph::new();
        g.add_vertex(Vertex::new(0)).unwrap();
        g.add_child_vertex(vid(0), Vertex::new(1)).unwrap();
        g.add_child_vertex(vid(1), Vertex::new(2)).unwrap();
        g.add_child_vertex(vid(1), Vertex::new(3)).unwrap();
        g.add_edge(Edge::new(0, 2, 3)).unwrap();
        let mut layout = CompoundFdpLayout::new(
            g,
            None,
            Some(leaf_sizes([2, 3])),
            CompoundFdpParameters::default(),
        );
        layout.set_border(vid(1), Thickness::uniform(5.0)).unwrap();
        layout.compute(&CancellationToken::new()).unwrap();

        let (outer, middle) = (rect_of(&layout, 0), rect_of(&layout, 1));
        assert!(outer.contains_rect(&middle));
        for id in [2, 3] {
            assert!(middle.contains_rect(&rect_of(&layout, id)));
        }
        // A single child sits exactly inside the border
        assert_eq!(middle.x - outer.x, 10.0);
    }

    #[test]
    fn test_excluded_compound_lifts_children() {
        let mut g = nested();
        g.add_vertex(Vertex::new(5)).unwrap();
        let mut layout =
            CompoundFdpLayout::new(g, None, Some(leaf_sizes(1..6)), Default::default());
        let vertices: Vec<Vertex> = layout
            .graph()
            .vertices()
            .map(|v| {
                if v.id == vid(0) {
                    v.clone().with_processing(ProcessingOption::Exclude)
                } else {
                    v.clone()
                }
            })
            .collect();
        let edges: Vec<Edge> = layout.graph().edges().cloned().collect();
        layout.reset_graph(vertices, edges).unwrap();
        assert_eq!(layout.compound_graph().parent_of(vid(1)), Some(vid(0)));

        layout.compute(&CancellationToken::new()).unwrap();
        assert!(!layout.vertex_positions().contains_key(&vid(0)));
        assert_eq!(layout.vertex_positions().len(), 5);
        assert!(layout.inner_canvas_sizes().is_empty());
    }

    #[test]
    fn test_missing_leaf_size() {
        let mut layout = CompoundFdpLayout::new(
            nested(),
            None,
            Some(leaf_sizes([1, 2, 3])),
            CompoundFdpParameters::default(),
        );
        let err = layout.compute(&CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut layout = CompoundFdpLayout::new(
            nested(),
            None,
            Some(leaf_sizes([1, 2, 3, 4])),
            CompoundFdpParameters::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(layout.compute(&cancel).unwrap().is_cancelled());
        assert!(layout.vertex_positions().is_empty());
    }
}
