use crate::error::ensure_non_negative;
use crate::factory::{create_layout_algorithm, create_layout_parameters, LayoutAlgorithmKind};
use crate::overlap::{remove_overlaps, FsaMode, FsaParameters};
use crate::random::RandomParameters;
use crate::{
    AlgorithmParameters, CancellationToken, ComputeOutcome, Graph, LayoutAlgorithm, LayoutError,
    LayoutParameters, LayoutState, Point, Positions, Rect, Sizes, Vec2, VertexId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Layout settings of one vertex group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub group_id: u32,
    pub algorithm: LayoutAlgorithmKind,
    /// Defaults of `algorithm` when absent
    #[serde(default)]
    pub parameters: Option<LayoutParameters>,
    /// Area the group is moved into; groups without one are placed side by
    /// side
    #[serde(default)]
    pub zone: Option<Rect>,
}

impl GroupSettings {
    pub fn new(group_id: u32, algorithm: LayoutAlgorithmKind) -> Self {
        Self {
            group_id,
            algorithm,
            parameters: None,
            zone: None,
        }
    }

    pub fn with_zone(mut self, zone: Rect) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn with_parameters(mut self, parameters: LayoutParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingParameters {
    pub groups: Vec<GroupSettings>,
    /// Used for vertices without a group and groups without settings
    pub default_algorithm: LayoutAlgorithmKind,
    /// Distance between groups placed side by side
    pub group_gap: f64,
    /// Run overlap removal on the group bounding boxes at the end
    pub separate_groups: bool,
    pub overlap: FsaParameters,
}

impl Default for GroupingParameters {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            default_algorithm: LayoutAlgorithmKind::FruchtermanReingold,
            group_gap: 20.0,
            separate_groups: false,
            overlap: FsaParameters::default(),
        }
    }
}

impl GroupingParameters {
    /// Whether any configured inner algorithm reads vertex sizes
    pub fn needs_sizes(&self) -> bool {
        self.default_algorithm.needs_sizes() || self.groups.iter().any(|g| g.algorithm.needs_sizes())
    }
}

impl AlgorithmParameters for GroupingParameters {
    fn validate(&self) -> Result<(), LayoutError> {
        ensure_non_negative("group_gap", self.group_gap)?;
        self.overlap.validate()?;
        if self.default_algorithm == LayoutAlgorithmKind::Grouping {
            return Err(LayoutError::Unsupported(
                "grouping cannot be nested inside grouping".into(),
            ));
        }
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.algorithm == LayoutAlgorithmKind::Grouping {
                return Err(LayoutError::Unsupported(format!(
                    "group {} asks for a nested grouping layout",
                    group.group_id
                )));
            }
            if !seen.insert(group.group_id) {
                return Err(LayoutError::invalid_parameter(
                    "groups",
                    format!("group {} is configured twice", group.group_id),
                ));
            }
            if let Some(params) = &group.parameters {
                params.validate()?;
            }
            if let Some(zone) = group.zone {
                ensure_non_negative("zone.width", zone.width)?;
                ensure_non_negative("zone.height", zone.height)?;
            }
        }
        Ok(())
    }
}

/// Runs a separate layout per vertex group and arranges the groups
///
/// Edges between groups take no part in the layout. Vertices without a
/// `group_id` form one more group laid out with the default algorithm.
#[derive(Debug)]
pub struct GroupingLayout {
    state: LayoutState,
    params: GroupingParameters,
    bounds: BTreeMap<Option<u32>, Rect>,
}

impl GroupingLayout {
    pub fn new(
        graph: Graph,
        positions: Option<Positions>,
        sizes: Option<Sizes>,
        params: GroupingParameters,
    ) -> Self {
        Self {
            state: LayoutState::new(graph, positions, sizes),
            params,
            bounds: BTreeMap::new(),
        }
    }

    /// Bounding box of every group after the last `compute`
    pub fn group_bounds(&self) -> &BTreeMap<Option<u32>, Rect> {
        &self.bounds
    }

    fn settings(&self, group: Option<u32>) -> Option<&GroupSettings> {
        let id = group?;
        self.params.groups.iter().find(|g| g.group_id == id)
    }

    /// Run the group's own algorithm on the subgraph of `members`
    ///
    /// Returns `None` when cancelled.
    fn layout_group(
        &self,
        group: Option<u32>,
        members: &HashSet<VertexId>,
        cancel: &CancellationToken,
    ) -> Result<Option<Positions>, LayoutError> {
        let settings = self.settings(group);
        let kind = settings.map_or(self.params.default_algorithm, |s| s.algorithm);
        let params = match settings.and_then(|s| s.parameters.clone()) {
            Some(params) => params,
            None => match (kind, settings.and_then(|s| s.zone)) {
                (LayoutAlgorithmKind::Random, Some(zone)) => {
                    LayoutParameters::Random(RandomParameters {
                        bounds: Rect::new(0.0, 0.0, zone.width, zone.height),
                        ..Default::default()
                    })
                }
                _ => create_layout_parameters(kind),
            },
        };

        let subgraph = self.state.graph.subgraph(|v| members.contains(&v.id));
        let positions: Positions = self
            .state
            .positions
            .iter()
            .filter(|(id, _)| members.contains(id))
            .map(|(id, p)| (*id, *p))
            .collect();
        let sizes: Sizes = self
            .state
            .sizes
            .iter()
            .filter(|(id, _)| members.contains(id))
            .map(|(id, s)| (*id, *s))
            .collect();

        let mut layout =
            create_layout_algorithm(kind, subgraph, Some(positions), Some(sizes), Some(params))?;
        if layout.compute(cancel)?.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(layout.vertex_positions().clone()))
    }

    fn group_rect(&self, positions: &Positions) -> Option<Rect> {
        let rects: Vec<Rect> = positions
            .iter()
            .map(|(id, p)| Rect::from_point_size(*p, self.state.size_of(*id)))
            .collect();
        Rect::bounding(&rects)
    }
}

impl LayoutAlgorithm for GroupingLayout {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayoutState {
        &mut self.state
    }

    fn needs_vertex_sizes(&self) -> bool {
        self.params.needs_sizes()
    }

    fn compute(&mut self, cancel: &CancellationToken) -> Result<ComputeOutcome, LayoutError> {
        let mut groups: BTreeMap<Option<u32>, HashSet<VertexId>> = BTreeMap::new();
        for v in self.state.admitted() {
            groups.entry(v.group_id).or_default().insert(v.id);
        }
        debug!("Grouping layout over {} groups", groups.len());

        // Groups without a zone start to the right of every zone
        let mut cursor = self
            .params
            .groups
            .iter()
            .filter_map(|g| g.zone)
            .map(|z| z.right() + self.params.group_gap)
            .fold(0.0, f64::max);

        let mut laid_out: Vec<(Option<u32>, Positions, Rect)> = Vec::new();
        let total = groups.len();
        for (step, (group, members)) in groups.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(ComputeOutcome::Cancelled);
            }
            let Some(mut positions) = self.layout_group(*group, members, cancel)? else {
                return Ok(ComputeOutcome::Cancelled);
            };
            let Some(bbox) = self.group_rect(&positions) else {
                continue;
            };

            let target = match self.settings(*group).and_then(|s| s.zone) {
                Some(zone) => {
                    if bbox.width > zone.width || bbox.height > zone.height {
                        warn!("Group {group:?} does not fit its zone");
                    }
                    zone.top_left()
                }
                None => {
                    let at = Point::new(cursor, 0.0);
                    cursor += bbox.width + self.params.group_gap;
                    at
                }
            };
            let offset = target - bbox.top_left();
            positions.values_mut().for_each(|p| *p += offset);
            laid_out.push((*group, positions, bbox.translate(offset)));
            self.state
                .progress
                .report(step + 1, total, "group", false, || self.state.positions.clone());
        }

        if self.params.separate_groups && laid_out.len() > 1 {
            let mut rects: Vec<Rect> = laid_out.iter().map(|(_, _, r)| *r).collect();
            let outcome = remove_overlaps(
                &mut rects,
                Vec2::new(self.params.overlap.horizontal_gap, self.params.overlap.vertical_gap),
                self.params.overlap.max_iterations,
                FsaMode::Balanced,
                cancel,
            );
            for ((_, positions, bbox), moved) in laid_out.iter_mut().zip(rects) {
                let offset = moved.top_left() - bbox.top_left();
                positions.values_mut().for_each(|p| *p += offset);
                *bbox = moved;
            }
            if outcome.is_cancelled() {
                return Ok(ComputeOutcome::Cancelled);
            }
        }

        self.bounds.clear();
        for (group, positions, bbox) in laid_out {
            self.state.positions.extend(positions);
            self.bounds.insert(group, bbox);
        }
        Ok(ComputeOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::vid;
    use crate::{Edge, ErrorKind, Vertex};
    use test_log::test;

    /// Groups 1 and 2 with four vertices each, one cross edge, one vertex
    /// without a group
    fn grouped_graph() -> Graph {
        let vertices = (0..8)
            .map(|i| Vertex::new(i).with_group(if i < 4 { 1 } else { 2 }))
            .chain([Vertex::new(8)]);
        let edges = [Edge::new(0, 0, 1), Edge::new(1, 4, 5), Edge::new(2, 3, 4)];
        Graph::from_parts(vertices, edges).unwrap()
    }

    fn sizes(graph: &Graph) -> Sizes {
        graph
            .vertex_ids()
            .map(|id| (id, Vec2::new(10.0, 10.0)))
            .collect()
    }

    #[test]
    fn test_random_groups_stay_in_zones() {
        let zones = [
            Rect::new(0.0, 0.0, 200.0, 200.0),
            Rect::new(300.0, 0.0, 200.0, 200.0),
        ];
        let params = GroupingParameters {
            groups: vec![
                GroupSettings::new(1, LayoutAlgorithmKind::Random).with_zone(zones[0]),
                GroupSettings::new(2, LayoutAlgorithmKind::Random).with_zone(zones[1]),
            ],
            default_algorithm: LayoutAlgorithmKind::Random,
            ..Default::default()
        };
        let graph = grouped_graph();
        let sizes = sizes(&graph);
        let mut layout = GroupingLayout::new(graph, None, Some(sizes), params);
        layout.compute(&CancellationToken::new()).unwrap();

        let p = layout.vertex_positions();
        assert_eq!(p.len(), 9);
        for id in 0..8 {
            let zone = if id < 4 { zones[0] } else { zones[1] };
            let r = Rect::from_point_size(p[&vid(id)], Vec2::new(10.0, 10.0));
            assert!(zone.contains_rect(&r), "{id}: {r:?}");
        }
        let bounds = layout.group_bounds();
        assert!(!bounds[&Some(1)].intersects(&bounds[&Some(2)]));
        // The ungrouped vertex goes to the right of the zones
        assert!(bounds[&None].x >= 500.0);
    }

    #[test]
    fn test_side_by_side_without_zones() {
        let params = GroupingParameters {
            groups: vec![
                GroupSettings::new(1, LayoutAlgorithmKind::Circular),
                GroupSettings::new(2, LayoutAlgorithmKind::SimpleTree),
            ],
            ..Default::default()
        };
        let graph = grouped_graph();
        let sizes = sizes(&graph);
        let mut layout = GroupingLayout::new(graph, None, Some(sizes), params);
        layout.compute(&CancellationToken::new()).unwrap();

        let bounds: Vec<Rect> = layout.group_bounds().values().copied().collect();
        assert_eq!(bounds.len(), 3);
        for (i, a) in bounds.iter().enumerate() {
            for b in &bounds[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
    }

    #[test]
    fn test_separate_groups() {
        let params = GroupingParameters {
            groups: vec![
                GroupSettings::new(1, LayoutAlgorithmKind::Circular)
                    .with_zone(Rect::new(0.0, 0.0, 50.0, 50.0)),
                GroupSettings::new(2, LayoutAlgorithmKind::Circular)
                    .with_zone(Rect::new(10.0, 10.0, 50.0, 50.0)),
            ],
            separate_groups: true,
            ..Default::default()
        };
        let graph = grouped_graph();
        let sizes = sizes(&graph);
        let mut layout = GroupingLayout::new(graph, None, Some(sizes), params);
        layout.compute(&CancellationToken::new()).unwrap();
        let bounds = layout.group_bounds();
        assert!(!bounds[&Some(1)].intersects(&bounds[&Some(2)]));
    }

    #[test]
    fn test_needs_sizes_follows_groups() {
        let graph = grouped_graph();
        let plain = GroupingLayout::new(graph.clone(), None, None, GroupingParameters::default());
        assert!(!plain.needs_vertex_sizes());

        let params = GroupingParameters {
            groups: vec![GroupSettings::new(2, LayoutAlgorithmKind::Sugiyama)],
            ..Default::default()
        };
        let mut layered = GroupingLayout::new(graph, None, None, params);
        assert!(layered.needs_vertex_sizes());
        let err = layered.compute(&CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_nested_grouping_rejected() {
        let params = GroupingParameters {
            groups: vec![GroupSettings::new(1, LayoutAlgorithmKind::Grouping)],
            ..Default::default()
        };
        assert_eq!(params.validate().unwrap_err().kind(), ErrorKind::General);

        let twice = GroupingParameters {
            groups: vec![
                GroupSettings::new(1, LayoutAlgorithmKind::Random),
                GroupSettings::new(1, LayoutAlgorithmKind::Circular),
            ],
            ..Default::default()
        };
        assert_eq!(twice.validate().unwrap_err().kind(), ErrorKind::InvalidData);
    }
}
