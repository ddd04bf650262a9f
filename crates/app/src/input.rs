use anyhow::{Context, Result};
use graph_layout::pipeline::PipelineConfig;
use graph_layout::{Edge, Graph, Positions, Sizes, Vertex};
use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk description of a graph to lay out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub sizes: Sizes,
    /// Starting positions for a warm start
    #[serde(default)]
    pub positions: Option<Positions>,
}

impl GraphFile {
    pub fn into_parts(self) -> Result<(Graph, Sizes, Option<Positions>)> {
        let graph = Graph::from_parts(self.vertices, self.edges).context("Invalid graph")?;
        Ok((graph, self.sizes, self.positions))
    }
}

/// Ids may be written as plain integers
pub fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(Extensions::UNWRAP_NEWTYPES)
}

pub fn parse_graph(text: &str) -> Result<GraphFile> {
    Ok(ron_options().from_str(text)?)
}

pub fn load_graph(path: &Path) -> Result<GraphFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph {}", path.display()))?;
    parse_graph(&text).with_context(|| format!("Failed to parse graph {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    ron_options()
        .from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_layout::{Vec2, VertexId};
    use test_log::test;

    #[test]
    fn test_parse_graph() {
        let text = r#"(
            vertices: [(id: 1), (id: 2, group_id: Some(3))],
            edges: [(id: 10, source: 1, target: 2)],
            sizes: {1: (x: 20.0, y: 10.0)},
        )"#;
        let file = parse_graph(text).unwrap();
        assert_eq!(file.sizes[&VertexId(1)], Vec2::new(20.0, 10.0));
        let (graph, sizes, positions) = file.into_parts().unwrap();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(sizes.len(), 1);
        assert!(positions.is_none());
    }

    #[test]
    fn test_dangling_edge() {
        let text = "(vertices: [(id: 1)], edges: [(id: 1, source: 1, target: 5)])";
        assert!(parse_graph(text).unwrap().into_parts().is_err());
    }

    #[test]
    fn test_default_config() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }
}
