use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use graph_layout::factory::{EdgeRoutingKind, LayoutAlgorithmKind, OverlapRemovalKind};
use graph_layout::pipeline::{LayoutOutput, LayoutPipeline};
use graph_layout::{CancellationToken, EdgeId, Point, Rect, VertexId};
use ron::ser::PrettyConfig;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

mod input;

fn parse_kind<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, ron::error::SpannedError> {
    ron::from_str(s)
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Graph description in RON
    graph: PathBuf,

    /// Pipeline configuration in RON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layout algorithm, e.g. `KamadaKawai`
    #[arg(short, long, value_parser = parse_kind::<LayoutAlgorithmKind>)]
    algorithm: Option<LayoutAlgorithmKind>,

    /// Overlap removal algorithm, `Fsa` or `OneWayFsa`
    #[arg(long, value_parser = parse_kind::<OverlapRemovalKind>)]
    overlap: Option<OverlapRemovalKind>,

    /// Edge router, `Simple`, `Bundling` or `PathFinder`
    #[arg(long, value_parser = parse_kind::<EdgeRoutingKind>)]
    routing: Option<EdgeRoutingKind>,

    #[arg(long)]
    no_overlap_removal: bool,

    #[arg(long)]
    no_edge_routing: bool,

    /// Cancel the computation after this many milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// [`LayoutOutput`] with ordered maps
#[derive(Serialize)]
struct Report {
    positions: BTreeMap<VertexId, Point>,
    rectangles: BTreeMap<VertexId, Rect>,
    routes: BTreeMap<EdgeId, Vec<Point>>,
    cancelled: bool,
}

impl From<LayoutOutput> for Report {
    fn from(output: LayoutOutput) -> Self {
        Self {
            positions: output.positions.into_iter().collect(),
            rectangles: output.rectangles.into_iter().collect(),
            routes: output.routes.into_iter().collect(),
            cancelled: output.cancelled,
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = input::load_config(args.config.as_deref())?;
    if let Some(algorithm) = args.algorithm {
        // Parameters of another family would be rejected
        if algorithm != config.layout {
            config.layout_parameters = None;
        }
        config.layout = algorithm;
    }
    if let Some(overlap) = args.overlap {
        if overlap != config.overlap_removal {
            config.overlap_parameters = None;
        }
        config.overlap_removal = overlap;
    }
    if let Some(routing) = args.routing {
        if routing != config.edge_routing {
            config.routing_parameters = None;
        }
        config.edge_routing = routing;
    }
    config.enable_overlap_removal &= !args.no_overlap_removal;
    config.enable_edge_routing &= !args.no_edge_routing;

    let (graph, sizes, positions) = input::load_graph(&args.graph)?.into_parts()?;
    info!(
        "Laying out {} vertices and {} edges with {:?}",
        graph.vertex_count(),
        graph.edge_count(),
        config.layout
    );

    let mut pipeline = LayoutPipeline::new(config);
    pipeline.set_graph(graph);
    pipeline.set_sizes(sizes);
    if let Some(positions) = positions {
        pipeline.set_positions(positions);
    }

    let (tx, rx) = crossbeam::channel::unbounded();
    pipeline.set_progress_sender(tx);
    let listener = std::thread::spawn(move || {
        for snapshot in rx {
            debug!(
                "{:>5.1}% {} (iteration {})",
                snapshot.percent, snapshot.message, snapshot.iteration
            );
        }
    });

    let cancel = CancellationToken::new();
    if let Some(ms) = args.timeout {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(ms));
            cancel.cancel();
        });
    }

    let output = pipeline.compute(&cancel).context("Layout failed")?;
    // Dropping the pipeline closes the progress channel
    drop(pipeline);
    if listener.join().is_err() {
        warn!("Progress listener panicked");
    }
    if output.cancelled {
        warn!("Layout was cancelled, the result is partial");
    }

    let text = input::ron_options()
        .to_string_pretty(&Report::from(output), PrettyConfig::new())
        .context("Failed to serialize result")?;
    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_parse_kinds() {
        let kind: LayoutAlgorithmKind = parse_kind("BalloonTree").unwrap();
        assert_eq!(kind, LayoutAlgorithmKind::BalloonTree);
        assert!(parse_kind::<EdgeRoutingKind>("Nope").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "graph-layout",
            "g.ron",
            "--algorithm",
            "Sugiyama",
            "--no-edge-routing",
        ])
        .unwrap();
        assert_eq!(args.algorithm, Some(LayoutAlgorithmKind::Sugiyama));
        assert!(args.no_edge_routing);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_run_writes_report() {
        let dir = std::env::temp_dir().join(format!("graph-layout-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let graph = dir.join("graph.ron");
        let out = dir.join("out.ron");
        std::fs::write(
            &graph,
            r#"(
                vertices: [(id: 1), (id: 2), (id: 3)],
                edges: [(id: 1, source: 1, target: 2), (id: 2, source: 2, target: 3)],
                sizes: {1: (x: 10.0, y: 10.0), 2: (x: 10.0, y: 10.0), 3: (x: 10.0, y: 10.0)},
            )"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "graph-layout",
            graph.to_str().unwrap(),
            "--algorithm",
            "Circular",
            "--output",
            out.to_str().unwrap(),
        ])
        .unwrap();
        run(args).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("positions"));
        assert!(text.contains("cancelled: false"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
