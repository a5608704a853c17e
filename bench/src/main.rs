use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transit_graph_core::{
    bfs, closeness_centrality, dfs, find_critical_edges_with_config, katz_centrality_with_config,
    merge_transfer_nodes_counted, mean, outward_accessibility_with_config, page_rank_with_config,
    BasicTraverser, Edge, EdgeList, EngineConfig, Error, Graph, Result, Route, Stop,
};

#[derive(Debug, Parser)]
#[command(name = "transit-graph-bench", about = "Time the engine on synthetic transit networks")]
struct Cli {
    /// Network shape to generate
    #[arg(value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Approximate number of stops per network
    #[arg(default_value_t = 100)]
    nodes: usize,

    /// Number of new connections for the critical-edge search
    #[arg(long, default_value_t = 2)]
    routes: usize,

    /// TOML file overriding engine settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON report instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every generator
    All,
    /// Manhattan grid, one route per row and column
    Grid,
    /// Lines radiating from a central interchange, closed by an orbital
    Hub,
    /// Trunk line with paired platforms joined by transfers
    Corridor,
}

type Generator = fn(usize) -> Result<Graph>;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
            EngineConfig::from_toml_str(&text)?
        }
        None => EngineConfig::default(),
    };

    let generators: Vec<(&str, Generator)> = match cli.mode {
        Mode::Grid => vec![("Grid city", gen_grid)],
        Mode::Hub => vec![("Hub and spoke", gen_hub)],
        Mode::Corridor => vec![("Corridor with transfers", gen_corridor)],
        Mode::All => vec![
            ("Grid city", gen_grid as Generator),
            ("Hub and spoke", gen_hub),
            ("Corridor with transfers", gen_corridor),
        ],
    };

    if !cli.json {
        println!("transit-graph-bench");
        println!("===================");
        println!();
    }

    let mut reports = Vec::with_capacity(generators.len());
    for (name, generator) in generators {
        let report = run_benchmark(name, generator, cli.nodes, cli.routes, &config)?;
        if !cli.json {
            print_report(&report);
        }
        reports.push(report);
    }

    if cli.json {
        let body: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "network": r.name,
                    "nodes": r.nodes,
                    "edges": r.edges,
                    "memory_bytes": r.memory,
                    "merged_stops": r.merged_stops,
                    "critical_edges": r.critical_edges,
                    "timings": r.timings.iter().map(|t| json!({
                        "step": t.step,
                        "ms": t.millis,
                        "result": t.detail,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&body).map_err(|e| Error::config(e.to_string()))?);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct Timing {
    step: &'static str,
    millis: f64,
    detail: String,
}

struct Report {
    name: &'static str,
    nodes: usize,
    edges: usize,
    memory: usize,
    timings: Vec<Timing>,
    /// Synthetic stops produced by transfer contraction.
    merged_stops: Vec<Stop>,
    /// Connections the critical-edge search added.
    critical_edges: EdgeList,
}

fn timed<T>(step: &'static str, timings: &mut Vec<Timing>, f: impl FnOnce() -> T) -> T {
    let t = Instant::now();
    let out = f();
    timings.push(Timing {
        step,
        millis: t.elapsed().as_secs_f64() * 1000.0,
        detail: String::new(),
    });
    out
}

fn note(timings: &mut [Timing], detail: String) {
    if let Some(last) = timings.last_mut() {
        last.detail = detail;
    }
}

fn run_benchmark(
    name: &'static str,
    generator: Generator,
    node_count: usize,
    routes: usize,
    config: &EngineConfig,
) -> Result<Report> {
    let mut timings = Vec::new();
    let graph = timed("generate", &mut timings, || generator(node_count))?;
    info!(network = name, nodes = graph.len(), "generated");

    let mut traverser = BasicTraverser::new();
    let summary = timed("dfs", &mut timings, || dfs(&graph, 0, &mut traverser))?;
    note(&mut timings, format!("{} stations", summary.stations_visited));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| Error::config(e.to_string()))?;
    let mut traverser = BasicTraverser::new();
    let summary = timed("bfs", &mut timings, || {
        runtime.block_on(bfs(&graph, 0, &mut traverser))
    })?;
    note(&mut timings, format!("{} stations", summary.stations_visited));

    let ranks = timed("closeness", &mut timings, || {
        closeness_centrality(&graph, &mut ())
    });
    note(&mut timings, format!("mean {:.4}", mean(&ranks)));

    let ranks = timed("page rank", &mut timings, || {
        page_rank_with_config(&graph, &config.centrality, &mut ())
    });
    note(&mut timings, format!("mean {:.4}", mean(&ranks)));

    let ranks = timed("katz", &mut timings, || {
        katz_centrality_with_config(&graph, &config.centrality, &mut ())
    });
    note(&mut timings, format!("mean {:.4}", mean(&ranks)));

    let ranks = timed("accessibility", &mut timings, || {
        outward_accessibility_with_config(&graph, &config.centrality, &mut ())
    });
    note(&mut timings, format!("mean {:.4}", mean(&ranks)));

    let contracted = timed("merge transfers", &mut timings, || {
        merge_transfer_nodes_counted(&graph)
    })?;
    let (detail, merged_stops) = match contracted {
        Some((merged, count)) => (
            format!("{} merges, {} stops left", count, merged.len()),
            merged
                .stops()
                .iter()
                .filter(|s| s.id.contains('-'))
                .cloned()
                .collect(),
        ),
        None => ("no transfers".to_string(), Vec::new()),
    };
    note(&mut timings, detail);

    let improved = timed("critical edges", &mut timings, || {
        find_critical_edges_with_config(&graph, routes, config)
    })?;
    let critical_edges: EdgeList = improved
        .edges()
        .iter()
        .filter(|e| !graph.edge_exists(e.origin, e.destination))
        .copied()
        .collect();
    let before = mean(&closeness_centrality(&graph, &mut ()));
    let after = mean(&closeness_centrality(&improved, &mut ()));
    note(
        &mut timings,
        format!("closeness {:.4} -> {:.4}", before, after),
    );

    Ok(Report {
        name,
        nodes: graph.len(),
        edges: graph.edge_count(),
        memory: graph.memory_usage(),
        timings,
        merged_stops,
        critical_edges,
    })
}

fn print_report(report: &Report) {
    println!("--- {} ---", report.name);
    println!(
        "{} stops, {} edges, ~{:.1}KB",
        report.nodes,
        report.edges,
        report.memory as f64 / 1024.0
    );
    println!();
    println!("{:>16} {:>12}  {}", "step", "time", "result");
    println!("{:->16} {:->12}  {:->30}", "", "", "");
    for t in &report.timings {
        println!("{:>16} {:>10.2}ms  {}", t.step, t.millis, t.detail);
    }
    println!();
}

// ---------------------------------------------------------------------------
// Generators: deterministic, one stop per node
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
    /// Travel time between adjacent stops, 1 to 5 minutes.
    fn minutes(&mut self) -> f64 {
        1.0 + (self.next_f64() * 4.0).round()
    }
}

fn stop(index: usize, name: String, lat: f64, lon: f64, route: &str) -> Stop {
    Stop::new(index, name, lat, lon, vec![Route::new(route)])
}

/// Square grid. Every row and every column is its own route.
fn gen_grid(node_count: usize) -> Result<Graph> {
    let side = (node_count as f64).sqrt().ceil().max(2.0) as usize;
    let n = side * side;
    let mut rng = FastRng::new(42);
    let mut edges = EdgeList::with_capacity(2 * n);
    let mut stops = Vec::with_capacity(n);

    for r in 0..side {
        for c in 0..side {
            let i = r * side + c;
            stops.push(stop(
                i,
                format!("{} St & {} Ave", r + 1, c + 1),
                r as f64 * 0.01,
                c as f64 * 0.01,
                &format!("row-{}", r),
            ));
            if c + 1 < side {
                edges.add(Edge::route(i, i + 1, rng.minutes()));
            }
            if r + 1 < side {
                edges.add(Edge::route(i, i + side, rng.minutes()));
            }
        }
    }
    Graph::new(&edges, n, stops)
}

/// Central interchange (node 0) with eight radial lines whose outer
/// terminals are joined by an orbital route.
fn gen_hub(node_count: usize) -> Result<Graph> {
    const SPOKES: usize = 8;
    let length = (node_count.saturating_sub(1) / SPOKES).max(1);
    let n = 1 + SPOKES * length;
    let mut rng = FastRng::new(7);
    let mut edges = EdgeList::with_capacity(n + SPOKES);
    let mut stops = Vec::with_capacity(n);
    stops.push(stop(0, "Central".into(), 0.0, 0.0, "hub"));

    for s in 0..SPOKES {
        let angle = s as f64 * std::f64::consts::TAU / SPOKES as f64;
        for k in 0..length {
            let i = 1 + s * length + k;
            let d = (k + 1) as f64 * 0.01;
            stops.push(stop(
                i,
                format!("Line {} stop {}", s + 1, k + 1),
                d * angle.sin(),
                d * angle.cos(),
                &format!("line-{}", s + 1),
            ));
            let prev = if k == 0 { 0 } else { i - 1 };
            edges.add(Edge::route(prev, i, rng.minutes()));
        }
    }
    for s in 0..SPOKES {
        let here = (s + 1) * length;
        let next = ((s + 1) % SPOKES + 1) * length;
        edges.add(Edge::route(here, next, rng.minutes() * 2.0));
    }
    Graph::new(&edges, n, stops)
}

/// Trunk line where every fourth station has a second platform for a
/// short branch. Platforms pair up through transfer edges, so contraction
/// folds each pair back into one station.
fn gen_corridor(node_count: usize) -> Result<Graph> {
    const BRANCH_EVERY: usize = 4;
    const BRANCH_LEN: usize = 2;
    let trunk = (node_count / 2).max(BRANCH_EVERY);
    let junctions = trunk / BRANCH_EVERY;
    let n = trunk + junctions * (1 + BRANCH_LEN);
    let mut rng = FastRng::new(1234);
    let mut edges = EdgeList::with_capacity(2 * n);
    let mut stops = Vec::with_capacity(n);

    for i in 0..trunk {
        stops.push(stop(i, format!("Station {}", i + 1), 0.0, i as f64 * 0.01, "trunk"));
        if i > 0 {
            edges.add(Edge::route(i - 1, i, rng.minutes()));
        }
    }

    let mut next = trunk;
    for j in 0..junctions {
        let station = j * BRANCH_EVERY;
        let route = format!("branch-{}", j + 1);
        let platform = next;
        stops.push(stop(
            platform,
            format!("Station {}", station + 1),
            0.0,
            station as f64 * 0.01,
            &route,
        ));
        edges.add(Edge::transfer(station, platform, 0.5));
        next += 1;

        let mut prev = platform;
        for k in 0..BRANCH_LEN {
            stops.push(stop(
                next,
                format!("Branch {} stop {}", j + 1, k + 1),
                (k + 1) as f64 * 0.01,
                station as f64 * 0.01,
                &route,
            ));
            edges.add(Edge::route(prev, next, rng.minutes()));
            prev = next;
            next += 1;
        }
    }
    Graph::new(&edges, n, stops)
}
