//! Per-node importance rankings.
//!
//! Each algorithm returns one rank per node, hands a copy to the traverser
//! through `record_ranks`, and logs the top entries at debug level.

use tracing::{debug, warn};

use crate::config::CentralityConfig;
use crate::graph::Graph;
use crate::stats::{log_ranks, mean};
use crate::traverser::Traverser;

/// Closeness: `N / Σ_{u≠v} d(v, u)` over weighted shortest paths.
///
/// Fills the graph's shortest path cache if it is still empty. A node with
/// an unreachable peer has an infinite distance sum and ranks 0. The lone
/// node of a one-node graph has a distance sum of 0 and also ranks 0,
/// not `N / 0`.
pub fn closeness_centrality<T: Traverser + ?Sized>(graph: &Graph, traverser: &mut T) -> Vec<f64> {
    let n = graph.len();
    graph.calculate_path_lengths();

    let ranks: Vec<f64> = (0..n)
        .map(|v| {
            let total: f64 = (0..n)
                .filter(|&u| u != v)
                .map(|u| graph.shortest_path(v, u))
                .sum();
            if total > 0.0 {
                n as f64 / total
            } else {
                0.0
            }
        })
        .collect();

    finish("closeness", graph, ranks, traverser)
}

/// PageRank with the default parameters (damping 1, ten rounds).
pub fn page_rank<T: Traverser + ?Sized>(graph: &Graph, traverser: &mut T) -> Vec<f64> {
    page_rank_with_config(graph, &CentralityConfig::default(), traverser)
}

/// Power-iteration PageRank for a fixed number of rounds.
///
/// `rank'[v] = (1 - d) / N + d · Σ_{u ∈ incoming(v)} rank[u] / outdegree(u)`.
/// Stops after `pagerank_iterations` rounds, not at a tolerance.
pub fn page_rank_with_config<T: Traverser + ?Sized>(
    graph: &Graph,
    config: &CentralityConfig,
    traverser: &mut T,
) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        warn!("page rank on an empty graph");
        return finish("page rank", graph, Vec::new(), traverser);
    }

    let damping = config.pagerank_damping;
    let teleport = (1.0 - damping) / n as f64;
    let out_degree: Vec<usize> = (0..n).map(|v| graph.out_degree(v)).collect();
    let mut ranks = vec![config.pagerank_initial_rank; n];

    for round in 0..config.pagerank_iterations {
        let next: Vec<f64> = (0..n)
            .map(|v| {
                let inflow: f64 = graph
                    .incoming_nodes(v)
                    .iter()
                    .filter(|&&u| out_degree[u] > 0)
                    .map(|&u| ranks[u] / out_degree[u] as f64)
                    .sum();
                teleport + damping * inflow
            })
            .collect();
        ranks = next;
        debug!(round, "page rank round complete");
    }

    finish("page rank", graph, ranks, traverser)
}

/// Katz centrality with the default parameters (α 0.5, β 1, thirty rounds).
pub fn katz_centrality<T: Traverser + ?Sized>(graph: &Graph, traverser: &mut T) -> Vec<f64> {
    katz_centrality_with_config(graph, &CentralityConfig::default(), traverser)
}

/// Fixed-round Katz iteration over weighted edges in both orientations.
///
/// The accumulation buffer starts each round holding the previous round's
/// ranks, then gains `rank[u] · w(u, v)` for every neighbor `u` of `v`,
/// and is finally rescaled to `(α · next[v] + β) / N`.
pub fn katz_centrality_with_config<T: Traverser + ?Sized>(
    graph: &Graph,
    config: &CentralityConfig,
    traverser: &mut T,
) -> Vec<f64> {
    let n = graph.len();
    if n == 0 {
        warn!("katz centrality on an empty graph");
        return finish("katz", graph, Vec::new(), traverser);
    }

    let (alpha, beta) = (config.katz_alpha, config.katz_beta);
    let mut ranks = vec![config.katz_initial_rank; n];
    let mut next = ranks.clone();

    for round in 0..config.katz_iterations {
        for origin in 0..n {
            for &dest in graph.neighbors(origin) {
                next[dest] += ranks[origin] * graph.get_weight(origin, dest);
            }
        }
        for value in next.iter_mut() {
            *value = (alpha * *value + beta) / n as f64;
        }
        ranks.clone_from(&next);
        debug!(round, "katz round complete");
    }

    finish("katz", graph, ranks, traverser)
}

/// Outward accessibility with the default walk length.
pub fn outward_accessibility<T: Traverser + ?Sized>(graph: &Graph, traverser: &mut T) -> Vec<f64> {
    outward_accessibility_with_config(graph, &CentralityConfig::default(), traverser)
}

/// Mean of each node's accessibility over walk lengths
/// `1..=accessibility_max_walk`.
///
/// Travençolo & Costa, "Accessibility in complex networks",
/// Physics Letters A.
pub fn outward_accessibility_with_config<T: Traverser + ?Sized>(
    graph: &Graph,
    config: &CentralityConfig,
    traverser: &mut T,
) -> Vec<f64> {
    let ranks: Vec<f64> = (0..graph.len())
        .map(|v| mean(&graph.node_accessibilities(v, config.accessibility_max_walk)))
        .collect();

    finish("accessibility", graph, ranks, traverser)
}

fn finish<T: Traverser + ?Sized>(
    algorithm: &str,
    graph: &Graph,
    ranks: Vec<f64>,
    traverser: &mut T,
) -> Vec<f64> {
    traverser.record_ranks(&ranks);
    log_ranks(algorithm, graph, &ranks);
    ranks
}
