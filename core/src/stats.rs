use tracing::debug;

use crate::graph::Graph;

/// How many of the highest ranks `log_ranks` prints.
const LOGGED_RANKS: usize = 5;

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty slice.
pub fn st_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Log the top-ranked stops for an algorithm at debug level.
pub fn log_ranks(algorithm: &str, graph: &Graph, ranks: &[f64]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let mut order: Vec<usize> = (0..ranks.len()).collect();
    order.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));

    for &node in order.iter().take(LOGGED_RANKS) {
        let name = graph.stop(node).map(|s| s.name.as_str()).unwrap_or("?");
        debug!(algorithm, node, stop = name, rank = ranks[node], "rank");
    }
}
