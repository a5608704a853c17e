//! transit-graph-core: In-memory transit network engine.
//!
//! A pure Rust library that stores a stop graph as a lower-triangular
//! matrix of typed, weighted edges and provides traversals, centrality
//! rankings, transfer-node contraction, and an evolutionary search for the
//! new connections that most improve the network.
//!
//! Usable standalone; the bench crate drives it on synthetic networks.

mod centrality;
mod config;
mod contraction;
mod critical;
mod edge;
mod error;
mod evolution;
mod graph;
mod path;
mod stats;
mod stop;
mod traversal;
mod traverser;

pub use centrality::{
    closeness_centrality, katz_centrality, katz_centrality_with_config, outward_accessibility,
    outward_accessibility_with_config, page_rank, page_rank_with_config,
};
pub use config::{CentralityConfig, EngineConfig, FitnessMetric, SearchConfig};
pub use contraction::{
    merge_edges, merge_transfer_nodes, merge_transfer_nodes_counted, ContractionArena, NodeKey,
};
pub use critical::{
    find_critical_edges, find_critical_edges_with_config, fitness_by_closeness,
    fitness_by_page_rank_spread, mutate_solution, CriticalEdgeProblem,
};
pub use edge::{Edge, EdgeList, EdgeType, Geometry, NodeIndex};
pub use error::{Error, Result};
pub use evolution::{Chromosome, Population, PopulationConfig, Problem};
pub use graph::{Cell, Graph, Matrix};
pub use path::Path;
pub use stats::{mean, st_dev};
pub use stop::{Route, Stop};
pub use traversal::{bfs, bfs_with_callback, connected_components, dfs};
pub use traverser::{BasicTraverser, TraversalSummary, Traverser};
