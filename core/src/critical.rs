//! Critical-edge search.
//!
//! Looks for the set of hypothetical THEORETICAL connections whose addition
//! most improves a centrality-derived score, using the genetic algorithm in
//! [`crate::evolution`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::centrality::{closeness_centrality, page_rank_with_config};
use crate::config::{CentralityConfig, EngineConfig, FitnessMetric};
use crate::edge::{Edge, EdgeList};
use crate::error::{Error, Result};
use crate::evolution::{Population, PopulationConfig, Problem};
use crate::graph::Graph;
use crate::stats::{mean, st_dev};

/// Mean closeness of the graph with `solution` added.
pub fn fitness_by_closeness(graph: &Graph, solution: &EdgeList) -> Result<f64> {
    let hypothetical = graph.create_new_graph_with_edges(solution)?;
    hypothetical.calculate_path_lengths();
    Ok(mean(&closeness_centrality(&hypothetical, &mut ())))
}

/// Inverse spread of PageRank over the graph with `solution` added.
///
/// A perfectly even ranking scores `f64::MAX`.
pub fn fitness_by_page_rank_spread(
    graph: &Graph,
    solution: &EdgeList,
    config: &CentralityConfig,
) -> Result<f64> {
    let hypothetical = graph.create_new_graph_with_edges(solution)?;
    let spread = st_dev(&page_rank_with_config(&hypothetical, config, &mut ()));
    Ok(if spread > 0.0 { 1.0 / spread } else { f64::MAX })
}

/// Move one endpoint of one randomly chosen edge to a random node.
///
/// # Errors
///
/// `Error::Precondition` for an empty candidate list, `Error::TooFewNodes`
/// for an empty graph.
pub fn mutate_solution<R: Rng + ?Sized>(
    graph: &Graph,
    solution: &mut EdgeList,
    rng: &mut R,
) -> Result<()> {
    if solution.is_empty() {
        return Err(Error::precondition("cannot mutate an empty edge list"));
    }
    if graph.is_empty() {
        return Err(Error::TooFewNodes {
            needed: 1,
            found: 0,
        });
    }

    let index = rng.gen_range(0..solution.len());
    let node = rng.gen_range(0..graph.len());
    let move_origin = rng.gen_bool(0.5);

    let slot = solution
        .get_mut(index)
        .ok_or_else(|| Error::precondition(format!("no edge at position {}", index)))?;
    *slot = if move_origin {
        Edge {
            origin: node,
            ..*slot
        }
    } else {
        Edge {
            destination: node,
            ..*slot
        }
    };
    Ok(())
}

/// Candidate THEORETICAL edge sets over one graph.
pub struct CriticalEdgeProblem<'g> {
    graph: &'g Graph,
    edges_per_solution: usize,
    metric: FitnessMetric,
    centrality: CentralityConfig,
}

impl<'g> CriticalEdgeProblem<'g> {
    pub fn new(graph: &'g Graph, edges_per_solution: usize, config: &EngineConfig) -> Self {
        Self {
            graph,
            edges_per_solution,
            metric: config.search.fitness,
            centrality: config.centrality.clone(),
        }
    }
}

impl Problem for CriticalEdgeProblem<'_> {
    type Solution = EdgeList;

    fn create_solution<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<EdgeList> {
        (0..self.edges_per_solution)
            .map(|_| self.graph.create_random_edge(rng))
            .collect()
    }

    fn fitness(&self, solution: &EdgeList) -> Result<f64> {
        match self.metric {
            FitnessMetric::Closeness => fitness_by_closeness(self.graph, solution),
            FitnessMetric::PageRankSpread => {
                fitness_by_page_rank_spread(self.graph, solution, &self.centrality)
            }
        }
    }

    fn mutate<R: Rng + ?Sized>(&self, solution: &mut EdgeList, rng: &mut R) -> Result<()> {
        mutate_solution(self.graph, solution, rng)
    }
}

/// Search for `num_routes` new connections with the default settings.
pub fn find_critical_edges(graph: &Graph, num_routes: usize) -> Result<Graph> {
    find_critical_edges_with_config(graph, num_routes, &EngineConfig::default())
}

/// Evolve candidate edge sets and return `graph` with the best one added.
///
/// # Errors
///
/// `Error::Precondition` when `num_routes` is 0, `Error::TooFewNodes` for
/// graphs under two nodes, `Error::Config` for invalid settings.
pub fn find_critical_edges_with_config(
    graph: &Graph,
    num_routes: usize,
    config: &EngineConfig,
) -> Result<Graph> {
    config.validate()?;
    if num_routes == 0 {
        return Err(Error::precondition("critical-edge search needs at least one route"));
    }
    if graph.len() < 2 {
        return Err(Error::TooFewNodes {
            needed: 2,
            found: graph.len(),
        });
    }

    let graph = graph
        .clone()
        .with_theoretical_edge_weight(config.theoretical_edge_weight);
    let rng = match config.search.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let problem = CriticalEdgeProblem::new(&graph, num_routes, config);
    let mut population = Population::new(
        problem,
        PopulationConfig {
            mutation_rate: config.search.mutation_rate,
            population_size: config.search.population_size,
        },
        rng,
    )?;
    population.run_generations(config.search.generations)?;

    let best = population
        .best_solution()
        .ok_or_else(|| Error::precondition("population is empty"))?;
    info!(
        num_routes,
        generations = config.search.generations,
        best_fitness = ?population.best_fitness(),
        "critical edge search complete"
    );
    graph.create_new_graph_with_edges(best)
}
