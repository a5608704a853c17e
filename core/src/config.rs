//! Engine settings.
//!
//! Every knob has a default matching the fixed constants the algorithms
//! were tuned with; a TOML document may override any subset of them.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub centrality: CentralityConfig,
    pub search: SearchConfig,
    /// Weight given to randomly generated THEORETICAL edges.
    pub theoretical_edge_weight: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            centrality: CentralityConfig::default(),
            search: SearchConfig::default(),
            theoretical_edge_weight: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the document does not parse or a value is out
    /// of bounds.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.theoretical_edge_weight.is_finite() || self.theoretical_edge_weight < 0.0 {
            return Err(Error::config(format!(
                "theoretical_edge_weight must be finite and non-negative, got {}",
                self.theoretical_edge_weight
            )));
        }
        self.centrality.validate()?;
        self.search.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    pub pagerank_damping: f64,
    pub pagerank_iterations: u32,
    pub pagerank_initial_rank: f64,
    pub katz_alpha: f64,
    pub katz_beta: f64,
    pub katz_iterations: u32,
    pub katz_initial_rank: f64,
    /// Longest random walk considered by outward accessibility.
    pub accessibility_max_walk: u32,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 1.0,
            pagerank_iterations: 10,
            pagerank_initial_rank: 1.0,
            katz_alpha: 0.5,
            katz_beta: 1.0,
            katz_iterations: 30,
            katz_initial_rank: 0.0,
            accessibility_max_walk: 3,
        }
    }
}

impl CentralityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pagerank_damping) {
            return Err(Error::config(format!(
                "pagerank_damping must lie in [0, 1], got {}",
                self.pagerank_damping
            )));
        }
        if self.pagerank_iterations == 0 || self.katz_iterations == 0 {
            return Err(Error::config("iteration counts must be at least 1"));
        }
        if self.accessibility_max_walk == 0 {
            return Err(Error::config("accessibility_max_walk must be at least 1"));
        }
        Ok(())
    }
}

/// Which centrality the critical-edge search optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// Mean closeness over the hypothetical graph.
    Closeness,
    /// Inverse standard deviation of PageRank.
    PageRankSpread,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub generations: u32,
    pub population_size: usize,
    /// Percent chance (0..=100) that a bred solution is mutated.
    pub mutation_rate: u32,
    pub fitness: FitnessMetric,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            generations: 20,
            population_size: 10,
            mutation_rate: 40,
            fitness: FitnessMetric::Closeness,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(Error::config(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.mutation_rate > 100 {
            return Err(Error::config(format!(
                "mutation_rate is a percentage, got {}",
                self.mutation_rate
            )));
        }
        Ok(())
    }
}
