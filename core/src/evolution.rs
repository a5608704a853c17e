//! Minimal generational genetic algorithm.
//!
//! The engine owns population management, selection and crossover; a
//! [`Problem`] supplies solution creation, fitness and mutation. Higher
//! fitness is better.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::edge::EdgeList;
use crate::error::{Error, Result};

/// A solution the engine can recombine.
pub trait Chromosome: Clone {
    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self;
}

/// Problem definition handed to [`Population`].
pub trait Problem {
    type Solution: Chromosome;

    fn create_solution<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self::Solution>;

    fn fitness(&self, solution: &Self::Solution) -> Result<f64>;

    fn mutate<R: Rng + ?Sized>(&self, solution: &mut Self::Solution, rng: &mut R) -> Result<()>;
}

/// Single-point crossover: a prefix of `self` followed by the rest of
/// `other`.
impl Chromosome for EdgeList {
    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self {
        let cut = rng.gen_range(0..=self.len());
        self.iter()
            .take(cut)
            .chain(other.iter().skip(cut))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationConfig {
    /// Percent chance (0..=100) that a bred child is mutated.
    pub mutation_rate: u32,
    pub population_size: usize,
}

#[derive(Debug, Clone)]
struct Scored<S> {
    solution: S,
    fitness: f64,
}

pub struct Population<P: Problem> {
    problem: P,
    config: PopulationConfig,
    members: Vec<Scored<P::Solution>>,
    rng: StdRng,
    generation: u32,
}

impl<P: Problem> Population<P> {
    /// Seed a population of `population_size` fresh solutions.
    ///
    /// # Errors
    ///
    /// `Error::Config` for a population under two or a mutation rate above
    /// 100; any error the problem raises while creating or scoring.
    pub fn new(problem: P, config: PopulationConfig, mut rng: StdRng) -> Result<Self> {
        if config.population_size < 2 {
            return Err(Error::config("population needs at least 2 members"));
        }
        if config.mutation_rate > 100 {
            return Err(Error::config("mutation rate is a percentage"));
        }

        let mut members = Vec::with_capacity(config.population_size);
        for _ in 0..config.population_size {
            let solution = problem.create_solution(&mut rng)?;
            let fitness = problem.fitness(&solution)?;
            members.push(Scored { solution, fitness });
        }
        sort_by_fitness(&mut members);

        Ok(Self {
            problem,
            config,
            members,
            rng,
            generation: 0,
        })
    }

    pub fn run_generations(&mut self, generations: u32) -> Result<()> {
        for _ in 0..generations {
            self.step()?;
        }
        Ok(())
    }

    /// Keep the better half, refill by crossover of random survivors, then
    /// mutate children at the configured rate.
    fn step(&mut self) -> Result<()> {
        let size = self.config.population_size;
        let elite_count = size.div_ceil(2);
        self.members.truncate(elite_count);

        while self.members.len() < size {
            let a = self.rng.gen_range(0..elite_count);
            let b = self.rng.gen_range(0..elite_count);
            let mut child = self.members[a]
                .solution
                .crossover(&self.members[b].solution, &mut self.rng);
            if self.rng.gen_range(0..100) < self.config.mutation_rate {
                self.problem.mutate(&mut child, &mut self.rng)?;
            }
            let fitness = self.problem.fitness(&child)?;
            self.members.push(Scored {
                solution: child,
                fitness,
            });
        }

        sort_by_fitness(&mut self.members);
        self.generation += 1;
        debug!(
            generation = self.generation,
            best = ?self.best_fitness(),
            "generation complete"
        );
        Ok(())
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn best_solution(&self) -> Option<&P::Solution> {
        self.members.first().map(|m| &m.solution)
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.members.first().map(|m| m.fitness)
    }
}

fn sort_by_fitness<S>(members: &mut [Scored<S>]) {
    members.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use rand::SeedableRng;

    /// Maximize the number of set bits.
    struct OneMax {
        bits: usize,
    }

    #[derive(Debug, Clone)]
    struct Bits(Vec<bool>);

    impl Chromosome for Bits {
        fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> Self {
            let cut = rng.gen_range(0..=self.0.len());
            Bits(self.0[..cut].iter().chain(&other.0[cut..]).copied().collect())
        }
    }

    impl Problem for OneMax {
        type Solution = Bits;

        fn create_solution<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Bits> {
            Ok(Bits((0..self.bits).map(|_| rng.gen_bool(0.2)).collect()))
        }

        fn fitness(&self, solution: &Bits) -> Result<f64> {
            Ok(solution.0.iter().filter(|&&b| b).count() as f64)
        }

        fn mutate<R: Rng + ?Sized>(&self, solution: &mut Bits, rng: &mut R) -> Result<()> {
            let i = rng.gen_range(0..solution.0.len());
            solution.0[i] = !solution.0[i];
            Ok(())
        }
    }

    fn config() -> PopulationConfig {
        PopulationConfig {
            mutation_rate: 40,
            population_size: 10,
        }
    }

    #[test]
    fn test_best_fitness_never_drops() {
        let mut pop =
            Population::new(OneMax { bits: 32 }, config(), StdRng::seed_from_u64(11)).unwrap();
        let mut best = pop.best_fitness().unwrap();
        for _ in 0..30 {
            pop.run_generations(1).unwrap();
            let now = pop.best_fitness().unwrap();
            assert!(now >= best);
            best = now;
        }
        assert_eq!(pop.generation(), 30);
        assert_eq!(pop.best_solution().unwrap().0.len(), 32);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let small = PopulationConfig {
            mutation_rate: 40,
            population_size: 1,
        };
        assert!(Population::new(OneMax { bits: 4 }, small, StdRng::seed_from_u64(1)).is_err());

        let rate = PopulationConfig {
            mutation_rate: 101,
            population_size: 4,
        };
        assert!(Population::new(OneMax { bits: 4 }, rate, StdRng::seed_from_u64(1)).is_err());
    }

    #[test]
    fn test_edge_list_crossover_keeps_length() {
        let a: EdgeList = (0..5).map(|i| Edge::theoretical(i, i + 1, 1.0)).collect();
        let b: EdgeList = (0..5).map(|i| Edge::theoretical(i + 10, i, 1.0)).collect();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let child = a.crossover(&b, &mut rng);
            assert_eq!(child.len(), 5);
            for (i, e) in child.iter().enumerate() {
                assert!(*e == a[i] || *e == b[i]);
            }
        }
    }
}
