//! Evolutionary route search.
//!
//! A small genetic algorithm over open-path tours: tournament selection,
//! order crossover that keeps the start location fixed, inversion mutation
//! and elite carry-over. One generation counts as one iteration against the
//! search budget.

use std::collections::HashSet;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::OptimizeError;
use crate::heuristics::construction::{ConstructionHeuristic, FarthestInsertion, NearestNeighbor};
use crate::heuristics::{
    ensure_startable, Metaheuristic, SearchContext, SearchOutcome, TracePoint,
};
use crate::instance::RoutingInstance;
use crate::solution::{ObjectiveWeights, Tour};

#[derive(Debug, Clone)]
pub struct EvolutionaryConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub mutation_rate: f64,
    pub elite_count: usize,
    pub tournament_size: usize,
    /// Generations without improvement before the search gives up.
    pub stagnation_patience: usize,
}

impl Default for EvolutionaryConfig {
    fn default() -> Self {
        EvolutionaryConfig {
            population_size: 60,
            max_generations: 250,
            mutation_rate: 0.15,
            elite_count: 2,
            tournament_size: 3,
            stagnation_patience: 60,
        }
    }
}

/// A candidate tour with its cached weighted objective.
#[derive(Debug, Clone)]
struct Individual {
    tour: Tour,
    objective: f64,
}

impl Individual {
    fn new(mut tour: Tour, instance: &RoutingInstance, weights: &ObjectiveWeights) -> Self {
        let objective = weights.evaluate(&tour.cost(instance));
        Individual { tour, objective }
    }
}

/// Uniform random open path: position 0 stays, the rest is shuffled.
fn random_tour(n: usize, rng: &mut ChaCha8Rng) -> Tour {
    let mut order: Vec<usize> = (0..n).collect();
    order[1..].shuffle(rng);
    Tour::new(order)
}

fn tournament_select<'a>(
    population: &'a [Individual],
    size: usize,
    rng: &mut ChaCha8Rng,
) -> &'a Individual {
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..size {
        let candidate = &population[rng.gen_range(0..population.len())];
        if candidate.objective < best.objective {
            best = candidate;
        }
    }
    best
}

/// Order crossover (OX). A segment of `parent1` is kept in place and the
/// remaining locations fill in following their order in `parent2`. Both
/// parents hold the start location at position 0, so the child does too.
fn order_crossover(parent1: &[usize], parent2: &[usize], rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = parent1.len();
    if n < 4 {
        return parent1.to_vec();
    }

    let start = rng.gen_range(1..n - 1);
    let end = rng.gen_range(start + 1..n);

    let mut child = vec![usize::MAX; n];
    child[0] = 0;
    child[start..=end].copy_from_slice(&parent1[start..=end]);

    let kept: HashSet<usize> = parent1[start..=end].iter().copied().collect();
    let mut donors = parent2
        .iter()
        .filter(|&&stop| stop != 0 && !kept.contains(&stop))
        .copied();

    for slot in child.iter_mut().skip(1) {
        if *slot == usize::MAX {
            if let Some(stop) = donors.next() {
                *slot = stop;
            }
        }
    }

    child
}

/// Inversion mutation: reverse a random interior segment.
fn invert_segment(tour: &mut Tour, rng: &mut ChaCha8Rng) {
    let n = tour.len();
    if n < 4 {
        return;
    }
    let i = rng.gen_range(1..n - 1);
    let j = rng.gen_range(i + 1..n);
    tour.reverse_segment(i, j);
}

/// Genetic-algorithm driver.
#[derive(Debug, Clone)]
pub struct EvolutionarySearch {
    config: EvolutionaryConfig,
}

impl EvolutionarySearch {
    pub const DEFAULT_WEIGHTS: ObjectiveWeights = ObjectiveWeights::new(0.5, 0.3);

    pub fn new() -> Self {
        EvolutionarySearch {
            config: EvolutionaryConfig::default(),
        }
    }

    pub fn with_config(config: EvolutionaryConfig) -> Self {
        EvolutionarySearch { config }
    }

    /// Seed the population from the construction heuristics first, then
    /// randomized nearest-neighbor variants, then uniform random tours.
    fn initial_population(
        &self,
        instance: &RoutingInstance,
        weights: &ObjectiveWeights,
        seed: u64,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Individual> {
        let size = self.config.population_size.max(2);
        let mut population = Vec::with_capacity(size + 2);

        population.push(Individual::new(
            NearestNeighbor::new().construct(instance),
            instance,
            weights,
        ));
        population.push(Individual::new(
            FarthestInsertion::new().construct(instance),
            instance,
            weights,
        ));

        for k in 0..size / 3 {
            let tour = NearestNeighbor::randomized(seed.wrapping_add(k as u64 + 1))
                .construct(instance);
            population.push(Individual::new(tour, instance, weights));
        }

        while population.len() < size {
            population.push(Individual::new(
                random_tour(instance.len(), rng),
                instance,
                weights,
            ));
        }

        population.sort_by_key(|ind| OrderedFloat(ind.objective));
        population.truncate(size);
        population
    }
}

impl Default for EvolutionarySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Metaheuristic for EvolutionarySearch {
    fn name(&self) -> &'static str {
        "evolutionary"
    }

    fn run(
        &self,
        instance: &RoutingInstance,
        ctx: &SearchContext,
    ) -> Result<SearchOutcome, OptimizeError> {
        ensure_startable(instance, ctx)?;

        let n = instance.len();
        let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);

        let mut population = self.initial_population(instance, &ctx.weights, ctx.seed, &mut rng);
        let mut best = population[0].tour.clone();
        let mut best_obj = population[0].objective;

        let mut trace = vec![TracePoint {
            iteration: 0,
            objective: best_obj,
        }];

        // two locations admit a single open path; nothing to evolve
        if n < 3 {
            return Ok(SearchOutcome {
                tour: best,
                trace,
                iterations: 0,
                acceptance_rate: None,
                completed: true,
            });
        }

        let mut generations = 0usize;
        let mut stagnant = 0usize;
        let mut completed = true;

        for generation in 0..self.config.max_generations {
            if ctx.budget.exhausted(generation) {
                completed = false;
                break;
            }
            generations = generation + 1;

            let mut next: Vec<Individual> = population
                .iter()
                .take(self.config.elite_count)
                .cloned()
                .collect();

            while next.len() < population.len() {
                let parent1 = tournament_select(&population, self.config.tournament_size, &mut rng);
                let parent2 = tournament_select(&population, self.config.tournament_size, &mut rng);

                let order = order_crossover(parent1.tour.order(), parent2.tour.order(), &mut rng);
                let mut child = Tour::new(order);
                if rng.gen::<f64>() < self.config.mutation_rate {
                    invert_segment(&mut child, &mut rng);
                }
                next.push(Individual::new(child, instance, &ctx.weights));
            }

            next.sort_by_key(|ind| OrderedFloat(ind.objective));
            population = next;

            if population[0].objective < best_obj - 1e-9 {
                best = population[0].tour.clone();
                best_obj = population[0].objective;
                stagnant = 0;
            } else {
                stagnant += 1;
            }

            trace.push(TracePoint {
                iteration: generations,
                objective: best_obj,
            });

            if stagnant >= self.config.stagnation_patience {
                break;
            }
        }

        log::debug!(
            "evolutionary: {} generations, objective {:.3}",
            generations,
            best_obj
        );

        Ok(SearchOutcome {
            tour: best,
            trace,
            iterations: generations,
            acceptance_rate: None,
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::SearchBudget;
    use crate::instance::Stop;

    fn scattered_stops() -> Vec<Stop> {
        vec![
            Stop::new("blr", 12.9716, 77.5946),
            Stop::new("maa", 13.0827, 80.2707),
            Stop::new("hyd", 17.3850, 78.4867),
            Stop::new("bom", 19.0760, 72.8777),
            Stop::new("del", 28.6139, 77.2090),
            Stop::new("ccu", 22.5726, 88.3639),
            Stop::new("pnq", 18.5204, 73.8567),
            Stop::new("jai", 26.9124, 75.7873),
        ]
    }

    fn context(seed: u64, budget: SearchBudget) -> SearchContext {
        SearchContext::new(EvolutionarySearch::DEFAULT_WEIGHTS, budget, seed)
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let driver = EvolutionarySearch::new();

        let a = driver.run(&inst, &context(7, SearchBudget::UNLIMITED)).unwrap();
        let b = driver.run(&inst, &context(7, SearchBudget::UNLIMITED)).unwrap();

        assert_eq!(a.tour.order(), b.tour.order());
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_never_worse_than_construction_seeds() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let weights = EvolutionarySearch::DEFAULT_WEIGHTS;

        let nn = weights.evaluate(&NearestNeighbor::new().construct(&inst).compute_cost(&inst));
        let fi = weights.evaluate(&FarthestInsertion::new().construct(&inst).compute_cost(&inst));

        let outcome = EvolutionarySearch::new()
            .run(&inst, &context(3, SearchBudget::UNLIMITED))
            .unwrap();
        let final_obj = weights.evaluate(&outcome.tour.compute_cost(&inst));

        assert!(final_obj <= nn.min(fi) + 1e-6);
        assert!(outcome.tour.is_permutation_of(8));
    }

    #[test]
    fn test_single_generation_budget_still_yields_route() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let budget = SearchBudget {
            max_iterations: Some(1),
            deadline: None,
        };

        let outcome = EvolutionarySearch::new().run(&inst, &context(5, budget)).unwrap();

        assert!(!outcome.completed);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.tour.is_permutation_of(8));
    }

    #[test]
    fn test_stagnation_stops_early() {
        let stops = vec![
            Stop::new("a", 12.90, 77.50),
            Stop::new("b", 12.95, 77.55),
            Stop::new("c", 13.00, 77.60),
            Stop::new("d", 13.05, 77.65),
            Stop::new("e", 13.10, 77.70),
        ];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let driver = EvolutionarySearch::with_config(EvolutionaryConfig {
            stagnation_patience: 3,
            ..EvolutionaryConfig::default()
        });

        let outcome = driver.run(&inst, &context(9, SearchBudget::UNLIMITED)).unwrap();

        assert!(outcome.completed);
        assert!(outcome.iterations < 250);
        assert!(outcome.tour.is_permutation_of(5));
    }

    #[test]
    fn test_order_crossover_preserves_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let p1 = vec![0, 3, 1, 5, 2, 4, 6, 7];
        let p2 = vec![0, 7, 6, 5, 4, 3, 2, 1];

        for _ in 0..50 {
            let child = Tour::new(order_crossover(&p1, &p2, &mut rng));
            assert!(child.is_permutation_of(8));
        }
    }
}
