//! Simulated-annealing driver.
//!
//! Classic Metropolis scheme over random 2-opt reversals: improving moves are
//! always taken, worsening ones with probability `exp(-delta / T)` under a
//! geometrically cooled temperature that clamps at a floor. Starts from a
//! time-focused nearest-neighbor tour.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::OptimizeError;
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighbor};
use crate::heuristics::{
    ensure_startable, Metaheuristic, SearchContext, SearchOutcome, TracePoint,
};
use crate::instance::RoutingInstance;
use crate::solution::ObjectiveWeights;

const TRACE_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    pub final_temperature: f64,
    pub cooling_rate: f64,
    pub max_iterations: usize,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temperature: 2000.0,
            final_temperature: 1.0,
            cooling_rate: 0.995,
            max_iterations: 5000,
        }
    }
}

pub struct SimulatedAnnealing {
    pub config: AnnealingConfig,
}

impl SimulatedAnnealing {
    /// Balanced profile leaning toward distance, per the annealing objective.
    pub const DEFAULT_WEIGHTS: ObjectiveWeights = ObjectiveWeights::new(0.6, 0.4);

    pub fn new() -> Self {
        SimulatedAnnealing {
            config: AnnealingConfig::default(),
        }
    }

    pub fn with_config(config: AnnealingConfig) -> Self {
        SimulatedAnnealing { config }
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl Metaheuristic for SimulatedAnnealing {
    fn name(&self) -> &'static str {
        "simulated-annealing"
    }

    fn run(
        &self,
        instance: &RoutingInstance,
        ctx: &SearchContext,
    ) -> Result<SearchOutcome, OptimizeError> {
        ensure_startable(instance, ctx)?;

        let n = instance.len();
        let mut rng = ChaCha8Rng::seed_from_u64(ctx.seed);

        let mut current = NearestNeighbor::time_focused().construct(instance);
        let mut current_obj = ctx.weights.evaluate(&current.cost(instance));
        let mut best = current.clone();
        let mut best_obj = current_obj;

        let mut trace = vec![TracePoint {
            iteration: 0,
            objective: best_obj,
        }];

        // two locations admit no 2-opt move; the constructed tour is final
        if n < 3 {
            return Ok(SearchOutcome {
                tour: best,
                trace,
                iterations: 0,
                acceptance_rate: Some(0.0),
                completed: true,
            });
        }

        let mut temperature = self.config.initial_temperature;
        let mut accepted = 0usize;
        let mut iterations = 0usize;
        let mut completed = true;

        for iter in 0..self.config.max_iterations {
            if ctx.budget.exhausted(iter) {
                completed = false;
                break;
            }
            iterations = iter + 1;

            let i = rng.gen_range(0..n - 2);
            let j = rng.gen_range(i + 2..n);
            let delta = current.two_opt_delta(instance, i, j);

            if !delta.is_degenerate() {
                let d = ctx.weights.evaluate_delta(&delta);
                let accept = d < 0.0 || rng.gen::<f64>() < (-d / temperature).exp();

                if accept {
                    current.apply_two_opt(i, j);
                    current_obj += d;
                    accepted += 1;

                    if current_obj < best_obj - 1e-9 {
                        best = current.clone();
                        best_obj = current_obj;
                    }
                }
            }

            temperature = (temperature * self.config.cooling_rate)
                .max(self.config.final_temperature);

            if iterations % TRACE_INTERVAL == 0 {
                trace.push(TracePoint {
                    iteration: iterations,
                    objective: best_obj,
                });
            }
        }

        if trace.last().map_or(true, |p| p.iteration != iterations) {
            trace.push(TracePoint {
                iteration: iterations,
                objective: best_obj,
            });
        }

        let acceptance_rate = accepted as f64 / iterations.max(1) as f64;
        log::debug!(
            "annealing: {} iterations, acceptance {:.3}, objective {:.3}",
            iterations,
            acceptance_rate,
            best_obj
        );

        Ok(SearchOutcome {
            tour: best,
            trace,
            iterations,
            acceptance_rate: Some(acceptance_rate),
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
        SearchContext::new(SimulatedAnnealing::DEFAULT_WEIGHTS, budget, seed)
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let driver = SimulatedAnnealing::new();

        let a = driver.run(&inst, &context(7, SearchBudget::UNLIMITED)).unwrap();
        let b = driver.run(&inst, &context(7, SearchBudget::UNLIMITED)).unwrap();

        assert_eq!(a.tour.order(), b.tour.order());
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.acceptance_rate, b.acceptance_rate);
    }

    #[test]
    fn test_never_returns_worse_than_start() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let start = NearestNeighbor::time_focused().construct(&inst);
        let start_obj =
            SimulatedAnnealing::DEFAULT_WEIGHTS.evaluate(&start.compute_cost(&inst));

        let outcome = SimulatedAnnealing::new()
            .run(&inst, &context(3, SearchBudget::UNLIMITED))
            .unwrap();
        let final_obj =
            SimulatedAnnealing::DEFAULT_WEIGHTS.evaluate(&outcome.tour.compute_cost(&inst));

        assert!(final_obj <= start_obj + 1e-6);
        assert!(outcome.tour.is_permutation_of(8));
    }

    #[test]
    fn test_reports_acceptance_rate() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let outcome = SimulatedAnnealing::new()
            .run(&inst, &context(11, SearchBudget::UNLIMITED))
            .unwrap();

        let rate = outcome.acceptance_rate.unwrap();
        assert!((0.0..=1.0).contains(&rate));
        assert!(outcome.completed);
        assert_eq!(outcome.iterations, 5000);
    }

    #[test]
    fn test_iteration_budget_truncates() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let budget = SearchBudget {
            max_iterations: Some(10),
            deadline: None,
        };

        let outcome = SimulatedAnnealing::new().run(&inst, &context(5, budget)).unwrap();

        assert!(!outcome.completed);
        assert_eq!(outcome.iterations, 10);
        assert!(outcome.tour.is_permutation_of(8));
    }

    #[test]
    fn test_trace_is_monotone_nonincreasing() {
        let stops = scattered_stops();
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let outcome = SimulatedAnnealing::new()
            .run(&inst, &context(13, SearchBudget::UNLIMITED))
            .unwrap();

        for pair in outcome.trace.windows(2) {
            assert!(pair[1].objective <= pair[0].objective + 1e-9);
        }
    }
}
