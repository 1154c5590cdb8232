//! Deterministic baseline driver: nearest-neighbor construction followed by
//! 2-opt descent to a local optimum.

use crate::error::OptimizeError;
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighbor};
use crate::heuristics::local_search::TwoOptSearch;
use crate::heuristics::{
    ensure_startable, Metaheuristic, SearchContext, SearchOutcome, TracePoint,
};
use crate::instance::RoutingInstance;
use crate::solution::ObjectiveWeights;

/// Greedy construction plus strict-improvement 2-opt. Runs the same way every
/// time regardless of seed; one trace point per completed pass.
pub struct ClassicalSearch {
    pub max_passes: usize,
}

impl ClassicalSearch {
    /// Pure distance: the baseline optimizes kilometers only.
    pub const DEFAULT_WEIGHTS: ObjectiveWeights = ObjectiveWeights::new(1.0, 0.0);

    pub fn new() -> Self {
        ClassicalSearch { max_passes: 1000 }
    }
}

impl Default for ClassicalSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Metaheuristic for ClassicalSearch {
    fn name(&self) -> &'static str {
        "classical"
    }

    fn run(
        &self,
        instance: &RoutingInstance,
        ctx: &SearchContext,
    ) -> Result<SearchOutcome, OptimizeError> {
        ensure_startable(instance, ctx)?;

        let two_opt = TwoOptSearch::new();
        let mut tour = NearestNeighbor::new().construct(instance);
        let mut trace = vec![TracePoint {
            iteration: 0,
            objective: ctx.weights.evaluate(&tour.cost(instance)),
        }];

        let mut passes = 0;
        let mut completed = true;

        while passes < self.max_passes {
            if ctx.budget.exhausted(passes) {
                completed = false;
                break;
            }

            let outcome = two_opt.scan_pass(instance, &mut tour, &ctx.weights, &ctx.budget);
            passes += 1;
            trace.push(TracePoint {
                iteration: passes,
                objective: ctx.weights.evaluate(&tour.cost(instance)),
            });

            if outcome.interrupted {
                completed = false;
                break;
            }
            if !outcome.improved {
                break;
            }
        }

        log::debug!(
            "classical: {} passes, objective {:.3}",
            passes,
            ctx.weights.evaluate(&tour.cost(instance))
        );

        Ok(SearchOutcome {
            tour,
            trace,
            iterations: passes,
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

    fn context() -> SearchContext {
        SearchContext::new(
            ClassicalSearch::DEFAULT_WEIGHTS,
            SearchBudget::UNLIMITED,
            42,
        )
    }

    #[test]
    fn test_solves_square_to_perimeter_order() {
        let stops = vec![
            Stop::new("sw", 0.0, 0.0),
            Stop::new("nw", 1.0, 0.0),
            Stop::new("ne", 1.0, 1.0),
            Stop::new("se", 0.0, 1.0),
        ];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let outcome = ClassicalSearch::new().run(&inst, &context()).unwrap();

        assert!(outcome.completed);
        assert_eq!(outcome.tour.order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_rejects_single_location() {
        let stops = vec![Stop::new("only", 0.0, 0.0)];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let err = ClassicalSearch::new().run(&inst, &context()).unwrap_err();
        assert_eq!(err, OptimizeError::InsufficientStops { found: 1 });
    }

    #[test]
    fn test_zero_iteration_budget_still_returns_a_route() {
        let stops = vec![
            Stop::new("a", 0.0, 0.0),
            Stop::new("b", 0.0, 1.0),
            Stop::new("c", 1.0, 1.0),
        ];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let ctx = SearchContext::new(
            ClassicalSearch::DEFAULT_WEIGHTS,
            SearchBudget {
                max_iterations: Some(0),
                deadline: None,
            },
            42,
        );

        let outcome = ClassicalSearch::new().run(&inst, &ctx).unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.tour.is_permutation_of(3));
    }

    #[test]
    fn test_is_deterministic() {
        let stops = vec![
            Stop::new("a", 12.9716, 77.5946),
            Stop::new("b", 13.0827, 80.2707),
            Stop::new("c", 17.3850, 78.4867),
            Stop::new("d", 19.0760, 72.8777),
        ];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        let first = ClassicalSearch::new().run(&inst, &context()).unwrap();
        let second = ClassicalSearch::new().run(&inst, &context()).unwrap();

        assert_eq!(first.tour.order(), second.tour.order());
        assert_eq!(first.trace, second.trace);
    }
}
