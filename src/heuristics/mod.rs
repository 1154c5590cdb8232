//! Search drivers and the contract they share.
//!
//! Every optimizer implements [`Metaheuristic`]: given a routing instance and
//! a search context (resolved objective weights, budget, seed) it returns its
//! best tour together with a convergence trace. Drivers draw randomness only
//! from a `ChaCha8Rng` seeded from the context, so a fixed seed reproduces
//! tours and traces exactly.

pub mod annealing;
pub mod classical;
pub mod construction;
pub mod evolutionary;
pub mod local_search;
pub mod variational;

pub use annealing::*;
pub use classical::*;
pub use construction::*;
pub use evolutionary::*;
pub use local_search::*;
pub use variational::*;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;
use crate::instance::RoutingInstance;
use crate::solution::{ObjectiveWeights, Tour};

/// Iteration cap and wall-clock deadline honored inside every driver loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchBudget {
    pub max_iterations: Option<usize>,
    pub deadline: Option<Instant>,
}

impl SearchBudget {
    pub const UNLIMITED: SearchBudget = SearchBudget {
        max_iterations: None,
        deadline: None,
    };

    #[inline]
    pub fn iterations_exhausted(&self, done: usize) -> bool {
        self.max_iterations.map_or(false, |cap| done >= cap)
    }

    #[inline]
    pub fn deadline_passed(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// True once either limit is hit; checked every iteration, not per pass.
    #[inline]
    pub fn exhausted(&self, done: usize) -> bool {
        self.iterations_exhausted(done) || self.deadline_passed()
    }
}

/// Per-run inputs a driver receives from the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext {
    pub weights: ObjectiveWeights,
    pub budget: SearchBudget,
    pub seed: u64,
}

impl SearchContext {
    pub fn new(weights: ObjectiveWeights, budget: SearchBudget, seed: u64) -> Self {
        SearchContext {
            weights,
            budget,
            seed,
        }
    }
}

/// One sample of the convergence trace: best objective seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub iteration: usize,
    pub objective: f64,
}

/// What a driver hands back: its best tour, the convergence trace, and how
/// the run ended. `completed` is false when the budget or deadline cut the
/// search short of its own termination rule.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub tour: Tour,
    pub trace: Vec<TracePoint>,
    pub iterations: usize,
    pub acceptance_rate: Option<f64>,
    pub completed: bool,
}

/// A route-optimization driver.
pub trait Metaheuristic: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        instance: &RoutingInstance,
        ctx: &SearchContext,
    ) -> Result<SearchOutcome, OptimizeError>;
}

/// Common entry guard: a search needs at least two locations, and a deadline
/// that already elapsed means no complete tour can be produced at all.
pub(crate) fn ensure_startable(
    instance: &RoutingInstance,
    ctx: &SearchContext,
) -> Result<(), OptimizeError> {
    if instance.len() < 2 {
        return Err(OptimizeError::InsufficientStops {
            found: instance.len(),
        });
    }
    if ctx.budget.deadline_passed() {
        return Err(OptimizeError::Timeout);
    }
    Ok(())
}
