//! Local search improvement on tours.
//!
//! 2-opt is the single neighborhood every driver shares: reverse a segment,
//! keep the move only if it strictly lowers the weighted objective. The scan
//! never touches position 0, so the route start stays pinned.

use crate::heuristics::SearchBudget;
use crate::instance::RoutingInstance;
use crate::solution::{ObjectiveWeights, Tour};

/// Trait for improvement methods that polish an existing tour in place.
pub trait LocalSearch {
    fn improve(
        &self,
        instance: &RoutingInstance,
        tour: &mut Tour,
        weights: &ObjectiveWeights,
        budget: &SearchBudget,
    ) -> bool;

    fn name(&self) -> &str;
}

/// What one full 2-opt scan did.
#[derive(Debug, Clone, Copy)]
pub struct PassOutcome {
    pub improved: bool,
    /// The deadline fired mid-scan and the pass stopped early.
    pub interrupted: bool,
}

/// First-improvement 2-opt.
///
/// Scans all pairs `i < j`, applying every reversal of `order[i+1..=j]` whose
/// weighted delta is strictly negative, and repeats passes until a full pass
/// finds nothing, the pass cap is hit, or the deadline fires. The final cost
/// is never worse than the starting cost.
pub struct TwoOptSearch {
    pub max_passes: usize,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch { max_passes: 1000 }
    }

    /// Cheap polish with a small pass cap, used inside other drivers.
    pub fn limited(max_passes: usize) -> Self {
        TwoOptSearch { max_passes }
    }

    /// One full scan over all pairs, applying improving moves immediately.
    /// The deadline is checked on every scan row so long passes stay
    /// interruptible.
    pub fn scan_pass(
        &self,
        instance: &RoutingInstance,
        tour: &mut Tour,
        weights: &ObjectiveWeights,
        budget: &SearchBudget,
    ) -> PassOutcome {
        let n = tour.len();
        let mut improved = false;

        for i in 0..n.saturating_sub(2) {
            if budget.deadline_passed() {
                return PassOutcome {
                    improved,
                    interrupted: true,
                };
            }
            for j in (i + 2)..n {
                let delta = tour.two_opt_delta(instance, i, j);
                if delta.is_degenerate() {
                    continue;
                }
                if weights.evaluate_delta(&delta) < -1e-9 {
                    tour.apply_two_opt(i, j);
                    improved = true;
                }
            }
        }

        PassOutcome {
            improved,
            interrupted: false,
        }
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(
        &self,
        instance: &RoutingInstance,
        tour: &mut Tour,
        weights: &ObjectiveWeights,
        budget: &SearchBudget,
    ) -> bool {
        if tour.len() < 3 {
            return false;
        }

        let mut total_improved = false;
        for _ in 0..self.max_passes {
            let outcome = self.scan_pass(instance, tour, weights, budget);
            total_improved |= outcome.improved;
            if outcome.interrupted || !outcome.improved {
                break;
            }
        }

        total_improved
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}
