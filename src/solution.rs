//! Tour representation and move evaluation.
//!
//! A tour is an open path over location indices (no return leg to the start).
//! Costs are cached and invalidated on mutation; 2-opt move deltas are
//! evaluated in constant time from the two boundary edges, which is valid
//! because both matrices are symmetric and service time is order-invariant.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::OptimizeError;
use crate::instance::RoutingInstance;

/// Cost of a complete tour: kilometers traveled and estimated route minutes
/// (travel time plus the on-site service time of every visited stop).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TourCost {
    pub distance_km: f64,
    pub time_minutes: f64,
}

impl TourCost {
    pub const ZERO: TourCost = TourCost {
        distance_km: 0.0,
        time_minutes: 0.0,
    };
}

/// Cost change of a candidate move, split by objective component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveDelta {
    pub distance_km: f64,
    pub time_minutes: f64,
}

impl MoveDelta {
    pub const ZERO: MoveDelta = MoveDelta {
        distance_km: 0.0,
        time_minutes: 0.0,
    };

    /// True when either component failed to evaluate to a finite number.
    pub fn is_degenerate(&self) -> bool {
        !self.distance_km.is_finite() || !self.time_minutes.is_finite()
    }
}

/// Linear weighting of distance against time, the scalar objective every
/// driver minimizes. Each driver carries its own default profile; a
/// request-level override replaces all of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub distance: f64,
    pub time: f64,
}

impl ObjectiveWeights {
    pub const fn new(distance: f64, time: f64) -> Self {
        ObjectiveWeights { distance, time }
    }

    #[inline]
    pub fn evaluate(&self, cost: &TourCost) -> f64 {
        self.distance * cost.distance_km + self.time * cost.time_minutes
    }

    #[inline]
    pub fn evaluate_delta(&self, delta: &MoveDelta) -> f64 {
        self.distance * delta.distance_km + self.time * delta.time_minutes
    }

    /// Weights must be finite, non-negative and not both zero.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        let mut problems = Vec::new();
        if !self.distance.is_finite() || self.distance < 0.0 {
            problems.push(format!("weights.distance {} must be finite and >= 0", self.distance));
        }
        if !self.time.is_finite() || self.time < 0.0 {
            problems.push(format!("weights.time {} must be finite and >= 0", self.time));
        }
        if problems.is_empty() && self.distance == 0.0 && self.time == 0.0 {
            problems.push("weights must not both be zero".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(OptimizeError::ConstraintValidation { problems })
        }
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights::new(1.0, 0.0)
    }
}

/// A visiting order over all location indices of an instance.
///
/// Position 0 is the route start (the depot when one is present) and every
/// operator leaves it in place. The cached cost is dropped whenever the order
/// mutates and recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    order: Vec<usize>,
    #[serde(skip)]
    cached: Option<TourCost>,
}

impl Tour {
    pub fn new(order: Vec<usize>) -> Self {
        Tour { order, cached: None }
    }

    /// The identity tour 0, 1, .., n-1.
    pub fn identity(n: usize) -> Self {
        Tour::new((0..n).collect())
    }

    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn into_order(self) -> Vec<usize> {
        self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check that the order visits 0..n exactly once with position 0 fixed.
    pub fn is_permutation_of(&self, n: usize) -> bool {
        if self.order.len() != n {
            return false;
        }
        if n > 0 && self.order[0] != 0 {
            return false;
        }
        let unique: HashSet<usize> = self.order.iter().cloned().collect();
        unique.len() == n && self.order.iter().all(|&i| i < n)
    }

    /// Recompute the open-path cost from scratch.
    pub fn compute_cost(&self, instance: &RoutingInstance) -> TourCost {
        let mut distance_km = 0.0;
        let mut travel_minutes = 0.0;
        for pair in self.order.windows(2) {
            distance_km += instance.distance(pair[0], pair[1]);
            travel_minutes += instance.travel_time(pair[0], pair[1]);
        }
        let service_minutes: f64 = self.order.iter().map(|&i| instance.service_minutes(i)).sum();

        TourCost {
            distance_km,
            time_minutes: travel_minutes + service_minutes,
        }
    }

    /// Cached cost, recomputed only after a mutation.
    pub fn cost(&mut self, instance: &RoutingInstance) -> TourCost {
        match self.cached {
            Some(cost) => cost,
            None => {
                let cost = self.compute_cost(instance);
                self.cached = Some(cost);
                cost
            }
        }
    }

    /// Reverse the slice `order[start..=end]` in place, dropping the cached cost.
    pub fn reverse_segment(&mut self, start: usize, end: usize) {
        self.order[start..=end].reverse();
        self.cached = None;
    }

    /// Cost change of reversing `order[i+1..=j]`, in O(1).
    ///
    /// Only the boundary edges `(order[i], order[i+1])` and
    /// `(order[j], order[j+1])` change; the reversed interior keeps its edge
    /// sum under a symmetric matrix, and the final edge is absent when
    /// `j` is the last position (open path).
    pub fn two_opt_delta(&self, instance: &RoutingInstance, i: usize, j: usize) -> MoveDelta {
        let n = self.order.len();
        if i >= j || j >= n {
            return MoveDelta::ZERO;
        }

        let a = self.order[i];
        let b = self.order[i + 1];
        let c = self.order[j];

        let mut distance_km = instance.distance(a, c) - instance.distance(a, b);
        let mut time_minutes = instance.travel_time(a, c) - instance.travel_time(a, b);

        if j + 1 < n {
            let d = self.order[j + 1];
            distance_km += instance.distance(b, d) - instance.distance(c, d);
            time_minutes += instance.travel_time(b, d) - instance.travel_time(c, d);
        }

        MoveDelta {
            distance_km,
            time_minutes,
        }
    }

    /// Apply the 2-opt move evaluated by [`Tour::two_opt_delta`].
    pub fn apply_two_opt(&mut self, i: usize, j: usize) {
        self.reverse_segment(i + 1, j);
    }
}
