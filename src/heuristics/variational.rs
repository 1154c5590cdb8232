//! QAOA-inspired variational route search.
//!
//! Approximates the layered structure of the Quantum Approximate Optimization
//! Algorithm with a classical sampler. Each of `depth` layers carries a
//! (gamma, beta) parameter pair: gamma biases move proposals toward cutting
//! expensive edges, beta sets how willingly worsening moves are mixed in.
//! A (1+1) hill-climb adjusts the active layer's parameters between rounds.

use std::f64::consts::{FRAC_PI_2, PI};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::OptimizeError;
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighbor};
use crate::heuristics::local_search::{LocalSearch, TwoOptSearch};
use crate::heuristics::{
    ensure_startable, Metaheuristic, SearchContext, SearchOutcome, TracePoint,
};
use crate::instance::RoutingInstance;
use crate::solution::{ObjectiveWeights, Tour, TourCost};

#[derive(Debug, Clone)]
pub struct VariationalConfig {
    /// Number of (gamma, beta) layers.
    pub depth: usize,
    pub rounds: usize,
    pub samples_per_round: usize,
    pub gamma_perturbation: f64,
    pub beta_perturbation: f64,
}

impl Default for VariationalConfig {
    fn default() -> Self {
        VariationalConfig {
            depth: 4,
            rounds: 120,
            samples_per_round: 100,
            gamma_perturbation: 0.15,
            beta_perturbation: 0.10,
        }
    }
}

/// Per-layer variational parameters. Gamma lives in [0, pi], beta in
/// [0, pi/2], mirroring the angle ranges of the quantum circuit ansatz.
#[derive(Debug, Clone)]
struct LayerParameters {
    gamma: Vec<f64>,
    beta: Vec<f64>,
}

impl LayerParameters {
    /// Warm-start ramp: cost bias grows with depth, mixing shrinks.
    fn ramp(depth: usize) -> Self {
        let d = depth.max(1);
        let gamma = (0..d)
            .map(|layer| (layer + 1) as f64 / d as f64 * PI / 2.0)
            .collect();
        let beta = (0..d)
            .map(|layer| (d - layer) as f64 / d as f64 * FRAC_PI_2 / 2.0)
            .collect();
        LayerParameters { gamma, beta }
    }
}

/// Roulette pick of the first cut position, weighted by `edge_cost^gamma`.
/// Position `i` cuts the edge leaving `order[i]`; only positions that leave
/// room for a second cut qualify.
fn select_first_cut(
    tour: &Tour,
    instance: &RoutingInstance,
    weights: &ObjectiveWeights,
    gamma: f64,
    rng: &mut ChaCha8Rng,
) -> usize {
    let order = tour.order();
    let n = order.len();

    let mut cuts: Vec<(usize, f64)> = Vec::with_capacity(n - 2);
    for i in 0..n - 2 {
        let edge = TourCost {
            distance_km: instance.distance(order[i], order[i + 1]),
            time_minutes: instance.travel_time(order[i], order[i + 1]),
        };
        cuts.push((i, weights.evaluate(&edge).powf(gamma)));
    }

    let total: f64 = cuts.iter().map(|&(_, w)| w).sum();
    let mut pick = rng.gen::<f64>() * total;
    for &(i, w) in &cuts {
        pick -= w;
        if pick <= 0.0 {
            return i;
        }
    }
    cuts.last().map_or(0, |&(i, _)| i)
}

/// Variational sampling driver.
#[derive(Debug, Clone)]
pub struct VariationalSearch {
    config: VariationalConfig,
}

impl VariationalSearch {
    pub const DEFAULT_WEIGHTS: ObjectiveWeights = ObjectiveWeights::new(0.3, 0.7);

    pub fn new() -> Self {
        VariationalSearch {
            config: VariationalConfig::default(),
        }
    }

    pub fn with_config(config: VariationalConfig) -> Self {
        VariationalSearch { config }
    }
}

impl Default for VariationalSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Metaheuristic for VariationalSearch {
    fn name(&self) -> &'static str {
        "qaoa-inspired"
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
                acceptance_rate: None,
                completed: true,
            });
        }

        let depth = self.config.depth.max(1);
        let mut params = LayerParameters::ramp(depth);
        let polish = TwoOptSearch::limited(10);

        let mut rounds_run = 0usize;
        let mut completed = true;

        for round in 0..self.config.rounds {
            if ctx.budget.exhausted(round) {
                completed = false;
                break;
            }
            rounds_run = round + 1;

            let progress = round as f64 / self.config.rounds.max(1) as f64;
            let layer = round % depth;

            let mut trial = params.clone();
            let gamma_scale = self.config.gamma_perturbation * (1.0 - progress);
            let beta_scale = self.config.beta_perturbation * (1.0 - progress);
            trial.gamma[layer] = (trial.gamma[layer]
                + (rng.gen::<f64>() - 0.5) * 2.0 * gamma_scale)
                .clamp(0.0, PI);
            trial.beta[layer] = (trial.beta[layer]
                + (rng.gen::<f64>() - 0.5) * 2.0 * beta_scale)
                .clamp(0.0, FRAC_PI_2);

            let entry_best = best_obj;
            let mixing = trial.beta[layer] / FRAC_PI_2 * 0.5;

            for _ in 0..self.config.samples_per_round {
                // middle third: occasionally try a fresh randomized start
                if (1.0 / 3.0..2.0 / 3.0).contains(&progress) && rng.gen::<f64>() < 0.05 {
                    let mut fresh =
                        NearestNeighbor::randomized(rng.gen::<u64>()).construct(instance);
                    let fresh_obj = ctx.weights.evaluate(&fresh.cost(instance));
                    if fresh_obj < current_obj {
                        current = fresh;
                        current_obj = fresh_obj;
                        if current_obj < best_obj - 1e-9 {
                            best = current.clone();
                            best_obj = current_obj;
                        }
                    }
                    continue;
                }

                let i =
                    select_first_cut(&current, instance, &ctx.weights, trial.gamma[layer], &mut rng);
                let j = rng.gen_range(i + 2..n);
                let delta = current.two_opt_delta(instance, i, j);
                if delta.is_degenerate() {
                    continue;
                }

                let d = ctx.weights.evaluate_delta(&delta);
                if d < 0.0 || rng.gen::<f64>() < mixing {
                    current.apply_two_opt(i, j);
                    current_obj += d;
                    if current_obj < best_obj - 1e-9 {
                        best = current.clone();
                        best_obj = current_obj;
                    }
                }
            }

            // final third: tighten the sample with a capped 2-opt polish
            if progress >= 2.0 / 3.0 {
                polish.improve(instance, &mut current, &ctx.weights, &ctx.budget);
                current_obj = ctx.weights.evaluate(&current.cost(instance));
                if current_obj < best_obj - 1e-9 {
                    best = current.clone();
                    best_obj = current_obj;
                }
            }

            if best_obj < entry_best - 1e-9 {
                params = trial;
            }

            trace.push(TracePoint {
                iteration: rounds_run,
                objective: best_obj,
            });
        }

        log::debug!(
            "variational: {} rounds, objective {:.3}",
            rounds_run,
            best_obj
        );

        Ok(SearchOutcome {
            tour: best,
            trace,
            iterations: rounds_run,
            acceptance_rate: None,
            completed,
        })
    }
}
