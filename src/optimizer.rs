//! Optimization orchestration.
//!
//! Validates a request, builds the routing instance once, dispatches to the
//! selected driver (or to all four in parallel for a comparison) and packages
//! each outcome with route ids, final costs, the convergence trace and a
//! constraint report.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;
use crate::heuristics::annealing::SimulatedAnnealing;
use crate::heuristics::classical::ClassicalSearch;
use crate::heuristics::evolutionary::EvolutionarySearch;
use crate::heuristics::variational::VariationalSearch;
use crate::heuristics::{Metaheuristic, SearchBudget, SearchContext, TracePoint};
use crate::instance::{Depot, RoutingInstance, Stop, DEFAULT_SPEED_KMH};
use crate::solution::ObjectiveWeights;

/// Valid algorithm names, in the fixed comparison order.
pub const ALGORITHM_NAMES: [&str; 4] = [
    "classical",
    "simulated-annealing",
    "evolutionary",
    "qaoa-inspired",
];

/// The four supported search drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Classical,
    SimulatedAnnealing,
    Evolutionary,
    QaoaInspired,
}

impl Algorithm {
    /// Fixed order used by comparisons and reports.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Classical,
        Algorithm::SimulatedAnnealing,
        Algorithm::Evolutionary,
        Algorithm::QaoaInspired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Classical => "classical",
            Algorithm::SimulatedAnnealing => "simulated-annealing",
            Algorithm::Evolutionary => "evolutionary",
            Algorithm::QaoaInspired => "qaoa-inspired",
        }
    }

    fn driver(&self) -> Box<dyn Metaheuristic> {
        match self {
            Algorithm::Classical => Box::new(ClassicalSearch::new()),
            Algorithm::SimulatedAnnealing => Box::new(SimulatedAnnealing::new()),
            Algorithm::Evolutionary => Box::new(EvolutionarySearch::new()),
            Algorithm::QaoaInspired => Box::new(VariationalSearch::new()),
        }
    }

    /// Objective profile applied when the request carries no explicit weights.
    pub fn default_weights(&self) -> ObjectiveWeights {
        match self {
            Algorithm::Classical => ClassicalSearch::DEFAULT_WEIGHTS,
            Algorithm::SimulatedAnnealing => SimulatedAnnealing::DEFAULT_WEIGHTS,
            Algorithm::Evolutionary => EvolutionarySearch::DEFAULT_WEIGHTS,
            Algorithm::QaoaInspired => VariationalSearch::DEFAULT_WEIGHTS,
        }
    }

    /// Per-driver seed offset, so the four searches explore independently
    /// while one request seed reproduces the whole comparison.
    fn seed_for(&self, base: u64) -> u64 {
        let discriminant = match self {
            Algorithm::Classical => 1u64,
            Algorithm::SimulatedAnnealing => 2,
            Algorithm::Evolutionary => 3,
            Algorithm::QaoaInspired => 4,
        };
        base ^ discriminant.wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classical" => Ok(Algorithm::Classical),
            "simulated-annealing" => Ok(Algorithm::SimulatedAnnealing),
            "evolutionary" => Ok(Algorithm::Evolutionary),
            "qaoa-inspired" => Ok(Algorithm::QaoaInspired),
            other => Err(OptimizeError::UnknownAlgorithm {
                name: other.to_string(),
            }),
        }
    }
}

/// Fleet-level restrictions checked against the optimized route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    /// Carrying capacity per vehicle, in demand units.
    #[serde(default)]
    pub vehicle_capacity: Option<f64>,
    /// Upper bound on a single route, in minutes.
    #[serde(default)]
    pub max_route_minutes: Option<f64>,
    #[serde(default = "default_fleet_size")]
    pub fleet_size: usize,
}

fn default_fleet_size() -> usize {
    1
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            vehicle_capacity: None,
            max_route_minutes: None,
            fleet_size: 1,
        }
    }
}

impl Constraints {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(capacity) = self.vehicle_capacity {
            if !capacity.is_finite() || capacity <= 0.0 {
                problems.push(format!("vehicle_capacity must be > 0, got {}", capacity));
            }
        }
        if let Some(minutes) = self.max_route_minutes {
            if !minutes.is_finite() || minutes <= 0.0 {
                problems.push(format!("max_route_minutes must be > 0, got {}", minutes));
            }
        }
        if self.fleet_size == 0 {
            problems.push("fleet_size must be >= 1".to_string());
        }
        problems
    }

    pub fn validate(&self) -> Result<(), OptimizeError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(OptimizeError::ConstraintValidation { problems })
        }
    }
}

/// One optimization call. Stops are borrowed from the caller and never copied.
#[derive(Debug, Clone)]
pub struct OptimizationRequest<'a> {
    pub stops: &'a [Stop],
    pub depot: Option<Depot>,
    pub constraints: Constraints,
    pub algorithm: Algorithm,
    /// Fixed seed for reproducible runs; a random one is drawn when absent.
    pub seed: Option<u64>,
    pub iteration_budget: Option<usize>,
    pub time_limit: Option<Duration>,
    /// Overrides every driver's default objective profile when present.
    pub weights: Option<ObjectiveWeights>,
    pub average_speed_kmh: f64,
}

impl<'a> OptimizationRequest<'a> {
    pub fn new(stops: &'a [Stop], algorithm: Algorithm) -> Self {
        OptimizationRequest {
            stops,
            depot: None,
            constraints: Constraints::default(),
            algorithm,
            seed: None,
            iteration_budget: None,
            time_limit: None,
            weights: None,
            average_speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

/// Whether a single vehicle can drive the optimized route as built.
/// Splitting demand across the fleet is [`OptimizationResult::vehicle_estimate`]'s job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConstraintReport {
    /// Total demand fits one vehicle's capacity.
    pub capacity_ok: bool,
    /// Route time is within the max-route-minutes bound.
    pub max_time_ok: bool,
}

impl ConstraintReport {
    fn evaluate(constraints: &Constraints, total_demand: f64, time_minutes: f64) -> Self {
        ConstraintReport {
            capacity_ok: constraints
                .vehicle_capacity
                .map_or(true, |capacity| total_demand <= capacity + 1e-9),
            max_time_ok: constraints
                .max_route_minutes
                .map_or(true, |minutes| time_minutes <= minutes + 1e-9),
        }
    }
}

/// Outcome of one driver run, translated back to caller identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Algorithm that produced the route
    pub algorithm: Algorithm,
    /// Visiting sequence as stop ids; a depot reports as "depot".
    pub route_order: Vec<String>,
    /// Route distance in kilometers
    pub distance_km: f64,
    /// Route time in minutes, service included
    pub time_minutes: f64,
    /// Weighted objective under the weights the driver actually used.
    pub objective: f64,
    /// Vehicles needed to carry the total demand
    pub vehicle_estimate: usize,
    /// Best objective per recorded iteration
    pub trace: Vec<TracePoint>,
    /// Request-level seed the run can be reproduced from.
    pub seed: u64,
    /// Feasibility summary for the route
    pub constraints: ConstraintReport,
    /// Whether the search finished within its budget
    pub completed: bool,
    /// Driver iterations performed
    pub iterations: usize,
    /// Proposal acceptance rate, simulated annealing only
    pub acceptance_rate: Option<f64>,
    /// Wall-clock time in seconds
    pub elapsed_seconds: f64,
}

/// All four drivers on one request, in [`Algorithm::ALL`] order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub results: Vec<OptimizationResult>,
    pub best_by_distance: Algorithm,
    pub best_by_time: Algorithm,
    pub generated_at: String,
}

/// Checked before any matrix is built: location count, per-stop fields,
/// constraint values, then an explicit weight override if present.
fn validate(request: &OptimizationRequest) -> Result<(), OptimizeError> {
    let found = request.stops.len() + usize::from(request.depot.is_some());
    if found < 2 {
        return Err(OptimizeError::InsufficientStops { found });
    }

    for stop in request.stops {
        stop.validate()?;
    }
    if let Some(depot) = &request.depot {
        depot.validate()?;
    }

    let mut problems = request.constraints.problems();
    if !request.average_speed_kmh.is_finite() || request.average_speed_kmh <= 0.0 {
        problems.push(format!(
            "average_speed_kmh must be > 0, got {}",
            request.average_speed_kmh
        ));
    }
    if !problems.is_empty() {
        return Err(OptimizeError::ConstraintValidation { problems });
    }

    if let Some(weights) = &request.weights {
        weights.validate()?;
    }

    Ok(())
}

/// Vehicles needed to carry the total demand, clamped to the fleet bound.
fn vehicle_estimate(total_demand: f64, constraints: &Constraints) -> usize {
    match constraints.vehicle_capacity {
        Some(capacity) if capacity > 0.0 => {
            let needed = (total_demand / capacity).ceil() as usize;
            needed.clamp(1, constraints.fleet_size.max(1))
        }
        _ => 1,
    }
}

fn budget_for(request: &OptimizationRequest, started: Instant) -> SearchBudget {
    SearchBudget {
        max_iterations: request.iteration_budget,
        deadline: request.time_limit.map(|limit| started + limit),
    }
}

fn run_driver(
    instance: &RoutingInstance,
    algorithm: Algorithm,
    ctx: &SearchContext,
    reported_seed: u64,
    constraints: &Constraints,
) -> Result<OptimizationResult, OptimizeError> {
    let driver = algorithm.driver();

    let started = Instant::now();
    let outcome = driver.run(instance, ctx)?;
    let elapsed_seconds = started.elapsed().as_secs_f64();

    // final figures come from a fresh recomputation, not the search cache
    let cost = outcome.tour.compute_cost(instance);
    let route_order = outcome
        .tour
        .order()
        .iter()
        .map(|&index| instance.stop_id(index).to_string())
        .collect();

    log::info!(
        "{}: {:.2} km, {:.1} min, {} iterations in {:.2}s{}",
        algorithm,
        cost.distance_km,
        cost.time_minutes,
        outcome.iterations,
        elapsed_seconds,
        if outcome.completed { "" } else { " (truncated)" }
    );

    Ok(OptimizationResult {
        algorithm,
        route_order,
        distance_km: cost.distance_km,
        time_minutes: cost.time_minutes,
        objective: ctx.weights.evaluate(&cost),
        vehicle_estimate: vehicle_estimate(instance.total_demand(), constraints),
        trace: outcome.trace,
        seed: reported_seed,
        constraints: ConstraintReport::evaluate(constraints, instance.total_demand(), cost.time_minutes),
        completed: outcome.completed,
        iterations: outcome.iterations,
        acceptance_rate: outcome.acceptance_rate,
        elapsed_seconds,
    })
}

/// Run the requested driver and package its result.
pub fn optimize(request: &OptimizationRequest) -> Result<OptimizationResult, OptimizeError> {
    validate(request)?;

    let instance = RoutingInstance::new(request.stops, request.depot, request.average_speed_kmh)?;
    let base_seed = request.seed.unwrap_or_else(rand::random);
    let started = Instant::now();
    let budget = budget_for(request, started);
    let weights = request
        .weights
        .unwrap_or_else(|| request.algorithm.default_weights());
    let ctx = SearchContext::new(weights, budget, request.algorithm.seed_for(base_seed));

    log::info!(
        "optimizing {} locations with {} (seed {})",
        instance.len(),
        request.algorithm,
        base_seed
    );

    run_driver(&instance, request.algorithm, &ctx, base_seed, &request.constraints)
}

/// Run all four drivers on one shared instance, in parallel, and summarize.
///
/// The drivers read the same matrices and each owns a private tour, so they
/// run as independent rayon tasks. Result order follows [`Algorithm::ALL`]
/// regardless of which task finishes first.
pub fn compare_all(request: &OptimizationRequest) -> Result<ComparisonReport, OptimizeError> {
    validate(request)?;

    let instance = RoutingInstance::new(request.stops, request.depot, request.average_speed_kmh)?;
    let base_seed = request.seed.unwrap_or_else(rand::random);
    let started = Instant::now();
    let budget = budget_for(request, started);

    log::info!(
        "comparing all {} algorithms on {} locations (seed {})",
        Algorithm::ALL.len(),
        instance.len(),
        base_seed
    );

    let results: Vec<OptimizationResult> = Algorithm::ALL
        .par_iter()
        .map(|&algorithm| {
            let weights = request
                .weights
                .unwrap_or_else(|| algorithm.default_weights());
            let ctx = SearchContext::new(weights, budget, algorithm.seed_for(base_seed));
            run_driver(&instance, algorithm, &ctx, base_seed, &request.constraints)
        })
        .collect::<Result<_, _>>()?;

    let best_by_distance = results
        .iter()
        .min_by_key(|result| OrderedFloat(result.distance_km))
        .map(|result| result.algorithm)
        .unwrap_or(Algorithm::Classical);
    let best_by_time = results
        .iter()
        .min_by_key(|result| OrderedFloat(result.time_minutes))
        .map(|result| result.algorithm)
        .unwrap_or(Algorithm::Classical);

    Ok(ComparisonReport {
        results,
        best_by_distance,
        best_by_time,
        generated_at: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery_stops() -> Vec<Stop> {
        vec![
            Stop::new("blr", 12.9716, 77.5946),
            Stop::new("maa", 13.0827, 80.2707),
            Stop::new("hyd", 17.3850, 78.4867),
            Stop::new("bom", 19.0760, 72.8777),
            Stop::new("del", 28.6139, 77.2090),
            Stop::new("jai", 26.9124, 75.7873),
        ]
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for name in ALGORITHM_NAMES {
            let algorithm: Algorithm = name.parse().unwrap();
            assert_eq!(algorithm.as_str(), name);
        }
        assert!(matches!(
            "quantum".parse::<Algorithm>(),
            Err(OptimizeError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn test_single_stop_rejected_before_any_work() {
        let stops = vec![Stop::new("only", 12.9716, 77.5946)];
        let request = OptimizationRequest::new(&stops, Algorithm::Classical);

        match optimize(&request) {
            Err(OptimizeError::InsufficientStops { found }) => assert_eq!(found, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_depot_counts_as_location() {
        let stops = vec![Stop::new("only", 12.9716, 77.5946)];
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.depot = Some(Depot::new(12.9, 77.6));

        let result = optimize(&request).unwrap();
        assert_eq!(result.route_order[0], "depot");
        assert_eq!(result.route_order.len(), 2);
    }

    #[test]
    fn test_constraint_validation_lists_every_problem() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.constraints = Constraints {
            vehicle_capacity: Some(-5.0),
            max_route_minutes: Some(0.0),
            fleet_size: 0,
        };

        match optimize(&request) {
            Err(OptimizeError::ConstraintValidation { problems }) => {
                assert_eq!(problems.len(), 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_optimize_is_reproducible_from_reported_seed() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::SimulatedAnnealing);
        request.seed = Some(99);

        let a = optimize(&request).unwrap();
        request.seed = Some(a.seed);
        let b = optimize(&request).unwrap();

        assert_eq!(a.seed, 99);
        assert_eq!(a.route_order, b.route_order);
        assert_eq!(a.trace, b.trace);
        assert_eq!(a.objective, b.objective);
    }

    #[test]
    fn test_compare_all_keeps_fixed_order_and_same_stop_set() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.seed = Some(7);

        let report = compare_all(&request).unwrap();

        assert_eq!(report.results.len(), 4);
        for (result, algorithm) in report.results.iter().zip(Algorithm::ALL) {
            assert_eq!(result.algorithm, algorithm);

            let mut ids = result.route_order.clone();
            ids.sort();
            let mut expected: Vec<String> = stops.iter().map(|s| s.id.clone()).collect();
            expected.sort();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn test_compare_all_bests_match_results() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.seed = Some(21);

        let report = compare_all(&request).unwrap();

        let min_distance = report
            .results
            .iter()
            .map(|r| r.distance_km)
            .fold(f64::INFINITY, f64::min);
        let min_time = report
            .results
            .iter()
            .map(|r| r.time_minutes)
            .fold(f64::INFINITY, f64::min);

        let by_distance = report
            .results
            .iter()
            .find(|r| r.algorithm == report.best_by_distance)
            .unwrap();
        let by_time = report
            .results
            .iter()
            .find(|r| r.algorithm == report.best_by_time)
            .unwrap();

        assert_eq!(by_distance.distance_km, min_distance);
        assert_eq!(by_time.time_minutes, min_time);
    }

    #[test]
    fn test_compare_all_matches_single_runs() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Evolutionary);
        request.seed = Some(5);

        let report = compare_all(&request).unwrap();
        let single = optimize(&request).unwrap();

        let from_comparison = report
            .results
            .iter()
            .find(|r| r.algorithm == Algorithm::Evolutionary)
            .unwrap();
        assert_eq!(from_comparison.route_order, single.route_order);
        assert_eq!(from_comparison.objective, single.objective);
    }

    #[test]
    fn test_vehicle_estimate_from_demand() {
        let mut stops = delivery_stops();
        for (i, stop) in stops.iter_mut().enumerate() {
            stop.demand = Some(if i == 0 { 10.0 } else { 5.0 });
        }
        // total demand 35, capacity 10, fleet 5 -> 4 vehicles
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.constraints = Constraints {
            vehicle_capacity: Some(10.0),
            max_route_minutes: None,
            fleet_size: 5,
        };

        let result = optimize(&request).unwrap();
        assert_eq!(result.vehicle_estimate, 4);
        assert!(!result.constraints.capacity_ok);
    }

    #[test]
    fn test_capacity_report_ignores_fleet_size() {
        let mut stops = delivery_stops();
        for (i, stop) in stops.iter_mut().enumerate() {
            stop.demand = Some(if i == 0 { 10.0 } else { 5.0 });
        }
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);

        // 35 units overload one 10-unit vehicle no matter how large the fleet is
        request.constraints = Constraints {
            vehicle_capacity: Some(10.0),
            max_route_minutes: None,
            fleet_size: 5,
        };
        let result = optimize(&request).unwrap();
        assert!(!result.constraints.capacity_ok);

        // one vehicle that fits the whole demand reports ok even with fleet 1
        request.constraints = Constraints {
            vehicle_capacity: Some(35.0),
            max_route_minutes: None,
            fleet_size: 1,
        };
        let result = optimize(&request).unwrap();
        assert!(result.constraints.capacity_ok);
        assert_eq!(result.vehicle_estimate, 1);
    }

    #[test]
    fn test_constraint_report_flags_time_violation() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.constraints = Constraints {
            vehicle_capacity: Some(100.0),
            max_route_minutes: Some(1.0),
            fleet_size: 1,
        };

        let result = optimize(&request).unwrap();
        assert!(result.constraints.capacity_ok);
        assert!(!result.constraints.max_time_ok);
    }

    #[test]
    fn test_weight_override_changes_objective() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
        request.weights = Some(ObjectiveWeights::new(0.0, 1.0));

        let result = optimize(&request).unwrap();
        assert!((result.objective - result.time_minutes).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_deadline_raises_timeout() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::SimulatedAnnealing);
        request.time_limit = Some(Duration::ZERO);

        assert!(matches!(optimize(&request), Err(OptimizeError::Timeout)));
    }

    #[test]
    fn test_iteration_budget_marks_truncation() {
        let stops = delivery_stops();
        let mut request = OptimizationRequest::new(&stops, Algorithm::SimulatedAnnealing);
        request.seed = Some(2);
        request.iteration_budget = Some(50);

        let result = optimize(&request).unwrap();
        assert!(!result.completed);
        assert_eq!(result.iterations, 50);
        assert_eq!(result.route_order.len(), stops.len());
    }
}
