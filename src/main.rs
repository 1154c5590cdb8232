//! Quantum Route Solver - Command Line Interface
//!
//! Delivery route optimization with classical and quantum-inspired metaheuristics.

use clap::{Parser, Subcommand, ValueEnum};
use quantum_route_solver::benchmark::{Benchmark, BenchmarkConfig};
use quantum_route_solver::heuristics::construction::{ConstructionHeuristic, NearestNeighbor};
use quantum_route_solver::instance::{Depot, RoutingInstance, Stop};
use quantum_route_solver::optimizer::{
    self, Algorithm, ComparisonReport, Constraints, OptimizationRequest, OptimizationResult,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "quantum-route-solver")]
#[command(version = "1.0")]
#[command(about = "Delivery route optimization with classical and quantum-inspired metaheuristics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize the visiting order of a stop list
    Solve {
        /// Path to the stops file (JSON array of stop objects)
        #[arg(short, long)]
        stops: PathBuf,

        /// Route start point as "lat,lng"
        #[arg(short, long)]
        depot: Option<String>,

        /// Algorithm to run
        #[arg(short, long, value_enum, default_value = "all")]
        algorithm: AlgorithmChoice,

        /// Random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration cap applied to the search loop
        #[arg(long)]
        iteration_budget: Option<usize>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Vehicle capacity in demand units
        #[arg(long)]
        capacity: Option<f64>,

        /// Number of vehicles available
        #[arg(long, default_value = "1")]
        fleet: usize,

        /// Upper bound on route duration in minutes
        #[arg(long)]
        max_route_minutes: Option<f64>,

        /// Average travel speed in km/h
        #[arg(long, default_value = "50")]
        speed: f64,

        /// Output result to file as pretty JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Benchmark every algorithm over repeated seeded runs
    Compare {
        /// Path to the stops file (JSON array of stop objects)
        #[arg(short, long)]
        stops: PathBuf,

        /// Route start point as "lat,lng"
        #[arg(short, long)]
        depot: Option<String>,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Base seed; run k uses seed base + k
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Iteration cap per run
        #[arg(long)]
        iteration_budget: Option<usize>,

        /// Time limit per run in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output CSV file for per-run records
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output CSV file for per-algorithm statistics
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Analyze a stop list
    Analyze {
        /// Path to the stops file (JSON array of stop objects)
        #[arg(short, long)]
        stops: PathBuf,

        /// Route start point as "lat,lng"
        #[arg(short, long)]
        depot: Option<String>,

        /// Average travel speed in km/h
        #[arg(long, default_value = "50")]
        speed: f64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum AlgorithmChoice {
    /// Nearest neighbor construction plus exhaustive 2-opt
    Classical,
    /// Metropolis annealing over random 2-opt moves
    SimulatedAnnealing,
    /// Genetic search with order crossover and inversion mutation
    Evolutionary,
    /// QAOA-inspired variational search
    QaoaInspired,
    /// Run all four drivers in parallel and compare
    All,
}

impl AlgorithmChoice {
    fn algorithm(self) -> Option<Algorithm> {
        match self {
            AlgorithmChoice::Classical => Some(Algorithm::Classical),
            AlgorithmChoice::SimulatedAnnealing => Some(Algorithm::SimulatedAnnealing),
            AlgorithmChoice::Evolutionary => Some(Algorithm::Evolutionary),
            AlgorithmChoice::QaoaInspired => Some(Algorithm::QaoaInspired),
            AlgorithmChoice::All => None,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            stops,
            depot,
            algorithm,
            seed,
            iteration_budget,
            time_limit,
            capacity,
            fleet,
            max_route_minutes,
            speed,
            output,
            verbose,
        } => {
            solve_route(
                &stops,
                depot,
                algorithm,
                seed,
                iteration_budget,
                time_limit,
                capacity,
                fleet,
                max_route_minutes,
                speed,
                output,
                verbose,
            );
        }

        Commands::Compare {
            stops,
            depot,
            runs,
            seed,
            iteration_budget,
            time_limit,
            output,
            stats,
        } => {
            compare_algorithms(&stops, depot, runs, seed, iteration_budget, time_limit, output, stats);
        }

        Commands::Analyze { stops, depot, speed } => {
            analyze_stops(&stops, depot, speed);
        }
    }
}

fn load_stops(path: &PathBuf) -> Vec<Stop> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading {:?}: {}", path, e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&data) {
        Ok(stops) => stops,
        Err(e) => {
            eprintln!("Error parsing {:?}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn parse_depot(raw: &str) -> Depot {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() == 2 {
        if let (Ok(lat), Ok(lng)) = (parts[0].trim().parse::<f64>(), parts[1].trim().parse::<f64>()) {
            return Depot::new(lat, lng);
        }
    }
    eprintln!("Error: depot must be \"lat,lng\", got {:?}", raw);
    std::process::exit(1);
}

fn solve_route(
    path: &PathBuf,
    depot: Option<String>,
    algorithm: AlgorithmChoice,
    seed: Option<u64>,
    iteration_budget: Option<usize>,
    time_limit: Option<f64>,
    capacity: Option<f64>,
    fleet: usize,
    max_route_minutes: Option<f64>,
    speed: f64,
    output: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading stops from {:?}...", path);
    let stops = load_stops(path);
    let depot = depot.as_deref().map(parse_depot);

    let mut request = OptimizationRequest::new(
        &stops,
        algorithm.algorithm().unwrap_or(Algorithm::Classical),
    );
    request.depot = depot;
    request.constraints = Constraints {
        vehicle_capacity: capacity,
        max_route_minutes,
        fleet_size: fleet,
    };
    request.seed = seed;
    request.iteration_budget = iteration_budget;
    request.time_limit = time_limit.map(Duration::from_secs_f64);
    request.average_speed_kmh = speed;

    match algorithm.algorithm() {
        Some(selected) => {
            println!("Solving with {} algorithm...", selected);

            let result = match optimizer::optimize(&request) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            print_result(&result, verbose);

            if let Some(out_path) = output {
                let json =
                    serde_json::to_string_pretty(&result).expect("Failed to serialize result");
                std::fs::write(&out_path, json).expect("Failed to write output");
                println!("\nResult saved to {:?}", out_path);
            }
        }

        None => {
            println!("Comparing all algorithms...");

            let report = match optimizer::compare_all(&request) {
                Ok(report) => report,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            print_comparison(&report, verbose);

            if let Some(out_path) = output {
                let json =
                    serde_json::to_string_pretty(&report).expect("Failed to serialize report");
                std::fs::write(&out_path, json).expect("Failed to write output");
                println!("\nReport saved to {:?}", out_path);
            }
        }
    }
}

fn print_result(result: &OptimizationResult, verbose: bool) {
    println!("\n========== Results ==========");
    println!("Algorithm: {}", result.algorithm);
    println!("Distance: {:.2} km", result.distance_km);
    println!("Route time: {:.1} min", result.time_minutes);
    println!("Objective: {:.3}", result.objective);
    println!("Vehicles needed: {}", result.vehicle_estimate);
    println!("Capacity ok: {}", result.constraints.capacity_ok);
    println!("Route time ok: {}", result.constraints.max_time_ok);
    println!(
        "Iterations: {}{}",
        result.iterations,
        if result.completed { "" } else { " (budget hit)" }
    );
    if let Some(rate) = result.acceptance_rate {
        println!("Acceptance rate: {:.1}%", rate * 100.0);
    }
    println!("Seed: {}", result.seed);
    println!("Time: {:.4}s", result.elapsed_seconds);

    if verbose {
        println!("\nRoute: {}", result.route_order.join(" -> "));
        println!("\nConvergence trace:");
        for point in &result.trace {
            println!("  iter {:>6}  objective {:.3}", point.iteration, point.objective);
        }
    }
}

fn print_comparison(report: &ComparisonReport, verbose: bool) {
    println!("\n========== Comparison ==========");
    println!(
        "{:<22} {:>12} {:>12} {:>12} {:>8} {:>10}",
        "Algorithm", "Distance km", "Time min", "Objective", "Iters", "Elapsed"
    );
    println!("{}", "-".repeat(82));

    for result in &report.results {
        println!(
            "{:<22} {:>12.2} {:>12.1} {:>12.3} {:>8} {:>9.3}s",
            result.algorithm.as_str(),
            result.distance_km,
            result.time_minutes,
            result.objective,
            result.iterations,
            result.elapsed_seconds
        );
    }

    println!();
    println!("Best by distance: {}", report.best_by_distance);
    println!("Best by time: {}", report.best_by_time);
    println!("Generated at: {}", report.generated_at);

    if verbose {
        println!();
        for result in &report.results {
            println!("{}: {}", result.algorithm, result.route_order.join(" -> "));
        }
    }
}

fn compare_algorithms(
    path: &PathBuf,
    depot: Option<String>,
    runs: usize,
    seed: u64,
    iteration_budget: Option<usize>,
    time_limit: Option<f64>,
    output: Option<PathBuf>,
    stats: Option<PathBuf>,
) {
    println!("Loading stops from {:?}...", path);
    let stops = load_stops(path);
    let depot = depot.as_deref().map(parse_depot);
    let constraints = Constraints::default();

    println!(
        "Benchmarking {} algorithms, {} runs each (seeds {}..{})...\n",
        Algorithm::ALL.len(),
        runs,
        seed,
        seed + runs as u64
    );

    let config = BenchmarkConfig {
        num_runs: runs,
        base_seed: seed,
        iteration_budget,
        time_limit: time_limit.map(Duration::from_secs_f64),
    };
    let mut benchmark = Benchmark::new(config);

    let bar = ProgressBar::new(benchmark.total_runs() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("Invalid progress template"),
    );

    for algorithm in Algorithm::ALL {
        bar.set_message(algorithm.as_str());
        for run in 0..runs {
            if let Err(e) = benchmark.run_one(&stops, depot, &constraints, algorithm, run) {
                bar.finish_and_clear();
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            bar.inc(1);
        }
    }
    bar.finish_and_clear();

    println!("{}", benchmark.generate_report());

    if let Some(out_path) = output {
        benchmark
            .export_records_csv(&out_path)
            .expect("Failed to export records");
        println!("Records exported to {:?}", out_path);
    }

    if let Some(stats_path) = stats {
        benchmark
            .export_statistics_csv(&stats_path)
            .expect("Failed to export statistics");
        println!("Statistics exported to {:?}", stats_path);
    }
}

fn analyze_stops(path: &PathBuf, depot: Option<String>, speed: f64) {
    let stops = load_stops(path);
    let depot = depot.as_deref().map(parse_depot);

    let instance = match RoutingInstance::new(&stops, depot, speed) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("========== Instance Analysis ==========\n");
    print!("{}", instance.statistics());

    let windows = stops.iter().filter(|s| s.time_window.is_some()).count();
    if windows > 0 {
        println!("  Stops with time windows: {}", windows);
    }

    if instance.len() < 2 {
        return;
    }

    let mut nn_tour = NearestNeighbor::new().construct(&instance);
    let nn_cost = nn_tour.cost(&instance);

    let mut request = OptimizationRequest::new(&stops, Algorithm::Classical);
    request.depot = depot;
    request.average_speed_kmh = speed;
    request.seed = Some(0);

    let polished = match optimizer::optimize(&request) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\nQuick Route Estimates:");
    println!(
        "  Nearest neighbor: {:.2} km, {:.1} min",
        nn_cost.distance_km, nn_cost.time_minutes
    );
    println!(
        "  With 2-opt:       {:.2} km, {:.1} min",
        polished.distance_km, polished.time_minutes
    );
}
