//! Benchmark harness for comparing the four drivers over repeated seeded runs.
//!
//! Used by the CLI `compare` subcommand: every algorithm is run `num_runs`
//! times with seeds `base_seed..base_seed + num_runs`, per-run records and
//! per-algorithm aggregates can be exported as CSV, and a fixed-width text
//! report summarizes the comparison.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::OptimizeError;
use crate::instance::{Depot, Stop};
use crate::optimizer::{self, Algorithm, Constraints, OptimizationRequest};

/// One driver run under one seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Algorithm name
    pub algorithm: String,
    /// Run index within the benchmark
    pub run: usize,
    /// Seed the run used
    pub seed: u64,
    /// Route distance in kilometers
    pub distance_km: f64,
    /// Route time in minutes
    pub time_minutes: f64,
    /// Weighted objective
    pub objective: f64,
    /// Driver iterations performed
    pub iterations: usize,
    /// Whether the run finished within its budget
    pub completed: bool,
    /// Wall-clock time in seconds
    pub elapsed_seconds: f64,
}

/// Aggregates over all runs of one algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of runs aggregated
    pub runs: usize,
    /// Mean route distance
    pub mean_distance_km: f64,
    /// Best route distance
    pub best_distance_km: f64,
    /// Worst route distance
    pub worst_distance_km: f64,
    /// Sample standard deviation of distance
    pub std_distance_km: f64,
    /// Mean route time
    pub mean_time_minutes: f64,
    /// Mean wall-clock time in seconds
    pub mean_elapsed_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Seeded runs per algorithm.
    pub num_runs: usize,
    pub base_seed: u64,
    pub iteration_budget: Option<usize>,
    pub time_limit: Option<Duration>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            base_seed: 42,
            iteration_budget: None,
            time_limit: None,
        }
    }
}

/// Benchmarking engine.
pub struct Benchmark {
    config: BenchmarkConfig,
    records: Vec<RunRecord>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            records: Vec::new(),
        }
    }

    /// Total runs a full benchmark performs, for progress reporting.
    pub fn total_runs(&self) -> usize {
        Algorithm::ALL.len() * self.config.num_runs
    }

    /// Run the complete benchmark: every algorithm, every seed.
    pub fn run(
        &mut self,
        stops: &[Stop],
        depot: Option<Depot>,
        constraints: &Constraints,
    ) -> Result<(), OptimizeError> {
        for algorithm in Algorithm::ALL {
            log::info!(
                "benchmarking {} over {} seeded runs",
                algorithm,
                self.config.num_runs
            );
            for run in 0..self.config.num_runs {
                self.run_one(stops, depot, constraints, algorithm, run)?;
            }
        }
        Ok(())
    }

    /// Run one algorithm under one seed and record the outcome.
    pub fn run_one(
        &mut self,
        stops: &[Stop],
        depot: Option<Depot>,
        constraints: &Constraints,
        algorithm: Algorithm,
        run: usize,
    ) -> Result<(), OptimizeError> {
        let mut request = OptimizationRequest::new(stops, algorithm);
        request.depot = depot;
        request.constraints = constraints.clone();
        request.seed = Some(self.config.base_seed + run as u64);
        request.iteration_budget = self.config.iteration_budget;
        request.time_limit = self.config.time_limit;

        let result = optimizer::optimize(&request)?;
        self.records.push(RunRecord {
            algorithm: algorithm.as_str().to_string(),
            run,
            seed: result.seed,
            distance_km: result.distance_km,
            time_minutes: result.time_minutes,
            objective: result.objective,
            iterations: result.iterations,
            completed: result.completed,
            elapsed_seconds: result.elapsed_seconds,
        });

        Ok(())
    }

    /// Per-algorithm aggregates, best mean distance first.
    pub fn statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut grouped: HashMap<&str, Vec<&RunRecord>> = HashMap::new();
        for record in &self.records {
            grouped
                .entry(record.algorithm.as_str())
                .or_default()
                .push(record);
        }

        let mut statistics: Vec<AlgorithmStatistics> = grouped
            .into_iter()
            .map(|(algorithm, records)| {
                let distances: Vec<f64> = records.iter().map(|r| r.distance_km).collect();
                let minutes: Vec<f64> = records.iter().map(|r| r.time_minutes).collect();
                let elapsed: Vec<f64> = records.iter().map(|r| r.elapsed_seconds).collect();

                // sample std dev needs two runs
                let std_distance_km = if distances.len() > 1 {
                    (&distances).std_dev()
                } else {
                    0.0
                };

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    runs: records.len(),
                    mean_distance_km: (&distances).mean(),
                    best_distance_km: distances.iter().copied().fold(f64::INFINITY, f64::min),
                    worst_distance_km: distances.iter().copied().fold(0.0, f64::max),
                    std_distance_km,
                    mean_time_minutes: (&minutes).mean(),
                    mean_elapsed_seconds: (&elapsed).mean(),
                }
            })
            .collect();

        statistics.sort_by_key(|stat| OrderedFloat(stat.mean_distance_km));
        statistics
    }

    /// Export every run record to CSV.
    pub fn export_records_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export per-algorithm statistics to CSV.
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Fixed-width summary table.
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("    Route Optimization Benchmark\n");
        report.push_str("========================================\n\n");

        let stats = self.statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(92).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<22} {:>6} {:>12} {:>12} {:>10} {:>12} {:>10}\n",
            "Algorithm", "Runs", "Mean km", "Best km", "Std km", "Mean min", "Mean s"
        ));
        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        for stat in &stats {
            report.push_str(&format!(
                "{:<22} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>12.1} {:>10.4}\n",
                stat.algorithm,
                stat.runs,
                stat.mean_distance_km,
                stat.best_distance_km,
                stat.std_distance_km,
                stat.mean_time_minutes,
                stat.mean_elapsed_seconds
            ));
        }

        report.push_str("-".repeat(92).as_str());
        report.push('\n');

        if let Some(best) = self
            .records
            .iter()
            .min_by_key(|record| OrderedFloat(record.distance_km))
        {
            report.push_str(&format!(
                "\nBest route: {:.2} km ({}, seed {})\n",
                best.distance_km, best.algorithm, best.seed
            ));
        }

        report
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_stops() -> Vec<Stop> {
        vec![
            Stop::new("blr", 12.9716, 77.5946),
            Stop::new("maa", 13.0827, 80.2707),
            Stop::new("hyd", 17.3850, 78.4867),
            Stop::new("bom", 19.0760, 72.8777),
        ]
    }

    fn quick_config() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 2,
            base_seed: 7,
            iteration_budget: Some(50),
            time_limit: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.base_seed, 42);
    }

    #[test]
    fn test_benchmark_records_every_run() {
        let stops = small_stops();
        let mut bench = Benchmark::new(quick_config());
        bench.run(&stops, None, &Constraints::default()).unwrap();

        assert_eq!(bench.records().len(), bench.total_runs());

        let stats = bench.statistics();
        assert_eq!(stats.len(), 4);
        for stat in &stats {
            assert_eq!(stat.runs, 2);
            assert!(stat.best_distance_km <= stat.mean_distance_km + 1e-9);
            assert!(stat.mean_distance_km <= stat.worst_distance_km + 1e-9);
        }
    }

    #[test]
    fn test_report_names_every_algorithm() {
        let stops = small_stops();
        let mut bench = Benchmark::new(quick_config());
        bench.run(&stops, None, &Constraints::default()).unwrap();

        let report = bench.generate_report();
        assert!(report.contains("classical"));
        assert!(report.contains("simulated-annealing"));
        assert!(report.contains("evolutionary"));
        assert!(report.contains("qaoa-inspired"));
        assert!(report.contains("Best route"));
    }

    #[test]
    fn test_seeds_advance_from_base() {
        let stops = small_stops();
        let mut bench = Benchmark::new(quick_config());
        bench
            .run_one(&stops, None, &Constraints::default(), Algorithm::Classical, 1)
            .unwrap();

        assert_eq!(bench.records()[0].seed, 8);
    }
}
