//! Quantum Route Solver Library
//!
//! A delivery-route optimization engine: nearest-neighbor construction and
//! 2-opt local search wrapped by four quantum-inspired metaheuristic drivers.
//!
//! # Features
//!
//! - Haversine distance model with derived travel-time matrices
//! - Construction heuristics (Nearest Neighbor, Farthest Insertion)
//! - 2-opt local search with constant-time move evaluation
//! - Four drivers: classical, simulated annealing, evolutionary, QAOA-inspired
//! - Parallel compare-all orchestration with seeded, reproducible runs
//! - Benchmarking over repeated seeded runs with CSV export
//!
//! # Example
//!
//! ```no_run
//! use quantum_route_solver::instance::Stop;
//! use quantum_route_solver::optimizer::{self, Algorithm, OptimizationRequest};
//!
//! let stops = vec![
//!     Stop::new("warehouse", 12.9716, 77.5946),
//!     Stop::new("customer-1", 13.0827, 80.2707),
//!     Stop::new("customer-2", 17.3850, 78.4867),
//! ];
//!
//! let mut request = OptimizationRequest::new(&stops, Algorithm::SimulatedAnnealing);
//! request.seed = Some(42);
//!
//! let result = optimizer::optimize(&request).unwrap();
//! println!("{:.2} km in {:.0} min: {:?}", result.distance_km, result.time_minutes, result.route_order);
//! ```

pub mod benchmark;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod optimizer;
pub mod solution;

pub use error::OptimizeError;
pub use instance::{Depot, RoutingInstance, Stop};
pub use optimizer::{Algorithm, ComparisonReport, OptimizationRequest, OptimizationResult};
pub use solution::Tour;
