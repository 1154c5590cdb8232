//! Error taxonomy for request validation and optimization runs.

use std::fmt;

use crate::optimizer::ALGORITHM_NAMES;

/// Everything that can go wrong while validating a request or running a search.
///
/// Budget exhaustion is not an error: a search that runs out of iterations or
/// wall time returns its best tour with `completed = false`. `Timeout` is
/// raised only when the deadline elapsed before any complete tour existed.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// Fewer than two locations; raised before any matrix construction.
    InsufficientStops { found: usize },
    /// A stop (or the depot) carries a non-finite or out-of-range field.
    InvalidStop { id: String, detail: String },
    /// One or more constraint fields are invalid; all offenders are listed.
    ConstraintValidation { problems: Vec<String> },
    /// Algorithm name not in the supported set.
    UnknownAlgorithm { name: String },
    /// Hard deadline elapsed before a first complete tour was constructed.
    Timeout,
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeError::InsufficientStops { found } => {
                write!(f, "at least 2 locations are required, found {}", found)
            }
            OptimizeError::InvalidStop { id, detail } => {
                write!(f, "invalid location '{}': {}", id, detail)
            }
            OptimizeError::ConstraintValidation { problems } => {
                write!(f, "invalid constraints: {}", problems.join("; "))
            }
            OptimizeError::UnknownAlgorithm { name } => {
                write!(
                    f,
                    "unknown algorithm '{}' (expected one of: {})",
                    name,
                    ALGORITHM_NAMES.join(", ")
                )
            }
            OptimizeError::Timeout => {
                write!(f, "time limit elapsed before a complete route was constructed")
            }
        }
    }
}

impl std::error::Error for OptimizeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_offending_fields() {
        let err = OptimizeError::ConstraintValidation {
            problems: vec![
                "vehicle_capacity must be > 0".to_string(),
                "fleet_size must be >= 1".to_string(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("vehicle_capacity"));
        assert!(text.contains("fleet_size"));
    }

    #[test]
    fn test_unknown_algorithm_names_valid_set() {
        let err = OptimizeError::UnknownAlgorithm {
            name: "quantum".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("classical"));
        assert!(text.contains("simulated-annealing"));
        assert!(text.contains("evolutionary"));
        assert!(text.contains("qaoa-inspired"));
    }
}
