//! Error types for goal_region_sampler

use thiserror::Error;

/// Main error type for the goal sampling components
///
/// Most unproductive outcomes in this crate are not errors: a pose that
/// fails projection, an empty candidate pool, or a roadmap with no cheaper
/// connected vertex are all legitimate states. Errors are reserved for
/// construction misuse.
#[derive(Debug, Error)]
pub enum GoalSamplingError {
    /// Caller-supplied construction data is inconsistent
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A configuration does not match the planning group dimension
    #[error("configuration has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for goal sampling operations
pub type GoalSamplingResult<T> = Result<T, GoalSamplingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GoalSamplingError::InvalidParameter("regions and constraints differ".to_string());
        assert_eq!(
            format!("{}", err),
            "invalid parameter: regions and constraints differ"
        );
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = GoalSamplingError::DimensionMismatch { expected: 7, actual: 6 };
        assert_eq!(format!("{}", err), "configuration has dimension 6, expected 7");
    }
}
