//! Error types returned by the engine facade

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A single rejected field or parameter combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Field path, e.g. `debts[2].interestRate`
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found while validating one set of parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, thiserror::Error)]
#[error("{} invalid parameter(s): {}", .violations.len(), join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Error with exactly one violation
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![Violation::new(field, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Get number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if any violation was raised against the given field path
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(Violation::to_string).collect::<Vec<_>>().join("; ")
}

/// Errors surfaced by [`crate::FinancialEngine`] operations.
///
/// All errors are terminal for the call; no partial result is produced.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("rate limit exceeded for caller '{caller_id}': {limit} requests per {window_secs}s")]
    RateLimited {
        caller_id: String,
        limit: u32,
        window_secs: u64,
    },

    #[error("{function} did not complete within {timeout:?}")]
    ComputationTimeout {
        function: &'static str,
        timeout: Duration,
    },

    #[error("debt plan does not converge (debt '{debt_id}'): {reason}")]
    NonConvergence { debt_id: String, reason: String },
}

impl EngineError {
    /// The validation violations, if this is a validation failure
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            EngineError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors loading an [`crate::EngineConfig`] from disk
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_violation() {
        let err = ValidationError::new(vec![
            Violation::new("principal", "must be >= 0"),
            Violation::new("annualRate", "must be within [-0.5, 2]"),
        ]);

        assert_eq!(
            err.to_string(),
            "2 invalid parameter(s): principal: must be >= 0; annualRate: must be within [-0.5, 2]"
        );
        let _: &dyn std::error::Error = &err;
        assert!(err.has_field("principal"));
        assert!(!err.has_field("timeInYears"));
    }

    #[test]
    fn test_engine_error_wraps_validation() {
        let err: EngineError = ValidationError::single("debts", "at least one debt is required").into();
        assert!(err.validation().is_some());
        assert!(err.to_string().contains("debts"));

        let timeout = EngineError::ComputationTimeout {
            function: "runMonteCarloSimulation",
            timeout: Duration::from_secs(30),
        };
        assert!(timeout.validation().is_none());
    }
}
