// =============================================================================
// Engine error kinds
// =============================================================================
//
// Indicator failures are ordinary data: the orchestrator stores them next to
// successful results instead of aborting the run.

use serde::Serialize;
use thiserror::Error;

/// Every way an indicator computation or input validation can fail.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorError {
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("missing required column: {column}")]
    MissingColumn { column: String },

    #[error("insufficient data: required {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("computation error in {indicator}: {reason}")]
    ComputationError { indicator: String, reason: String },
}

impl IndicatorError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub fn computation(indicator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ComputationError {
            indicator: indicator.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag for logs and rendered tables.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed_input",
            Self::MissingColumn { .. } => "missing_column",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ComputationError { .. } => "computation_error",
        }
    }
}

/// Fail with `InsufficientData` when `got < required`.
pub fn require_samples(required: usize, got: usize) -> Result<(), IndicatorError> {
    if got < required {
        Err(IndicatorError::InsufficientData { required, got })
    } else {
        Ok(())
    }
}

/// Reject any computed value that is present but non-finite.
pub fn ensure_finite(indicator: &str, values: &[Option<f64>]) -> Result<(), IndicatorError> {
    match values.iter().flatten().find(|v| !v.is_finite()) {
        Some(v) => Err(IndicatorError::computation(
            indicator,
            format!("non-finite value {v} in output series"),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_samples_boundary() {
        assert!(require_samples(14, 14).is_ok());
        assert_eq!(
            require_samples(14, 10),
            Err(IndicatorError::InsufficientData {
                required: 14,
                got: 10
            })
        );
    }

    #[test]
    fn ensure_finite_ignores_absent_values() {
        assert!(ensure_finite("RSI", &[None, Some(1.0), None]).is_ok());
        let err = ensure_finite("RSI", &[Some(1.0), Some(f64::NAN)]).unwrap_err();
        assert_eq!(err.tag(), "computation_error");
    }

    #[test]
    fn error_display_and_serialisation() {
        let err = IndicatorError::InsufficientData {
            required: 36,
            got: 20,
        };
        assert_eq!(err.to_string(), "insufficient data: required 36, got 20");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "insufficient_data");
        assert_eq!(json["required"], 36);
    }
}
