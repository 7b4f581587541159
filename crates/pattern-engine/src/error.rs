use thiserror::Error;

/// Errors from the pattern engine.
///
/// Numeric kernels report these internally; the facade collapses them into
/// documented fallbacks so that queries stay total.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("degenerate computation in {operation}: {detail}")]
    DegenerateComputation {
        operation: &'static str,
        detail: String,
    },

    #[error("length mismatch: {left} samples vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    #[error("insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed field {field}: {detail}")]
    MalformedField { field: String, detail: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for PatternError {
    fn from(e: serde_json::Error) -> Self {
        PatternError::Parse(e.to_string())
    }
}

/// Convenience type alias for pattern engine results.
pub type PatternResult<T> = Result<T, PatternError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = PatternError::DegenerateComputation {
            operation: "pearson",
            detail: "zero variance".into(),
        };
        assert!(e.to_string().contains("pearson"));
        assert!(e.to_string().contains("zero variance"));

        let e = PatternError::InsufficientSamples { needed: 2, got: 1 };
        assert!(e.to_string().contains("at least 2"));

        let e = PatternError::MalformedField {
            field: "scup".into(),
            detail: "expected number".into(),
        };
        assert!(e.to_string().contains("scup"));
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: PatternError = json_err.into();
        assert!(matches!(err, PatternError::Parse(_)));
    }

    #[test]
    fn result_type_works() {
        let ok: PatternResult<f64> = Ok(0.5);
        assert_eq!(ok.unwrap(), 0.5);

        let err: PatternResult<f64> = Err(PatternError::InvalidConfig("max_history".into()));
        assert!(err.is_err());
    }
}
