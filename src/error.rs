use thiserror::Error;

use crate::models::CriteriaType;

/// Failures local to one policy or one program. None of these abort a
/// matching run; the evaluator turns them into rejection reasons or
/// exclusions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("unknown criteria type: {0}")]
    UnknownCriteria(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("missing value for {0}")]
    MissingValue(CriteriaType),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid program bounds: min {min} exceeds max {max}")]
    InvalidProgramBounds { min: f64, max: f64 },
}

impl EvaluationError {
    pub(crate) fn mismatch(detail: impl Into<String>) -> Self {
        EvaluationError::TypeMismatch(detail.into())
    }
}

/// Request-level failures reported to the caller before (or instead of) a
/// result list
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid application: {0}")]
    InvalidApplication(#[from] validator::ValidationErrors),

    #[error("evaluation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
