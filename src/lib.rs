//! Lender Match - policy matching engine for equipment finance applications
//!
//! Evaluates one loan application against every active lender's program
//! policies and returns ranked eligibility verdicts with rejection reasons
//! and a 0-100 fit score.

pub mod config;
pub mod core;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use self::core::{Matcher, ScoringConfig, evaluate_program};
pub use error::{EvaluationError, MatchError};
pub use models::{Application, Catalog, Lender, Program, PolicyRule, MatchResult, MatchReport};
