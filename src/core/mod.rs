// Core algorithm exports
pub mod criteria;
pub mod evaluator;
pub mod matcher;
pub mod operators;
pub mod scoring;

pub use criteria::{resolve, resolve_named};
pub use evaluator::{evaluate_program, program_diagnostics, EvaluationOutcome, PassedCheck};
pub use matcher::Matcher;
pub use scoring::{calculate_fit_score, CriteriaScale, ScoringConfig};
