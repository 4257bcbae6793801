use serde::{Deserialize, Serialize};
use crate::models::domain::{ExcludedProgram, MatchResult};

/// Output of one matching run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Eligible programs first (by fit score), then ineligible ones
    pub results: Vec<MatchResult>,
    /// Programs whose bounds can never be satisfied
    pub excluded: Vec<ExcludedProgram>,
    pub programs_evaluated: usize,
}

impl MatchReport {
    pub fn eligible(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|result| result.eligible)
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }
}
