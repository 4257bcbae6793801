use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::task::JoinSet;
use validator::Validate;

use crate::core::{
    evaluator::evaluate_program,
    scoring::{calculate_fit_score, ScoringConfig},
};
use crate::error::{EvaluationError, MatchError};
use crate::models::{Application, Catalog, ExcludedProgram, Lender, MatchReport, MatchResult, Program};

/// Per-program verdict before the final merge
enum ProgramVerdict {
    Evaluated(MatchResult),
    Excluded(ExcludedProgram),
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Application validation (request-level, fatal)
/// 2. Active lender filtering
/// 3. Per-program policy evaluation
/// 4. Fit scoring of eligible programs
/// 5. Deterministic ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    scoring: ScoringConfig,
    as_of: NaiveDate,
}

impl Matcher {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self {
            scoring,
            as_of: Utc::now().date_naive(),
        }
    }

    pub fn with_default_scoring() -> Self {
        Self::new(ScoringConfig::default())
    }

    /// Pin the date derived criteria are measured against
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Evaluate the application against every program of every active lender
    ///
    /// # Arguments
    /// * `application` - The submitted application
    /// * `catalog` - All lenders with their programs, active or not
    ///
    /// # Returns
    /// MatchReport with ranked results and any excluded programs
    pub fn find_matches(
        &self,
        application: &Application,
        catalog: &Catalog,
    ) -> Result<MatchReport, MatchError> {
        application.validate()?;

        let verdicts = catalog
            .active_lenders()
            .flat_map(|lender| {
                lender
                    .programs
                    .iter()
                    .map(move |program| self.evaluate(application, lender, program))
            })
            .collect();

        Ok(self.merge(catalog, verdicts))
    }

    /// Same as [`Matcher::find_matches`], with one task per program.
    ///
    /// Completion order has no effect on the result: the merge sorts by key.
    pub async fn find_matches_parallel(
        &self,
        application: Arc<Application>,
        catalog: Arc<Catalog>,
    ) -> Result<MatchReport, MatchError> {
        application.validate()?;

        let mut tasks = JoinSet::new();
        for (lender_idx, lender) in catalog.lenders.iter().enumerate() {
            if !lender.is_active {
                continue;
            }
            for program_idx in 0..lender.programs.len() {
                let matcher = self.clone();
                let application = Arc::clone(&application);
                let catalog = Arc::clone(&catalog);
                tasks.spawn(async move {
                    let lender = &catalog.lenders[lender_idx];
                    matcher.evaluate(&application, lender, &lender.programs[program_idx])
                });
            }
        }

        let mut verdicts = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            verdicts.push(joined?);
        }

        Ok(self.merge(&catalog, verdicts))
    }

    fn evaluate(&self, application: &Application, lender: &Lender, program: &Program) -> ProgramVerdict {
        match evaluate_program(application, program, self.as_of) {
            Ok(outcome) => {
                let fit_score = outcome
                    .eligible
                    .then(|| calculate_fit_score(&outcome.passed, &self.scoring));

                tracing::debug!(
                    "{} / {}: eligible={} fit_score={:?} failures={}",
                    lender.name,
                    program.name,
                    outcome.eligible,
                    fit_score,
                    outcome.failures.len()
                );

                ProgramVerdict::Evaluated(MatchResult {
                    lender_id: lender.id,
                    lender_name: lender.name.clone(),
                    program_id: program.id,
                    program_name: program.name.clone(),
                    eligible: outcome.eligible,
                    fit_score,
                    rejection_reasons: outcome.failures,
                })
            }
            Err(e) => {
                tracing::warn!("Excluding {} / {}: {}", lender.name, program.name, e);
                ProgramVerdict::Excluded(ExcludedProgram {
                    lender_name: lender.name.clone(),
                    program_id: program.id,
                    program_name: program.name.clone(),
                    diagnostic: exclusion_diagnostic(&e),
                })
            }
        }
    }

    fn merge(&self, catalog: &Catalog, verdicts: Vec<ProgramVerdict>) -> MatchReport {
        let programs_evaluated = verdicts.len();
        let mut results = Vec::with_capacity(programs_evaluated);
        let mut excluded = Vec::new();

        for verdict in verdicts {
            match verdict {
                ProgramVerdict::Evaluated(result) => results.push(result),
                ProgramVerdict::Excluded(program) => excluded.push(program),
            }
        }

        results.sort_by(rank);
        excluded.sort_by(|a, b| {
            a.lender_name
                .cmp(&b.lender_name)
                .then_with(|| a.program_name.cmp(&b.program_name))
                .then_with(|| a.program_id.cmp(&b.program_id))
        });

        let skipped = catalog.lenders.iter().filter(|lender| !lender.is_active).count();
        if skipped > 0 {
            tracing::debug!("Skipped {} inactive lenders", skipped);
        }

        let report = MatchReport {
            results,
            excluded,
            programs_evaluated,
        };

        tracing::info!(
            "Evaluated {} programs: {} eligible, {} excluded",
            report.programs_evaluated,
            report.eligible_count(),
            report.excluded.len()
        );

        report
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_scoring()
    }
}

/// Eligible first by fit score (descending), then ineligible; lender name,
/// program name and program id break every remaining tie
fn rank(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.eligible
        .cmp(&a.eligible)
        .then_with(|| b.fit_score.cmp(&a.fit_score))
        .then_with(|| a.lender_name.cmp(&b.lender_name))
        .then_with(|| a.program_name.cmp(&b.program_name))
        .then_with(|| a.program_id.cmp(&b.program_id))
}

fn exclusion_diagnostic(error: &EvaluationError) -> String {
    match error {
        EvaluationError::InvalidProgramBounds { min, max } => format!(
            "Program can never match: minimum loan amount {} exceeds maximum {}",
            crate::core::evaluator::format_currency(*min),
            crate::core::evaluator::format_currency(*max)
        ),
        other => other.to_string(),
    }
}
