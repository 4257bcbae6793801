use chrono::NaiveDate;

use crate::core::{criteria::resolve, operators};
use crate::error::EvaluationError;
use crate::models::{Application, Comparison, CriteriaType, Policy, PolicyRule, Program, Rule, Value};

/// A policy the applicant cleared, with the value it was checked against
#[derive(Debug, Clone, PartialEq)]
pub struct PassedCheck {
    pub policy: Policy,
    pub actual: Value,
}

/// Verdict for one program
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// Amount within bounds and every policy passed
    pub eligible: bool,
    /// Amount-range reason first, then one per failing policy in declared order
    pub failures: Vec<String>,
    pub passed: Vec<PassedCheck>,
}

/// Evaluate every policy of `program` against the application.
///
/// Nothing short-circuits: each failing policy contributes its own reason so
/// the applicant sees everything that has to change. Resolution and type
/// errors count as a failure of that policy only. The single hard error is
/// a program whose bounds are inverted.
pub fn evaluate_program(
    application: &Application,
    program: &Program,
    as_of: NaiveDate,
) -> Result<EvaluationOutcome, EvaluationError> {
    check_bounds(program)?;

    let mut failures = Vec::new();
    let mut passed = Vec::with_capacity(program.policies.len());

    if let Some(reason) = check_amount(application.loan_request.amount, program) {
        failures.push(reason);
    }

    for raw in &program.policies {
        match check_policy(application, raw, as_of) {
            Ok(check) => passed.push(check),
            Err(reason) => {
                tracing::trace!("Program {} failed policy: {}", program.name, reason);
                failures.push(reason);
            }
        }
    }

    Ok(EvaluationOutcome {
        eligible: failures.is_empty(),
        failures,
        passed,
    })
}

/// Configuration problems in a program that can be found without an
/// application: inverted bounds and policies that do not compile
pub fn program_diagnostics(program: &Program) -> Vec<EvaluationError> {
    let mut problems = Vec::new();
    if let Err(e) = check_bounds(program) {
        problems.push(e);
    }
    problems.extend(
        program
            .policies
            .iter()
            .filter_map(|raw| Policy::try_from(raw).err()),
    );
    problems
}

fn check_bounds(program: &Program) -> Result<(), EvaluationError> {
    match program.inverted_bounds() {
        Some((min, max)) => Err(EvaluationError::InvalidProgramBounds { min, max }),
        None => Ok(()),
    }
}

fn check_amount(amount: f64, program: &Program) -> Option<String> {
    let below = program.min_loan_amount.is_some_and(|min| amount < min);
    let above = program.max_loan_amount.is_some_and(|max| amount > max);

    if below || above {
        Some(format!(
            "Requested amount {} is outside program range {}",
            format_currency(amount),
            describe_bounds(program.min_loan_amount, program.max_loan_amount)
        ))
    } else {
        None
    }
}

fn check_policy(
    application: &Application,
    raw: &PolicyRule,
    as_of: NaiveDate,
) -> Result<PassedCheck, String> {
    let policy = Policy::try_from(raw).map_err(|e| describe_error(raw, &e))?;
    let actual = resolve(application, policy.criteria(), as_of).map_err(|e| describe_error(raw, &e))?;

    match operators::apply(policy.rule(), &actual) {
        Ok(true) => Ok(PassedCheck { policy, actual }),
        Ok(false) => Err(describe_failure(&policy, &actual)),
        Err(e) => Err(describe_error(raw, &e)),
    }
}

fn describe_failure(policy: &Policy, actual: &Value) -> String {
    let criteria = policy.criteria();
    let label = criteria.label();
    let actual = format_value(criteria, actual);

    match policy.rule() {
        Rule::Threshold { comparison, bound } => {
            let bound = format_value(criteria, bound);
            match comparison {
                Comparison::AtLeast => format!("{label} {actual} does not meet minimum {bound}"),
                Comparison::Above => format!("{label} {actual} does not exceed {bound}"),
                Comparison::AtMost => format!("{label} {actual} exceeds maximum {bound}"),
                Comparison::Below => format!("{label} {actual} is not below {bound}"),
            }
        }
        Rule::Equality { negated: false, expected } => {
            format!(
                "{label} {actual} does not equal required {}",
                format_value(criteria, expected)
            )
        }
        Rule::Equality { negated: true, .. } => format!("{label} {actual} is not permitted"),
        Rule::Membership { negated, members } => {
            let list = members
                .iter()
                .map(|member| format_value(criteria, member))
                .collect::<Vec<_>>()
                .join(", ");
            if *negated {
                format!("{label} {actual} is excluded ({list})")
            } else {
                format!("{label} {actual} is not one of {list}")
            }
        }
    }
}

fn describe_error(raw: &PolicyRule, error: &EvaluationError) -> String {
    let label = match raw.criteria_type.parse::<CriteriaType>() {
        Ok(criteria) => criteria.label(),
        Err(_) => raw.criteria_type.trim(),
    };

    match error {
        EvaluationError::UnknownCriteria(name) => {
            format!("Unrecognized criteria '{name}' in program policy")
        }
        EvaluationError::UnsupportedOperator(op) => {
            format!("Unsupported operator '{op}' in {label} policy")
        }
        EvaluationError::MissingValue(criteria) => {
            format!("{} is unavailable for this application", criteria.label())
        }
        EvaluationError::TypeMismatch(detail) => {
            format!("{label} rule is misconfigured: {detail}")
        }
        other => other.to_string(),
    }
}

fn describe_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{} - {}", format_currency(min), format_currency(max)),
        (Some(min), None) => format!("{} or more", format_currency(min)),
        (None, Some(max)) => format!("up to {}", format_currency(max)),
        (None, None) => "unbounded".to_string(),
    }
}

fn format_value(criteria: CriteriaType, value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_infinite() => "(none on record)".to_string(),
        Value::Number(n) if criteria.is_currency() => format_currency(*n),
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.trim().to_string(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        return format!("{n:.0}");
    }
    let fixed = format!("{n:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `$1,234` or `$1,234.50`
pub(crate) fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{fraction:02}")
    }
}
