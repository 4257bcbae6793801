use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::core::evaluator::PassedCheck;
use crate::models::{Comparison, CriteriaType, Rule, Value};

/// How a directional policy's excess over its threshold maps onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CriteriaScale {
    /// margin = excess / span (dates measure excess in days)
    Linear { span: f64 },
    /// margin = |log10(1 + actual) - log10(1 + threshold)| / decades
    Logarithmic { decades: f64 },
    /// Always the neutral margin; switches off a built-in scale
    Neutral,
}

/// Fit scoring constants.
///
/// These are lending-policy choices, not engineering ones, so every one of
/// them can be overridden through the `[scoring]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScoringConfig {
    /// Margin credited for passing equality/membership policies, and for
    /// directional policies without a configured scale
    #[validate(range(min = 0.0, max = 1.0))]
    pub neutral_margin: f64,
    /// Configured entries are layered over the defaults; `method = "neutral"`
    /// switches one off
    #[serde(deserialize_with = "merge_with_default_scales")]
    #[validate(custom(function = "validate_scales"))]
    pub scales: BTreeMap<CriteriaType, CriteriaScale>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use CriteriaScale::{Linear, Logarithmic};

        let scales = BTreeMap::from([
            (CriteriaType::FicoScore, Linear { span: 550.0 }),
            (CriteriaType::YearsInBusiness, Linear { span: 20.0 }),
            (CriteriaType::AnnualRevenue, Logarithmic { decades: 2.0 }),
            (CriteriaType::PaynetScore, Linear { span: 100.0 }),
            (CriteriaType::TradeLines, Linear { span: 20.0 }),
            (CriteriaType::LoanAmount, Logarithmic { decades: 1.0 }),
            (CriteriaType::TermMonths, Linear { span: 60.0 }),
            (CriteriaType::EquipmentYear, Linear { span: 20.0 }),
            (CriteriaType::EquipmentAge, Linear { span: 20.0 }),
            (CriteriaType::YearsSinceBankruptcy, Linear { span: 15.0 }),
            (CriteriaType::BankruptcyDate, Linear { span: 3650.0 }),
        ]);

        Self {
            neutral_margin: 0.5,
            scales,
        }
    }
}

fn merge_with_default_scales<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<CriteriaType, CriteriaScale>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<CriteriaType, CriteriaScale>::deserialize(deserializer)?;
    let mut scales = ScoringConfig::default().scales;
    scales.extend(overrides);
    Ok(scales)
}

fn validate_scales(scales: &BTreeMap<CriteriaType, CriteriaScale>) -> Result<(), ValidationError> {
    let valid = scales.values().all(|scale| match scale {
        CriteriaScale::Linear { span } => span.is_finite() && *span > 0.0,
        CriteriaScale::Logarithmic { decades } => decades.is_finite() && *decades > 0.0,
        CriteriaScale::Neutral => true,
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("scale_must_be_positive"))
    }
}

/// Calculate a fit score (0-100) for an eligible program
///
/// The score is the mean of per-policy margins, so it does not depend on
/// policy order. A program with no policies scores the neutral margin.
pub fn calculate_fit_score(passed: &[PassedCheck], config: &ScoringConfig) -> u8 {
    if passed.is_empty() {
        return to_score(config.neutral_margin);
    }

    let total: f64 = passed.iter().map(|check| policy_margin(check, config)).sum();
    to_score(total / passed.len() as f64)
}

/// Margin (0-1) by which one passed policy was cleared
pub fn policy_margin(check: &PassedCheck, config: &ScoringConfig) -> f64 {
    match check.policy.rule() {
        Rule::Threshold { comparison, bound } => config
            .scales
            .get(&check.policy.criteria())
            .and_then(|scale| directional_margin(&check.actual, *comparison, bound, scale))
            .unwrap_or(config.neutral_margin),
        Rule::Equality { .. } | Rule::Membership { .. } => config.neutral_margin,
    }
}

#[inline]
fn directional_margin(
    actual: &Value,
    comparison: Comparison,
    bound: &Value,
    scale: &CriteriaScale,
) -> Option<f64> {
    let (actual, bound) = match (actual, bound) {
        (Value::Date(a), Value::Date(b)) => (
            f64::from(a.num_days_from_ce()),
            f64::from(b.num_days_from_ce()),
        ),
        _ => (actual.as_number().ok()?, bound.as_number().ok()?),
    };

    let excess = match scale {
        CriteriaScale::Linear { span } => (actual - bound) / span,
        CriteriaScale::Logarithmic { decades } => {
            ((actual.max(0.0) + 1.0).log10() - (bound.max(0.0) + 1.0).log10()) / decades
        }
        CriteriaScale::Neutral => return None,
    };

    // Upper-bound policies are cleared by sitting below the threshold
    let margin = if comparison.is_lower_bound() { excess } else { -excess };
    Some(clamp_unit(margin))
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[inline]
fn to_score(mean_margin: f64) -> u8 {
    (clamp_unit(mean_margin) * 100.0).round() as u8
}
