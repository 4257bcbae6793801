use std::cmp::Ordering;

use crate::error::EvaluationError;
use crate::models::{Comparison, Operator, PolicyValue, Rule, Value};

/// Apply `operator` between an applicant value and a raw policy value.
///
/// Operands are coerced on the fly. Incompatible shapes (an ordering on
/// non-numeric text, `in` against a scalar) fail with `TypeMismatch`
/// instead of quietly returning false.
pub fn evaluate(
    actual: &Value,
    operator: Operator,
    expected: &PolicyValue,
) -> Result<bool, EvaluationError> {
    match (operator, expected) {
        (Operator::In | Operator::NotIn, PolicyValue::Set(members)) => {
            let found = member_of(actual, members)?;
            Ok(found != (operator == Operator::NotIn))
        }
        (Operator::In | Operator::NotIn, PolicyValue::Scalar(_)) => Err(EvaluationError::mismatch(
            format!("'{operator}' requires a set of values"),
        )),
        (_, PolicyValue::Set(_)) => Err(EvaluationError::mismatch(format!(
            "'{operator}' requires a single value, found a set"
        ))),
        (Operator::Equal | Operator::NotEqual, PolicyValue::Scalar(value)) => {
            let equal = equals(actual, value)?;
            Ok(equal != (operator == Operator::NotEqual))
        }
        (_, PolicyValue::Scalar(bound)) => {
            let comparison = operator
                .comparison()
                .ok_or_else(|| EvaluationError::UnsupportedOperator(operator.to_string()))?;
            threshold(actual, comparison, bound)
        }
    }
}

/// Apply an already shape-checked rule
pub fn apply(rule: &Rule, actual: &Value) -> Result<bool, EvaluationError> {
    match rule {
        Rule::Threshold { comparison, bound } => threshold(actual, *comparison, bound),
        Rule::Equality { negated, expected } => Ok(equals(actual, expected)? != *negated),
        Rule::Membership { negated, members } => Ok(member_of(actual, members)? != *negated),
    }
}

/// Directional comparison. Dates order chronologically, everything else
/// must coerce to a number.
pub fn threshold(
    actual: &Value,
    comparison: Comparison,
    bound: &Value,
) -> Result<bool, EvaluationError> {
    Ok(comparison.holds(order(actual, bound)?))
}

fn order(actual: &Value, bound: &Value) -> Result<Ordering, EvaluationError> {
    if matches!(actual, Value::Date(_)) || matches!(bound, Value::Date(_)) {
        return Ok(actual.as_date()?.cmp(&bound.as_date()?));
    }

    let a = actual.as_number()?;
    let b = bound.as_number()?;
    a.partial_cmp(&b)
        .ok_or_else(|| EvaluationError::mismatch("cannot order NaN"))
}

/// Equality on normalised values: text is trimmed and case-folded, numbers,
/// booleans and dates compare by value
pub fn equals(actual: &Value, expected: &Value) -> Result<bool, EvaluationError> {
    match (actual, expected) {
        (Value::Text(a), Value::Text(b)) => Ok(normalize(a) == normalize(b)),
        (Value::Number(n), other) | (other, Value::Number(n)) => Ok(*n == other.as_number()?),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => Ok(*b == other.as_bool()?),
        (Value::Date(d), other) | (other, Value::Date(d)) => Ok(*d == other.as_date()?),
    }
}

/// Set membership using [`equals`], so text matches ignore case
pub fn member_of(actual: &Value, members: &[Value]) -> Result<bool, EvaluationError> {
    for member in members {
        if equals(actual, member)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn num(n: f64) -> PolicyValue {
        PolicyValue::Scalar(Value::Number(n))
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_inclusive_boundaries() {
        let at = Value::Number(680.0);
        assert_eq!(evaluate(&at, Operator::AtLeast, &num(680.0)), Ok(true));
        assert_eq!(evaluate(&at, Operator::AtMost, &num(680.0)), Ok(true));
        assert_eq!(evaluate(&at, Operator::Above, &num(680.0)), Ok(false));
        assert_eq!(evaluate(&at, Operator::Below, &num(680.0)), Ok(false));
        assert_eq!(evaluate(&Value::Number(679.0), Operator::AtLeast, &num(680.0)), Ok(false));
    }

    #[test]
    fn test_numeric_string_coercion() {
        let bound = PolicyValue::Scalar(text(" 680 "));
        assert_eq!(evaluate(&Value::Number(700.0), Operator::Above, &bound), Ok(true));

        let garbage = PolicyValue::Scalar(text("excellent"));
        assert!(matches!(
            evaluate(&Value::Number(700.0), Operator::AtLeast, &garbage),
            Err(EvaluationError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_ordering_on_text_is_mismatch() {
        let bound = PolicyValue::Scalar(text("Retail"));
        assert!(matches!(
            evaluate(&text("Trucking"), Operator::AtLeast, &bound),
            Err(EvaluationError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_equality_normalizes_text() {
        let expected = PolicyValue::Scalar(text("Construction"));
        assert_eq!(evaluate(&text("  construction "), Operator::Equal, &expected), Ok(true));
        assert_eq!(evaluate(&text("Trucking"), Operator::NotEqual, &expected), Ok(true));
    }

    #[test]
    fn test_equality_bool_and_number() {
        let no = PolicyValue::Scalar(Value::Bool(false));
        assert_eq!(evaluate(&Value::Bool(false), Operator::Equal, &no), Ok(true));
        assert_eq!(evaluate(&Value::Bool(true), Operator::Equal, &no), Ok(false));

        let flag_text = PolicyValue::Scalar(text("true"));
        assert_eq!(evaluate(&Value::Bool(true), Operator::Equal, &flag_text), Ok(true));

        assert_eq!(evaluate(&Value::Number(3.0), Operator::Equal, &num(3.0)), Ok(true));
    }

    #[test]
    fn test_membership_case_insensitive() {
        let states = PolicyValue::Set(vec![text("CA"), text("NY"), text("TX")]);
        assert_eq!(evaluate(&text("ca"), Operator::In, &states), Ok(true));
        assert_eq!(evaluate(&text("FL"), Operator::In, &states), Ok(false));
        assert_eq!(evaluate(&text("fl"), Operator::NotIn, &states), Ok(true));
    }

    #[test]
    fn test_membership_requires_set() {
        assert!(matches!(
            evaluate(&text("CA"), Operator::In, &PolicyValue::Scalar(text("CA"))),
            Err(EvaluationError::TypeMismatch(_))
        ));
        assert!(matches!(
            evaluate(&Value::Number(1.0), Operator::AtLeast, &PolicyValue::Set(vec![])),
            Err(EvaluationError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_dates_compare_chronologically() {
        let filed = Value::Date(NaiveDate::from_ymd_opt(2009, 1, 15).unwrap());
        let cutoff = PolicyValue::Scalar(text("2010-01-01"));
        assert_eq!(evaluate(&filed, Operator::Below, &cutoff), Ok(true));
        assert_eq!(evaluate(&filed, Operator::AtLeast, &cutoff), Ok(false));
    }

    #[test]
    fn test_apply_compiled_rule() {
        let rule = Rule::Membership {
            negated: false,
            members: vec![text("Trucking"), text("Construction")],
        };
        assert_eq!(apply(&rule, &text("TRUCKING")), Ok(true));

        let rule = Rule::Threshold {
            comparison: Comparison::AtLeast,
            bound: Value::Number(15.0),
        };
        assert_eq!(apply(&rule, &Value::Number(f64::INFINITY)), Ok(true));
    }
}
