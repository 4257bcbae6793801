use chrono::{Datelike, NaiveDate};

use crate::error::EvaluationError;
use crate::models::{Application, CriteriaType, Value};

const DAYS_PER_YEAR: f64 = 365.25;

/// Look up the applicant's value for a criteria by its configured name
pub fn resolve_named(
    application: &Application,
    criteria_type: &str,
    as_of: NaiveDate,
) -> Result<Value, EvaluationError> {
    let criteria: CriteriaType = criteria_type.parse()?;
    resolve(application, criteria, as_of)
}

/// Look up the applicant's value for `criteria`.
///
/// Unset optional fields fail with `MissingValue` rather than resolving to
/// zero. `as_of` anchors the derived criteria (`equipment_age`,
/// `years_since_bankruptcy`) so resolution stays deterministic.
pub fn resolve(
    application: &Application,
    criteria: CriteriaType,
    as_of: NaiveDate,
) -> Result<Value, EvaluationError> {
    let business = &application.business;
    let credit = &application.business_credit;
    let guarantor = &application.guarantor;
    let loan = &application.loan_request;
    let missing = || EvaluationError::MissingValue(criteria);

    let value = match criteria {
        CriteriaType::FicoScore => Value::Number(f64::from(guarantor.fico_score)),
        CriteriaType::YearsInBusiness => Value::Number(f64::from(business.years_in_business)),
        CriteriaType::AnnualRevenue => Value::Number(business.annual_revenue),
        CriteriaType::PaynetScore => Value::Number(f64::from(credit.paynet_score.ok_or_else(missing)?)),
        CriteriaType::TradeLines => Value::Number(f64::from(credit.trade_lines.ok_or_else(missing)?)),
        CriteriaType::State => Value::Text(business.state.clone()),
        CriteriaType::Industry => Value::Text(business.industry.clone()),
        CriteriaType::BankruptcyFlag => Value::Bool(guarantor.bankruptcy_flag),
        CriteriaType::CollectionsFlag => Value::Bool(guarantor.collections_flag),
        CriteriaType::BankruptcyDate => Value::Date(guarantor.bankruptcy_date.ok_or_else(missing)?),
        CriteriaType::YearsSinceBankruptcy => {
            if !guarantor.bankruptcy_flag {
                // Nothing on record: clears any minimum look-back
                Value::Number(f64::INFINITY)
            } else {
                let filed = guarantor.bankruptcy_date.ok_or_else(missing)?;
                let days = (as_of - filed).num_days().max(0);
                Value::Number(days as f64 / DAYS_PER_YEAR)
            }
        }
        CriteriaType::LoanAmount => Value::Number(loan.amount),
        CriteriaType::TermMonths => Value::Number(f64::from(loan.term_months)),
        CriteriaType::EquipmentType => Value::Text(loan.equipment_type.clone().ok_or_else(missing)?),
        CriteriaType::EquipmentYear => Value::Number(f64::from(loan.equipment_year.ok_or_else(missing)?)),
        CriteriaType::EquipmentAge => {
            let year = loan.equipment_year.ok_or_else(missing)?;
            Value::Number(f64::from((as_of.year() - year).max(0)))
        }
    };

    Ok(value)
}
