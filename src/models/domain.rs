use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::policy::PolicyRule;

/// Loan application snapshot, evaluated once against the whole catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Application {
    #[validate(nested)]
    pub business: Business,
    #[serde(default)]
    #[validate(nested)]
    pub business_credit: BusinessCredit,
    #[validate(nested)]
    pub guarantor: Guarantor,
    #[validate(nested)]
    pub loan_request: LoanRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Business {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub industry: String,
    /// Two-letter state code
    #[validate(length(equal = 2))]
    pub state: String,
    pub years_in_business: u32,
    #[validate(range(min = 0.0))]
    pub annual_revenue: f64,
}

/// Business credit bureau data. Both fields are optional and a policy that
/// needs an unset one fails resolution instead of comparing against zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct BusinessCredit {
    #[serde(default)]
    pub paynet_score: Option<u32>,
    #[serde(default)]
    pub trade_lines: Option<u32>,
}

/// Personal guarantor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bankruptcy_date"))]
pub struct Guarantor {
    #[validate(range(min = 300, max = 850))]
    pub fico_score: u16,
    #[serde(default)]
    pub bankruptcy_flag: bool,
    #[serde(default)]
    pub bankruptcy_date: Option<NaiveDate>,
    #[serde(default)]
    pub collections_flag: bool,
}

fn validate_bankruptcy_date(guarantor: &Guarantor) -> Result<(), ValidationError> {
    match (guarantor.bankruptcy_flag, guarantor.bankruptcy_date) {
        (true, None) => Err(ValidationError::new("bankruptcy_date_required")),
        (false, Some(_)) => Err(ValidationError::new("bankruptcy_date_without_flag")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoanRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(range(min = 1))]
    pub term_months: u32,
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub equipment_year: Option<i32>,
}

/// Lender with its nested programs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lender {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub programs: Vec<Program>,
}

fn default_true() -> bool { true }

/// A lender's loan product: amount bounds plus an ordered policy set.
/// A missing bound is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub min_loan_amount: Option<f64>,
    #[serde(default)]
    pub max_loan_amount: Option<f64>,
    #[serde(default)]
    pub policies: Vec<PolicyRule>,
}

impl Program {
    /// `(min, max)` when both bounds are set and min exceeds max
    pub fn inverted_bounds(&self) -> Option<(f64, f64)> {
        match (self.min_loan_amount, self.max_loan_amount) {
            (Some(min), Some(max)) if min > max => Some((min, max)),
            _ => None,
        }
    }
}

/// Every lender known to the caller, active or not
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub lenders: Vec<Lender>,
}

impl Catalog {
    pub fn new(lenders: Vec<Lender>) -> Self {
        Self { lenders }
    }

    /// Lenders that participate in matching
    pub fn active_lenders(&self) -> impl Iterator<Item = &Lender> {
        self.lenders.iter().filter(|lender| lender.is_active)
    }

    pub fn program_count(&self) -> usize {
        self.lenders.iter().map(|lender| lender.programs.len()).sum()
    }
}

/// Eligibility verdict for one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub lender_id: Uuid,
    pub lender_name: String,
    pub program_id: Uuid,
    pub program_name: String,
    pub eligible: bool,
    /// Present only when eligible
    pub fit_score: Option<u8>,
    pub rejection_reasons: Vec<String>,
}

/// Program dropped from matching because it can never be satisfied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedProgram {
    pub lender_name: String,
    pub program_id: Uuid,
    pub program_name: String,
    pub diagnostic: String,
}
