use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::EvaluationError;

/// Applicant field a policy can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaType {
    FicoScore,
    YearsInBusiness,
    AnnualRevenue,
    PaynetScore,
    TradeLines,
    State,
    Industry,
    #[serde(alias = "bankruptcy")]
    BankruptcyFlag,
    #[serde(alias = "collections")]
    CollectionsFlag,
    BankruptcyDate,
    YearsSinceBankruptcy,
    LoanAmount,
    TermMonths,
    EquipmentType,
    EquipmentYear,
    EquipmentAge,
}

impl CriteriaType {
    pub const ALL: [CriteriaType; 16] = [
        CriteriaType::FicoScore,
        CriteriaType::YearsInBusiness,
        CriteriaType::AnnualRevenue,
        CriteriaType::PaynetScore,
        CriteriaType::TradeLines,
        CriteriaType::State,
        CriteriaType::Industry,
        CriteriaType::BankruptcyFlag,
        CriteriaType::CollectionsFlag,
        CriteriaType::BankruptcyDate,
        CriteriaType::YearsSinceBankruptcy,
        CriteriaType::LoanAmount,
        CriteriaType::TermMonths,
        CriteriaType::EquipmentType,
        CriteriaType::EquipmentYear,
        CriteriaType::EquipmentAge,
    ];

    /// Canonical configuration name
    pub fn name(self) -> &'static str {
        match self {
            CriteriaType::FicoScore => "fico_score",
            CriteriaType::YearsInBusiness => "years_in_business",
            CriteriaType::AnnualRevenue => "annual_revenue",
            CriteriaType::PaynetScore => "paynet_score",
            CriteriaType::TradeLines => "trade_lines",
            CriteriaType::State => "state",
            CriteriaType::Industry => "industry",
            CriteriaType::BankruptcyFlag => "bankruptcy_flag",
            CriteriaType::CollectionsFlag => "collections_flag",
            CriteriaType::BankruptcyDate => "bankruptcy_date",
            CriteriaType::YearsSinceBankruptcy => "years_since_bankruptcy",
            CriteriaType::LoanAmount => "loan_amount",
            CriteriaType::TermMonths => "term_months",
            CriteriaType::EquipmentType => "equipment_type",
            CriteriaType::EquipmentYear => "equipment_year",
            CriteriaType::EquipmentAge => "equipment_age",
        }
    }

    /// Human wording used in rejection reasons
    pub fn label(self) -> &'static str {
        match self {
            CriteriaType::FicoScore => "FICO score",
            CriteriaType::YearsInBusiness => "Years in business",
            CriteriaType::AnnualRevenue => "Annual revenue",
            CriteriaType::PaynetScore => "PayNet score",
            CriteriaType::TradeLines => "Trade lines",
            CriteriaType::State => "State",
            CriteriaType::Industry => "Industry",
            CriteriaType::BankruptcyFlag => "Bankruptcy on record",
            CriteriaType::CollectionsFlag => "Collections on record",
            CriteriaType::BankruptcyDate => "Bankruptcy date",
            CriteriaType::YearsSinceBankruptcy => "Years since bankruptcy",
            CriteriaType::LoanAmount => "Loan amount",
            CriteriaType::TermMonths => "Term in months",
            CriteriaType::EquipmentType => "Equipment type",
            CriteriaType::EquipmentYear => "Equipment year",
            CriteriaType::EquipmentAge => "Equipment age",
        }
    }

    /// Kind of value the resolver returns for this criteria
    pub fn value_kind(self) -> ValueKind {
        match self {
            CriteriaType::State | CriteriaType::Industry | CriteriaType::EquipmentType => {
                ValueKind::Text
            }
            CriteriaType::BankruptcyFlag | CriteriaType::CollectionsFlag => ValueKind::Bool,
            CriteriaType::BankruptcyDate => ValueKind::Date,
            _ => ValueKind::Number,
        }
    }

    pub fn is_currency(self) -> bool {
        matches!(self, CriteriaType::AnnualRevenue | CriteriaType::LoanAmount)
    }
}

impl fmt::Display for CriteriaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CriteriaType {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let criteria = match normalized.as_str() {
            "bankruptcy" => CriteriaType::BankruptcyFlag,
            "collections" => CriteriaType::CollectionsFlag,
            other => CriteriaType::ALL
                .into_iter()
                .find(|criteria| criteria.name() == other)
                .ok_or_else(|| EvaluationError::UnknownCriteria(s.trim().to_string()))?,
        };
        Ok(criteria)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
    Bool,
    Date,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Number => "number",
            ValueKind::Text => "string",
            ValueKind::Bool => "boolean",
            ValueKind::Date => "date",
        };
        f.write_str(name)
    }
}

/// Typed scalar: either a resolved applicant value or a policy operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
            Value::Date(_) => ValueKind::Date,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, EvaluationError> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| EvaluationError::mismatch(format!("number {n} is out of range"))),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(EvaluationError::mismatch(format!(
                "expected a number, string or boolean, found {other}"
            ))),
        }
    }

    /// Numeric view; strings must parse cleanly
    pub fn as_number(&self) -> Result<f64, EvaluationError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| EvaluationError::mismatch(format!("'{s}' is not numeric"))),
            other => Err(EvaluationError::mismatch(format!(
                "{} value cannot be compared numerically",
                other.kind()
            ))),
        }
    }

    pub fn as_date(&self) -> Result<NaiveDate, EvaluationError> {
        match self {
            Value::Date(d) => Ok(*d),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| EvaluationError::mismatch(format!("'{s}' is not a YYYY-MM-DD date"))),
            other => Err(EvaluationError::mismatch(format!(
                "{} value is not a date",
                other.kind()
            ))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvaluationError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" => Ok(true),
                "false" | "no" => Ok(false),
                _ => Err(EvaluationError::mismatch(format!("'{s}' is not a boolean"))),
            },
            other => Err(EvaluationError::mismatch(format!(
                "{} value is not a boolean",
                other.kind()
            ))),
        }
    }

    /// Convert to `kind`, or fail when the value can never be read that way.
    /// Policy operands must be finite numbers.
    pub fn coerce_to(&self, kind: ValueKind) -> Result<Value, EvaluationError> {
        match kind {
            ValueKind::Number => match self.as_number()? {
                n if n.is_finite() => Ok(Value::Number(n)),
                n => Err(EvaluationError::mismatch(format!("{n} is not a finite number"))),
            },
            ValueKind::Date => self.as_date().map(Value::Date),
            ValueKind::Bool => self.as_bool().map(Value::Bool),
            ValueKind::Text => match self {
                Value::Text(s) => Ok(Value::Text(s.clone())),
                other => Err(EvaluationError::mismatch(format!(
                    "expected a string, found {}",
                    other.kind()
                ))),
            },
        }
    }
}

/// Comparison operator as authored in a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    Below,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::AtLeast => ">=",
            Operator::Above => ">",
            Operator::AtMost => "<=",
            Operator::Below => "<",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }

    /// Directional form, for the four ordering operators
    pub fn comparison(self) -> Option<Comparison> {
        match self {
            Operator::AtLeast => Some(Comparison::AtLeast),
            Operator::Above => Some(Comparison::Above),
            Operator::AtMost => Some(Comparison::AtMost),
            Operator::Below => Some(Comparison::Below),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            ">=" => Ok(Operator::AtLeast),
            ">" => Ok(Operator::Above),
            "<=" => Ok(Operator::AtMost),
            "<" => Ok(Operator::Below),
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            "in" => Ok(Operator::In),
            "not in" | "not_in" => Ok(Operator::NotIn),
            _ => Err(EvaluationError::UnsupportedOperator(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    Above,
    AtMost,
    Below,
}

impl Comparison {
    /// Whether `actual.cmp(threshold) == ordering` satisfies this comparison.
    /// Boundary values pass the inclusive forms only.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::AtLeast => ordering != Ordering::Less,
            Comparison::Above => ordering == Ordering::Greater,
            Comparison::AtMost => ordering != Ordering::Greater,
            Comparison::Below => ordering == Ordering::Less,
        }
    }

    /// True for `>=` and `>`: the applicant should sit above the threshold
    pub fn is_lower_bound(self) -> bool {
        matches!(self, Comparison::AtLeast | Comparison::Above)
    }

    pub fn operator(self) -> Operator {
        match self {
            Comparison::AtLeast => Operator::AtLeast,
            Comparison::Above => Operator::Above,
            Comparison::AtMost => Operator::AtMost,
            Comparison::Below => Operator::Below,
        }
    }
}

/// Right-hand side of a policy: a single value or a set
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyValue {
    Scalar(Value),
    Set(Vec<Value>),
}

impl PolicyValue {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, EvaluationError> {
        match value {
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(PolicyValue::Set),
            other => Value::from_json(other).map(PolicyValue::Scalar),
        }
    }
}

/// Policy exactly as a user authored it. Nothing is checked until it is
/// compiled into a [`Policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub criteria_type: String,
    pub operator: String,
    pub value: serde_json::Value,
}

impl PolicyRule {
    pub fn new(
        criteria_type: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            criteria_type: criteria_type.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Shape-checked rule body
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// `>=`, `>`, `<=`, `<` against a number or a date
    Threshold { comparison: Comparison, bound: Value },
    /// `==` / `!=`
    Equality { negated: bool, expected: Value },
    /// `in` / `not in`
    Membership { negated: bool, members: Vec<Value> },
}

impl Rule {
    pub fn operator(&self) -> Operator {
        match self {
            Rule::Threshold { comparison, .. } => comparison.operator(),
            Rule::Equality { negated: false, .. } => Operator::Equal,
            Rule::Equality { negated: true, .. } => Operator::NotEqual,
            Rule::Membership { negated: false, .. } => Operator::In,
            Rule::Membership { negated: true, .. } => Operator::NotIn,
        }
    }
}

/// Compiled eligibility rule. Construction rejects operator/value shapes
/// that could never be satisfied for the criteria's value kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    criteria: CriteriaType,
    rule: Rule,
}

impl Policy {
    pub fn new(
        criteria: CriteriaType,
        operator: Operator,
        value: PolicyValue,
    ) -> Result<Self, EvaluationError> {
        let kind = criteria.value_kind();

        let rule = match (operator, value) {
            (Operator::In | Operator::NotIn, PolicyValue::Set(members)) => Rule::Membership {
                negated: operator == Operator::NotIn,
                members: members
                    .iter()
                    .map(|member| member.coerce_to(kind))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            (Operator::In | Operator::NotIn, PolicyValue::Scalar(_)) => {
                return Err(EvaluationError::mismatch(format!(
                    "'{operator}' requires a set of values"
                )));
            }
            (_, PolicyValue::Set(_)) => {
                return Err(EvaluationError::mismatch(format!(
                    "'{operator}' requires a single value, found a set"
                )));
            }
            (Operator::Equal | Operator::NotEqual, PolicyValue::Scalar(expected)) => {
                Rule::Equality {
                    negated: operator == Operator::NotEqual,
                    expected: expected.coerce_to(kind)?,
                }
            }
            (_, PolicyValue::Scalar(bound)) => {
                let comparison = operator
                    .comparison()
                    .ok_or_else(|| EvaluationError::UnsupportedOperator(operator.to_string()))?;
                if !matches!(kind, ValueKind::Number | ValueKind::Date) {
                    return Err(EvaluationError::mismatch(format!(
                        "'{operator}' cannot order {kind} values"
                    )));
                }
                Rule::Threshold {
                    comparison,
                    bound: bound.coerce_to(kind)?,
                }
            }
        };

        Ok(Self { criteria, rule })
    }

    pub fn criteria(&self) -> CriteriaType {
        self.criteria
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn operator(&self) -> Operator {
        self.rule.operator()
    }
}

impl TryFrom<&PolicyRule> for Policy {
    type Error = EvaluationError;

    fn try_from(raw: &PolicyRule) -> Result<Self, Self::Error> {
        let criteria: CriteriaType = raw.criteria_type.parse()?;
        let operator: Operator = raw.operator.parse()?;

        // Sets are sometimes stored as a JSON-encoded string
        let value = match &raw.value {
            serde_json::Value::String(s)
                if matches!(operator, Operator::In | Operator::NotIn)
                    && s.trim_start().starts_with('[') =>
            {
                let decoded: serde_json::Value = serde_json::from_str(s).map_err(|e| {
                    EvaluationError::mismatch(format!("set value is not valid JSON: {e}"))
                })?;
                PolicyValue::from_json(&decoded)?
            }
            other => PolicyValue::from_json(other)?,
        };

        Policy::new(criteria, operator, value)
    }
}
