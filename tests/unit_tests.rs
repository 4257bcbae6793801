// Unit tests for Lender Match

use chrono::NaiveDate;
use lender_match::core::{
    calculate_fit_score,
    criteria::{resolve, resolve_named},
    evaluate_program,
    operators::evaluate,
    program_diagnostics, ScoringConfig,
};
use lender_match::error::EvaluationError;
use lender_match::models::{
    Application, Business, BusinessCredit, CriteriaType, Guarantor, LoanRequest, Operator, Policy,
    PolicyRule, PolicyValue, Program, Rule, Value,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn create_application(fico: u16, amount: f64) -> Application {
    Application {
        business: Business {
            name: "Harbor Freight Logistics".to_string(),
            industry: "Transportation".to_string(),
            state: "ca".to_string(),
            years_in_business: 6,
            annual_revenue: 500_000.0,
        },
        business_credit: BusinessCredit::default(),
        guarantor: Guarantor {
            fico_score: fico,
            bankruptcy_flag: false,
            bankruptcy_date: None,
            collections_flag: false,
        },
        loan_request: LoanRequest {
            amount,
            term_months: 60,
            equipment_type: Some("Tractor".to_string()),
            equipment_year: Some(2020),
        },
    }
}

fn create_program(min: Option<f64>, max: Option<f64>, policies: Vec<PolicyRule>) -> Program {
    Program {
        id: Uuid::new_v4(),
        name: "Test Program".to_string(),
        min_loan_amount: min,
        max_loan_amount: max,
        policies,
    }
}

fn num(n: f64) -> PolicyValue {
    PolicyValue::Scalar(Value::Number(n))
}

#[test]
fn test_resolve_core_criteria() {
    let app = create_application(720, 50_000.0);

    assert_eq!(resolve(&app, CriteriaType::FicoScore, as_of()), Ok(Value::Number(720.0)));
    assert_eq!(resolve(&app, CriteriaType::LoanAmount, as_of()), Ok(Value::Number(50_000.0)));
    assert_eq!(
        resolve(&app, CriteriaType::State, as_of()),
        Ok(Value::Text("ca".to_string()))
    );
    assert_eq!(resolve(&app, CriteriaType::BankruptcyFlag, as_of()), Ok(Value::Bool(false)));
    assert_eq!(resolve(&app, CriteriaType::EquipmentAge, as_of()), Ok(Value::Number(5.0)));
}

#[test]
fn test_resolve_unknown_criteria() {
    let app = create_application(720, 50_000.0);
    let result = resolve_named(&app, "favorite_color", as_of());

    assert_eq!(result, Err(EvaluationError::UnknownCriteria("favorite_color".to_string())));
}

#[test]
fn test_resolve_missing_optional_value() {
    let app = create_application(720, 50_000.0);

    assert_eq!(
        resolve(&app, CriteriaType::PaynetScore, as_of()),
        Err(EvaluationError::MissingValue(CriteriaType::PaynetScore))
    );
    assert_eq!(
        resolve(&app, CriteriaType::BankruptcyDate, as_of()),
        Err(EvaluationError::MissingValue(CriteriaType::BankruptcyDate))
    );
}

#[test]
fn test_resolve_years_since_bankruptcy() {
    let mut app = create_application(720, 50_000.0);
    assert_eq!(
        resolve(&app, CriteriaType::YearsSinceBankruptcy, as_of()),
        Ok(Value::Number(f64::INFINITY))
    );

    app.guarantor.bankruptcy_flag = true;
    app.guarantor.bankruptcy_date = NaiveDate::from_ymd_opt(2015, 6, 1);
    let years = resolve(&app, CriteriaType::YearsSinceBankruptcy, as_of())
        .unwrap()
        .as_number()
        .unwrap();
    assert!((years - 10.0).abs() < 0.01);
}

#[test]
fn test_operator_boundaries() {
    let score = Value::Number(680.0);

    assert_eq!(evaluate(&score, Operator::AtLeast, &num(680.0)), Ok(true));
    assert_eq!(evaluate(&score, Operator::Above, &num(680.0)), Ok(false));
    assert_eq!(evaluate(&score, Operator::AtMost, &num(680.0)), Ok(true));
    assert_eq!(evaluate(&score, Operator::Below, &num(680.0)), Ok(false));
    assert_eq!(evaluate(&Value::Number(679.0), Operator::AtLeast, &num(680.0)), Ok(false));
}

#[test]
fn test_operator_membership_case_insensitive() {
    let states = PolicyValue::Set(vec![
        Value::Text("CA".to_string()),
        Value::Text("NY".to_string()),
        Value::Text("TX".to_string()),
    ]);
    let state = Value::Text("ca".to_string());

    assert_eq!(evaluate(&state, Operator::In, &states), Ok(true));
    assert_eq!(evaluate(&state, Operator::NotIn, &states), Ok(false));
    assert_eq!(evaluate(&Value::Text("OR".to_string()), Operator::In, &states), Ok(false));
}

#[test]
fn test_operator_type_mismatch() {
    let text = Value::Text("Construction".to_string());
    assert!(matches!(
        evaluate(&text, Operator::AtLeast, &num(3.0)),
        Err(EvaluationError::TypeMismatch(_))
    ));

    assert!(matches!(
        evaluate(&Value::Number(5.0), Operator::In, &num(5.0)),
        Err(EvaluationError::TypeMismatch(_))
    ));
}

#[test]
fn test_policy_compiles_to_rule() {
    let raw = PolicyRule::new("fico_score", ">=", 680);
    let policy = Policy::try_from(&raw).unwrap();

    assert_eq!(policy.criteria(), CriteriaType::FicoScore);
    assert_eq!(policy.operator(), Operator::AtLeast);
    assert!(matches!(policy.rule(), Rule::Threshold { .. }));

    let raw = PolicyRule::new("state", "in", json!(["CA", "NY"]));
    assert!(matches!(
        Policy::try_from(&raw).unwrap().rule(),
        Rule::Membership { negated: false, .. }
    ));
}

#[test]
fn test_policy_rejects_unsatisfiable_shapes() {
    let scalar_in = PolicyRule::new("state", "in", "CA");
    assert!(matches!(Policy::try_from(&scalar_in), Err(EvaluationError::TypeMismatch(_))));

    let ordered_text = PolicyRule::new("industry", ">=", "Construction");
    assert!(matches!(Policy::try_from(&ordered_text), Err(EvaluationError::TypeMismatch(_))));

    let bad_operator = PolicyRule::new("fico_score", "~=", 680);
    assert_eq!(
        Policy::try_from(&bad_operator),
        Err(EvaluationError::UnsupportedOperator("~=".to_string()))
    );
}

#[test]
fn test_program_all_reasons_reported() {
    let app = create_application(650, 50_000.0);
    let program = create_program(
        Some(100_000.0),
        Some(500_000.0),
        vec![
            PolicyRule::new("fico_score", ">=", 700),
            PolicyRule::new("years_in_business", ">=", 10),
        ],
    );

    let outcome = evaluate_program(&app, &program, as_of()).unwrap();

    assert!(!outcome.eligible);
    assert_eq!(
        outcome.failures,
        vec![
            "Requested amount $50,000 is outside program range $100,000 - $500,000".to_string(),
            "FICO score 650 does not meet minimum 700".to_string(),
            "Years in business 6 does not meet minimum 10".to_string(),
        ]
    );
}

#[test]
fn test_program_missing_value_fails_one_policy() {
    let app = create_application(720, 50_000.0);
    let program = create_program(
        None,
        None,
        vec![
            PolicyRule::new("paynet_score", ">=", 650),
            PolicyRule::new("fico_score", ">=", 680),
        ],
    );

    let outcome = evaluate_program(&app, &program, as_of()).unwrap();

    assert!(!outcome.eligible);
    assert_eq!(outcome.failures, vec!["PayNet score is unavailable for this application".to_string()]);
    assert_eq!(outcome.passed.len(), 1);
}

#[test]
fn test_program_inverted_bounds_is_error() {
    let app = create_application(720, 50_000.0);
    let program = create_program(Some(100_000.0), Some(10_000.0), vec![]);

    assert_eq!(
        evaluate_program(&app, &program, as_of()),
        Err(EvaluationError::InvalidProgramBounds { min: 100_000.0, max: 10_000.0 })
    );
    assert_eq!(program_diagnostics(&program).len(), 1);
}

#[test]
fn test_program_diagnostics_lists_bad_policies() {
    let program = create_program(
        Some(10_000.0),
        Some(100_000.0),
        vec![
            PolicyRule::new("fico_score", ">=", 680),
            PolicyRule::new("credit_vibes", ">=", 3),
            PolicyRule::new("state", "in", "CA"),
        ],
    );

    let problems = program_diagnostics(&program);
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0], EvaluationError::UnknownCriteria("credit_vibes".to_string()));
}

#[test]
fn test_fit_score_bounds() {
    let config = ScoringConfig::default();
    let app = create_application(850, 50_000.0);
    let program = create_program(
        Some(10_000.0),
        Some(100_000.0),
        vec![PolicyRule::new("fico_score", ">=", 300)],
    );

    let outcome = evaluate_program(&app, &program, as_of()).unwrap();
    assert_eq!(calculate_fit_score(&outcome.passed, &config), 100);

    let app = create_application(680, 50_000.0);
    let program = create_program(None, None, vec![PolicyRule::new("fico_score", ">=", 680)]);
    let outcome = evaluate_program(&app, &program, as_of()).unwrap();
    assert_eq!(calculate_fit_score(&outcome.passed, &config), 0);
}

#[test]
fn test_application_validation() {
    let app = create_application(720, 50_000.0);
    assert!(app.validate().is_ok());

    let mut low_fico = app.clone();
    low_fico.guarantor.fico_score = 250;
    assert!(low_fico.validate().is_err());

    let mut undated_bankruptcy = app.clone();
    undated_bankruptcy.guarantor.bankruptcy_flag = true;
    assert!(undated_bankruptcy.validate().is_err());

    let mut bad_state = app;
    bad_state.business.state = "Texas".to_string();
    assert!(bad_state.validate().is_err());
}
