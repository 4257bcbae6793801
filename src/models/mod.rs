// Model exports
pub mod domain;
pub mod policy;
pub mod responses;

pub use domain::{Application, Business, BusinessCredit, Guarantor, LoanRequest, Lender, Program, Catalog, MatchResult, ExcludedProgram};
pub use policy::{CriteriaType, ValueKind, Value, Operator, Comparison, PolicyValue, PolicyRule, Rule, Policy};
pub use responses::MatchReport;
