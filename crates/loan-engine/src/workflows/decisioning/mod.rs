//! Automated lending decisions: request validation, the risk model, declarative rule matching,
//! decision composition with pricing, and the storage ports behind them.

pub(crate) mod composer;
pub mod domain;
pub mod policy;
pub(crate) mod pricing;
pub mod repository;
pub mod risk;
pub mod router;
pub mod rules;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, DecisionRequest, DecisionResponse, DecisionType, EmploymentType, Impact,
    LoanPurpose, RiskCategory, RiskDimension, RiskFactor, UserId,
};
pub use policy::DecisionPolicy;
pub use repository::{DecisionRepository, RulesRepository};
pub use risk::{
    categorize_risk, credit_band, CategoryScores, DtiBucket, RiskAssessment, RiskModel,
    RiskModelConfig,
};
pub use router::decision_router;
pub use rules::{
    evaluate_rules, ActionType, Adjustment, DecisionRule, MatchedAction, Operator, RuleAction,
    RuleBook, RuleCategory, RuleCondition, RuleConfigurationError, RuleSet, RuleValue,
};
pub use service::{DecisionError, DecisionService, ReviewInput};
pub use validation::{validate_request, RequestValidationError};
