use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::RuleValue;

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the applicant (or an acting staff member).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    SelfEmployed,
    Unemployed,
    Retired,
}

impl EmploymentType {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::Contract => "contract",
            EmploymentType::SelfEmployed => "self_employed",
            EmploymentType::Unemployed => "unemployed",
            EmploymentType::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    Personal,
    DebtConsolidation,
    HomeImprovement,
    Business,
    Education,
    Medical,
    Vacation,
    Other,
}

impl LoanPurpose {
    pub const fn label(self) -> &'static str {
        match self {
            LoanPurpose::Personal => "personal",
            LoanPurpose::DebtConsolidation => "debt_consolidation",
            LoanPurpose::HomeImprovement => "home_improvement",
            LoanPurpose::Business => "business",
            LoanPurpose::Education => "education",
            LoanPurpose::Medical => "medical",
            LoanPurpose::Vacation => "vacation",
            LoanPurpose::Other => "other",
        }
    }
}

/// Inbound request for an automated lending decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub loan_amount: f64,
    pub annual_income: f64,
    pub monthly_income: f64,
    #[serde(default)]
    pub monthly_debt: f64,
    pub credit_score: u16,
    pub employment_type: EmploymentType,
    pub requested_term: u16,
    pub loan_purpose: LoanPurpose,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_data: BTreeMap<String, RuleValue>,
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
}

impl DecisionRequest {
    /// Monthly debt over monthly income; zero when there is no monthly income to divide by.
    pub fn dti_ratio(&self) -> f64 {
        if self.monthly_income <= 0.0 {
            return 0.0;
        }
        self.monthly_debt / self.monthly_income
    }

    pub fn loan_to_income_ratio(&self) -> f64 {
        if self.annual_income <= 0.0 {
            return 0.0;
        }
        self.loan_amount / self.annual_income
    }

    pub(crate) fn additional_number(&self, key: &str) -> Option<f64> {
        self.additional_data.get(key).and_then(RuleValue::as_number)
    }
}

/// Final outcome of an automated decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    Approve,
    Conditional,
    ManualReview,
    Deny,
}

impl DecisionType {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionType::Approve => "APPROVE",
            DecisionType::Conditional => "CONDITIONAL",
            DecisionType::ManualReview => "MANUAL_REVIEW",
            DecisionType::Deny => "DENY",
        }
    }

    /// Decisions that extend credit and therefore carry an approved amount.
    pub const fn extends_credit(self) -> bool {
        matches!(self, DecisionType::Approve | DecisionType::Conditional)
    }
}

/// Qualitative risk bucket, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
            RiskCategory::Critical => "CRITICAL",
        }
    }
}

/// Dimension a risk factor was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDimension {
    Credit,
    Income,
    Debt,
    Employment,
    Collateral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Individual adverse signal surfaced for adverse-action notices and reviewer context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: RiskDimension,
    pub factor: String,
    pub impact: Impact,
    pub score: f64,
    pub description: String,
}

/// Auditable decision produced for an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub decision: DecisionType,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    pub interest_rate: f64,
    pub requested_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_amount: Option<f64>,
    pub decision_reason: String,
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_documents: Vec<String>,
    pub decided_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub review_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_rules: Vec<String>,
}

impl DecisionResponse {
    pub fn summary(&self) -> String {
        match self.decision {
            DecisionType::Approve => match self.approved_amount {
                Some(amount) => format!(
                    "approved {:.2} at {:.2}%: {}",
                    amount, self.interest_rate, self.decision_reason
                ),
                None => format!("approved: {}", self.decision_reason),
            },
            DecisionType::Conditional => {
                if self.conditions.is_empty() {
                    format!("conditional approval: {}", self.decision_reason)
                } else {
                    format!("conditional approval: {}", self.conditions.join(", "))
                }
            }
            DecisionType::ManualReview => {
                format!("manual review required: {}", self.decision_reason)
            }
            DecisionType::Deny => format!("denied: {}", self.decision_reason),
        }
    }
}
