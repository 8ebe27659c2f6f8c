mod book;
mod matcher;
mod value;

pub use book::RuleBook;
pub use matcher::{evaluate_rules, FactSheet, MatchedAction};
pub use value::{Operator, RuleValue, ValueKind};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::DecisionType;

/// Grouping used by the rules administration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    Credit,
    Income,
    Debt,
    Employment,
    General,
}

impl RuleCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RuleCategory::Credit => "CREDIT",
            RuleCategory::Income => "INCOME",
            RuleCategory::Debt => "DEBT",
            RuleCategory::Employment => "EMPLOYMENT",
            RuleCategory::General => "GENERAL",
        }
    }
}

/// Single predicate over a named fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub operator: Operator,
    pub value: RuleValue,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<RuleValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Decision,
    Adjustment,
    Requirement,
    Flag,
}

/// Numeric effect a matched rule applies to the offer terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
    /// Percentage points added to the priced interest rate; deltas from all rules sum.
    InterestRateDelta(f64),
    /// Upper bound on the approved amount; the lowest cap wins.
    AmountCap(f64),
    /// Fraction of the requested amount to approve; factors multiply.
    AmountFactor(f64),
}

impl Adjustment {
    fn check(&self) -> Result<(), String> {
        match *self {
            Adjustment::InterestRateDelta(delta) if !delta.is_finite() => {
                Err("interest rate delta must be finite".to_string())
            }
            Adjustment::AmountCap(cap) if !cap.is_finite() || cap < 0.0 => {
                Err(format!("amount cap {cap} must be a non-negative number"))
            }
            Adjustment::AmountFactor(factor) if !factor.is_finite() || !(0.0..=1.0).contains(&factor) => {
                Err(format!("amount factor {factor} must lie within [0, 1]"))
            }
            _ => Ok(()),
        }
    }
}

/// Effect contributed by a rule once all of its conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionType>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<Adjustment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub require_review: bool,
}

impl RuleAction {
    pub fn decision(decision: DecisionType, reason: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Decision,
            decision: Some(decision),
            reason: reason.into(),
            adjustments: Vec::new(),
            documents: Vec::new(),
            conditions: Vec::new(),
            require_review: false,
        }
    }

    pub fn adjustment(adjustments: Vec<Adjustment>, reason: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Adjustment,
            decision: None,
            reason: reason.into(),
            adjustments,
            documents: Vec::new(),
            conditions: Vec::new(),
            require_review: false,
        }
    }

    pub fn requirement(
        documents: Vec<String>,
        conditions: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action_type: ActionType::Requirement,
            decision: None,
            reason: reason.into(),
            adjustments: Vec::new(),
            documents,
            conditions,
            require_review: false,
        }
    }

    pub fn flag(reason: impl Into<String>) -> Self {
        Self {
            action_type: ActionType::Flag,
            decision: None,
            reason: reason.into(),
            adjustments: Vec::new(),
            documents: Vec::new(),
            conditions: Vec::new(),
            require_review: true,
        }
    }
}

/// Declarative business rule managed through the rules administration path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: RuleCategory,
    pub priority: i32,
    pub conditions: Vec<RuleCondition>,
    pub action: RuleAction,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn default_active() -> bool {
    true
}

impl DecisionRule {
    /// Reject rules that could never evaluate meaningfully before they reach storage.
    pub fn validate(&self) -> Result<(), RuleConfigurationError> {
        let rule_id = self.id.trim();
        if rule_id.is_empty() {
            return Err(RuleConfigurationError::MissingId);
        }

        if self.conditions.is_empty() {
            return Err(RuleConfigurationError::NoConditions {
                rule_id: self.id.clone(),
            });
        }

        for (index, condition) in self.conditions.iter().enumerate() {
            if condition.field.trim().is_empty() {
                return Err(RuleConfigurationError::InvalidCondition {
                    rule_id: self.id.clone(),
                    index,
                    detail: "condition field is empty".to_string(),
                });
            }

            condition
                .operator
                .accepts_operand(&condition.value)
                .map_err(|detail| RuleConfigurationError::InvalidCondition {
                    rule_id: self.id.clone(),
                    index,
                    detail,
                })?;
        }

        let action = &self.action;
        if action.action_type == ActionType::Decision && action.decision.is_none() {
            return Err(RuleConfigurationError::InvalidAction {
                rule_id: self.id.clone(),
                detail: "decision action must name a decision".to_string(),
            });
        }

        for adjustment in &action.adjustments {
            adjustment
                .check()
                .map_err(|detail| RuleConfigurationError::InvalidAction {
                    rule_id: self.id.clone(),
                    detail,
                })?;
        }

        Ok(())
    }
}

/// Raised when a rule fails validation on the administration path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleConfigurationError {
    #[error("rule id is required")]
    MissingId,
    #[error("rule '{rule_id}' has no conditions")]
    NoConditions { rule_id: String },
    #[error("rule '{rule_id}' condition #{index} is invalid: {detail}")]
    InvalidCondition {
        rule_id: String,
        index: usize,
        detail: String,
    },
    #[error("rule '{rule_id}' action is invalid: {detail}")]
    InvalidAction { rule_id: String, detail: String },
    #[error("rule id in path '{path}' does not match payload '{payload}'")]
    IdMismatch { path: String, payload: String },
}

/// Validated, evaluation-ordered collection of active rules.
///
/// Immutable once built; rule changes produce a new set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<DecisionRule>,
}

impl RuleSet {
    pub fn compile(rules: Vec<DecisionRule>) -> Result<Self, RuleConfigurationError> {
        let mut active = Vec::with_capacity(rules.len());
        for rule in rules {
            rule.validate()?;
            if rule.active {
                active.push(rule);
            }
        }

        active.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then_with(|| left.created_at.cmp(&right.created_at))
                .then_with(|| left.id.cmp(&right.id))
        });

        Ok(Self { rules: active })
    }

    pub fn rules(&self) -> &[DecisionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
