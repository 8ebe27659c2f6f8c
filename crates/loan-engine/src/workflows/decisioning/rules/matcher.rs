use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::DecisionRequest;
use super::super::risk::RiskAssessment;
use super::{DecisionRule, RuleAction, RuleCategory, RuleSet, RuleValue};

/// Merged, read-only view of every field a rule condition may reference.
///
/// Built-in request and assessment fields shadow `additional_data` entries of the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactSheet {
    facts: BTreeMap<String, RuleValue>,
}

impl FactSheet {
    pub fn from_inputs(request: &DecisionRequest, assessment: &RiskAssessment) -> Self {
        let mut facts = request.additional_data.clone();

        let mut put = |name: &str, value: RuleValue| {
            facts.insert(name.to_string(), value);
        };

        put("application_id", RuleValue::text(&request.application_id.0));
        put("user_id", RuleValue::text(&request.user_id.0));
        put("loan_amount", RuleValue::Number(request.loan_amount));
        put("annual_income", RuleValue::Number(request.annual_income));
        put("monthly_income", RuleValue::Number(request.monthly_income));
        put("monthly_debt", RuleValue::Number(request.monthly_debt));
        put("credit_score", RuleValue::Number(f64::from(request.credit_score)));
        put(
            "employment_type",
            RuleValue::text(request.employment_type.label()),
        );
        put(
            "requested_term",
            RuleValue::Number(f64::from(request.requested_term)),
        );
        put("loan_purpose", RuleValue::text(request.loan_purpose.label()));

        put("dti_ratio", RuleValue::Number(assessment.dti_ratio));
        put("dti_bucket", RuleValue::text(assessment.dti_bucket.label()));
        put("loan_to_income", RuleValue::Number(assessment.loan_to_income));
        put("risk_score", RuleValue::Number(assessment.overall_score));
        put(
            "risk_category",
            RuleValue::text(assessment.risk_category.label()),
        );
        put("credit_band", RuleValue::text(assessment.credit_band.label()));
        put(
            "credit_risk",
            RuleValue::Number(assessment.category_scores.credit),
        );
        put(
            "income_risk",
            RuleValue::Number(assessment.category_scores.income),
        );
        put("debt_risk", RuleValue::Number(assessment.category_scores.debt));
        put(
            "employment_risk",
            RuleValue::Number(assessment.category_scores.employment),
        );
        put(
            "collateral_risk",
            RuleValue::Number(assessment.category_scores.collateral),
        );
        put(
            "payment_score",
            RuleValue::Number(assessment.payment_history.payment_score),
        );
        if let Some(ltv) = assessment.ltv_ratio {
            put("ltv_ratio", RuleValue::Number(ltv));
        }
        if let Some(utilization) = assessment.credit_utilization {
            put("credit_utilization", RuleValue::Number(utilization));
        }

        Self { facts }
    }

    pub fn get(&self, field: &str) -> Option<&RuleValue> {
        self.facts.get(field)
    }

    fn satisfies(&self, rule: &DecisionRule) -> bool {
        rule.conditions.iter().all(|condition| {
            self.get(&condition.field)
                .map(|fact| condition.operator.evaluate(fact, &condition.value))
                .unwrap_or(false)
        })
    }
}

/// Action contributed by a matched rule, tagged with its provenance for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAction {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub action: RuleAction,
}

/// Collect the actions of every matching rule, in evaluation order.
pub fn evaluate_rules(
    request: &DecisionRequest,
    assessment: &RiskAssessment,
    rules: &RuleSet,
) -> Vec<MatchedAction> {
    let facts = FactSheet::from_inputs(request, assessment);

    rules
        .rules()
        .iter()
        .filter(|rule| rule.active && facts.satisfies(rule))
        .map(|rule| {
            debug!(
                application_id = %request.application_id,
                rule_id = %rule.id,
                priority = rule.priority,
                "rule matched"
            );
            MatchedAction {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                category: rule.category,
                priority: rule.priority,
                created_at: rule.created_at,
                action: rule.action.clone(),
            }
        })
        .collect()
}
