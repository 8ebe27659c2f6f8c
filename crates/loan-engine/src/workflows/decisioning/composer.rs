use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::domain::{DecisionRequest, DecisionResponse, DecisionType, EmploymentType, RiskCategory};
use super::policy::DecisionPolicy;
use super::pricing;
use super::risk::RiskAssessment;
use super::rules::{ActionType, Adjustment, MatchedAction};

const INCOME_VERIFICATION_CONDITION: &str = "Income verification required";

/// Running totals of every adjustment contributed by matched rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AdjustmentTotals {
    pub rate_delta: f64,
    pub amount_cap: Option<f64>,
    pub amount_factor: f64,
}

impl Default for AdjustmentTotals {
    fn default() -> Self {
        Self {
            rate_delta: 0.0,
            amount_cap: None,
            amount_factor: 1.0,
        }
    }
}

impl AdjustmentTotals {
    fn absorb(&mut self, adjustment: Adjustment) {
        match adjustment {
            Adjustment::InterestRateDelta(delta) => self.rate_delta += delta,
            Adjustment::AmountCap(cap) => {
                self.amount_cap = Some(self.amount_cap.map_or(cap, |current| current.min(cap)));
            }
            Adjustment::AmountFactor(factor) => self.amount_factor *= factor,
        }
    }

    fn approved_amount(&self, requested: f64) -> f64 {
        let mut amount = requested * self.amount_factor;
        if let Some(cap) = self.amount_cap {
            amount = amount.min(cap);
        }
        let bounded = amount.clamp(0.0, requested);
        (bounded * 100.0).round() / 100.0
    }
}

/// Decision the policy would reach with no rule intervention.
pub(crate) fn default_decision(
    request: &DecisionRequest,
    assessment: &RiskAssessment,
    policy: &DecisionPolicy,
) -> (DecisionType, String, Vec<String>) {
    let mut conditions = Vec::new();

    let (mut decision, mut reason) = match assessment.risk_category {
        RiskCategory::Low | RiskCategory::Medium => (
            DecisionType::Approve,
            format!(
                "{} risk profile meets approval criteria",
                assessment.risk_category.label()
            ),
        ),
        RiskCategory::High => (
            DecisionType::Conditional,
            "HIGH risk profile requires additional conditions".to_string(),
        ),
        RiskCategory::Critical => (
            DecisionType::Deny,
            "CRITICAL risk profile does not meet lending criteria".to_string(),
        ),
    };

    if request.credit_score < policy.min_credit_score {
        return (
            DecisionType::Deny,
            format!(
                "credit score {} below minimum {}",
                request.credit_score, policy.min_credit_score
            ),
            conditions,
        );
    }

    if decision.extends_credit() && assessment.dti_ratio > policy.max_dti_ratio {
        decision = DecisionType::ManualReview;
        reason = format!(
            "DTI ratio {:.2} exceeds maximum {:.2}",
            assessment.dti_ratio, policy.max_dti_ratio
        );
    }

    if decision == DecisionType::Approve && request.annual_income < policy.min_annual_income {
        decision = DecisionType::Conditional;
        reason = format!(
            "annual income {:.0} below minimum {:.0}",
            request.annual_income, policy.min_annual_income
        );
        conditions.push(INCOME_VERIFICATION_CONDITION.to_string());
    }

    (decision, reason, conditions)
}

fn standard_conditions(assessment: &RiskAssessment) -> Vec<String> {
    let mut conditions = Vec::new();
    if assessment.dti_ratio > 0.35 && assessment.dti_ratio <= 0.40 {
        conditions.push("Debt-to-income ratio monitoring required".to_string());
    }
    if assessment.category_scores.credit > 60.0 {
        conditions.push("Credit improvement plan required".to_string());
    }
    if assessment.category_scores.employment > 50.0 {
        conditions.push("Employment verification within 30 days".to_string());
    }
    conditions
}

fn standard_documents(request: &DecisionRequest, assessment: &RiskAssessment) -> Vec<String> {
    let mut documents = vec!["Government ID".to_string(), "Proof of income".to_string()];

    match request.employment_type {
        EmploymentType::SelfEmployed => documents.extend(
            ["Tax returns (2 years)", "Business license", "Bank statements (6 months)"]
                .map(String::from),
        ),
        EmploymentType::Contract => documents
            .extend(["Contract agreement", "Previous year tax return"].map(String::from)),
        _ => {}
    }

    if assessment.category_scores.income > 50.0 {
        documents
            .extend(["Additional income verification", "Employment letter"].map(String::from));
    }
    if assessment.dti_ratio > 0.35 {
        documents.extend(["Debt statements", "Monthly budget plan"].map(String::from));
    }

    documents
}

fn push_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Merge the assessment and matched rule actions into a final, priced decision.
pub(crate) fn compose(
    request: &DecisionRequest,
    assessment: &RiskAssessment,
    matched: &[MatchedAction],
    policy: &DecisionPolicy,
    decided_at: DateTime<Utc>,
) -> DecisionResponse {
    let (mut decision, mut reason, policy_conditions) =
        default_decision(request, assessment, policy);

    let mut totals = AdjustmentTotals::default();
    let mut review_required = false;
    let mut decided_by_rule = false;
    let mut conditions = Vec::new();
    let mut documents = Vec::new();
    let mut applied_rules = Vec::with_capacity(matched.len());

    for entry in matched {
        let action = &entry.action;
        applied_rules.push(entry.rule_id.clone());

        match action.action_type {
            ActionType::Decision => {
                if let (false, Some(outcome)) = (decided_by_rule, action.decision) {
                    decision = outcome;
                    reason = action.reason.clone();
                    decided_by_rule = true;
                }
            }
            ActionType::Flag => review_required = true,
            ActionType::Adjustment | ActionType::Requirement => {}
        }

        for adjustment in &action.adjustments {
            totals.absorb(*adjustment);
        }
        push_unique(&mut conditions, action.conditions.iter().cloned());
        push_unique(&mut documents, action.documents.iter().cloned());
        review_required |= action.require_review;
    }

    if assessment.risk_category == RiskCategory::Critical {
        if decision != DecisionType::Deny {
            reason = format!("CRITICAL risk overrides rule outcome: {reason}");
        }
        decision = DecisionType::Deny;
        review_required = true;
    }

    if decision == DecisionType::ManualReview {
        review_required = true;
    }

    let mut merged_conditions = policy_conditions;
    push_unique(&mut merged_conditions, standard_conditions(assessment));
    push_unique(&mut merged_conditions, conditions);

    let mut merged_documents = standard_documents(request, assessment);
    push_unique(&mut merged_documents, documents);

    let approved_amount = decision
        .extends_credit()
        .then(|| totals.approved_amount(request.loan_amount));

    let expires_at = (decision == DecisionType::Approve)
        .then(|| decided_at + Duration::days(i64::from(policy.approval_validity_days)));

    let interest_rate = pricing::interest_rate(request, assessment, totals.rate_delta, policy);

    debug!(
        application_id = %request.application_id,
        decision = decision.label(),
        matched_rules = applied_rules.len(),
        review_required,
        "decision composed"
    );

    DecisionResponse {
        application_id: request.application_id.clone(),
        user_id: request.user_id.clone(),
        decision,
        risk_score: assessment.overall_score,
        risk_category: assessment.risk_category,
        interest_rate,
        requested_amount: request.loan_amount,
        approved_amount,
        decision_reason: reason,
        risk_factors: assessment.risk_factors.clone(),
        conditions: merged_conditions,
        required_documents: merged_documents,
        decided_at,
        expires_at,
        review_required,
        reviewer_notes: None,
        applied_rules,
    }
}
