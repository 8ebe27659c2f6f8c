use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::composer;
use super::domain::{ApplicationId, DecisionRequest, DecisionResponse, DecisionType, UserId};
use super::policy::DecisionPolicy;
use super::repository::{DecisionRepository, RulesRepository};
use super::risk::{RiskAssessment, RiskModel};
use super::rules::{
    evaluate_rules, DecisionRule, RuleBook, RuleCategory, RuleConfigurationError, RuleSet,
};
use super::validation::{validate_request, RequestValidationError};
use crate::workflows::repository::{OperationContext, RepositoryError};

/// Reviewer verdict applied to a decision that was flagged for manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub reviewer_id: UserId,
    pub decision: DecisionType,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_amount: Option<f64>,
}

/// Service composing validation, the risk model, the rule book, and decision storage.
pub struct DecisionService<D, R> {
    decisions: Arc<D>,
    rules: Arc<R>,
    book: RuleBook,
    rule_writes: Mutex<()>,
    model: RiskModel,
    policy: DecisionPolicy,
}

/// Committed rule store write, replayed onto the live set when storage cannot be re-read.
enum RuleChange<'a> {
    Upsert(&'a DecisionRule),
    Remove(&'a str),
}

impl RuleChange<'_> {
    fn rule_id(&self) -> &str {
        match self {
            RuleChange::Upsert(rule) => &rule.id,
            RuleChange::Remove(rule_id) => rule_id,
        }
    }
}

impl<D, R> DecisionService<D, R>
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    /// Build a service with an empty rule book; call [`Self::refresh_rules`] to load rules.
    pub fn new(decisions: Arc<D>, rules: Arc<R>, policy: DecisionPolicy) -> Self {
        let model = RiskModel::new(policy.risk_model);
        Self {
            decisions,
            rules,
            book: RuleBook::default(),
            rule_writes: Mutex::new(()),
            model,
            policy,
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn validate_request(&self, request: &DecisionRequest) -> Result<(), DecisionError> {
        validate_request(request, &self.policy)?;
        Ok(())
    }

    /// Validate and assess a request without composing or storing a decision.
    pub fn assess_risk(&self, request: &DecisionRequest) -> Result<RiskAssessment, DecisionError> {
        self.validate_request(request)?;
        Ok(self.model.assess(request))
    }

    /// Produce, persist, and return the decision for a request.
    pub fn make_decision(
        &self,
        ctx: &OperationContext,
        request: &DecisionRequest,
    ) -> Result<DecisionResponse, DecisionError> {
        if let Err(error) = validate_request(request, &self.policy) {
            warn!(
                application_id = %request.application_id,
                code = error.code(),
                "decision request rejected"
            );
            return Err(error.into());
        }

        let assessment = self.model.assess(request);
        let rules = self.book.snapshot();
        let matched = evaluate_rules(request, &assessment, &rules);
        let decision = composer::compose(request, &assessment, &matched, &self.policy, Utc::now());

        ctx.check()?;
        self.decisions.save_decision(ctx, &decision)?;

        info!(
            application_id = %decision.application_id,
            decision = decision.decision.label(),
            risk_score = decision.risk_score,
            risk_category = decision.risk_category.label(),
            review_required = decision.review_required,
            "decision completed"
        );

        Ok(decision)
    }

    pub fn get_decision(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<DecisionResponse, DecisionError> {
        ctx.check()?;
        self.decisions
            .get_decision(ctx, application_id)?
            .ok_or_else(|| DecisionError::NotFound(format!("decision for {application_id}")))
    }

    pub fn get_decision_history(
        &self,
        ctx: &OperationContext,
        user_id: &UserId,
    ) -> Result<Vec<DecisionResponse>, DecisionError> {
        ctx.check()?;
        Ok(self.decisions.get_decision_history(ctx, user_id)?)
    }

    /// Apply a reviewer's verdict to a decision awaiting manual review.
    pub fn record_review(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
        review: ReviewInput,
    ) -> Result<DecisionResponse, DecisionError> {
        let mut decision = self.get_decision(ctx, application_id)?;

        if !decision.review_required {
            return Err(DecisionError::InvalidReview(format!(
                "decision for {application_id} is not awaiting review"
            )));
        }
        if review.decision == DecisionType::ManualReview {
            return Err(DecisionError::InvalidReview(
                "a review must resolve to a final decision".to_string(),
            ));
        }

        decision.approved_amount = if review.decision.extends_credit() {
            let amount = review
                .approved_amount
                .or(decision.approved_amount)
                .filter(|amount| amount.is_finite() && *amount > 0.0)
                .ok_or_else(|| {
                    DecisionError::InvalidReview(
                        "an approved amount is required to extend credit".to_string(),
                    )
                })?;
            if amount > decision.requested_amount {
                return Err(DecisionError::InvalidReview(format!(
                    "approved amount {amount:.2} exceeds requested amount {:.2}",
                    decision.requested_amount
                )));
            }
            Some(amount)
        } else {
            None
        };

        let reviewed_at = Utc::now();
        decision.decision = review.decision;
        decision.review_required = false;
        decision.decision_reason = format!("manual review by {}", review.reviewer_id);
        decision.reviewer_notes = Some(review.notes);
        decision.expires_at = (review.decision == DecisionType::Approve).then(|| {
            reviewed_at + Duration::days(i64::from(self.policy.approval_validity_days))
        });

        ctx.check()?;
        self.decisions.update_decision(ctx, &decision)?;

        info!(
            application_id = %application_id,
            reviewer_id = %review.reviewer_id,
            decision = decision.decision.label(),
            "manual review recorded"
        );

        Ok(decision)
    }

    /// Rules currently used for evaluation, in evaluation order.
    pub fn active_rules(&self) -> Vec<DecisionRule> {
        self.book.snapshot().rules().to_vec()
    }

    /// Reload active rules from storage and swap them in as one snapshot.
    pub fn refresh_rules(&self, ctx: &OperationContext) -> Result<usize, DecisionError> {
        let _writes = self.lock_rule_writes();
        self.reload_rules(ctx)
    }

    /// Rule store writes and book swaps run one at a time so a stale read is never installed
    /// over a newer one.
    fn lock_rule_writes(&self) -> MutexGuard<'_, ()> {
        self.rule_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn reload_rules(&self, ctx: &OperationContext) -> Result<usize, DecisionError> {
        ctx.check()?;
        let stored = self.rules.get_active_rules(ctx)?;
        let compiled = RuleSet::compile(stored)?;
        let count = compiled.len();
        self.book.replace(compiled);
        info!(active_rules = count, "rule set refreshed");
        Ok(count)
    }

    /// Bring the book in line with a write storage has already accepted. Must be called with
    /// the rule write lock held.
    fn install_committed(&self, change: RuleChange<'_>) -> Result<(), DecisionError> {
        // Storage already holds the write; the reload ignores caller cancellation.
        let error = match self.reload_rules(&OperationContext::new()) {
            Ok(_) => return Ok(()),
            Err(error) => error,
        };
        warn!(
            rule_id = change.rule_id(),
            code = error.code(),
            "rule reload failed after write; applying the change to the live set"
        );

        let current = self.book.snapshot();
        let mut rules: Vec<DecisionRule> = current
            .rules()
            .iter()
            .filter(|rule| rule.id != change.rule_id())
            .cloned()
            .collect();
        if let RuleChange::Upsert(rule) = change {
            rules.push(rule.clone());
        }
        self.book.replace(RuleSet::compile(rules)?);
        Ok(())
    }

    pub fn get_rule(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
    ) -> Result<DecisionRule, DecisionError> {
        ctx.check()?;
        self.rules
            .get_rule(ctx, rule_id)?
            .ok_or_else(|| DecisionError::NotFound(format!("rule {rule_id}")))
    }

    pub fn rules_by_category(
        &self,
        ctx: &OperationContext,
        category: RuleCategory,
    ) -> Result<Vec<DecisionRule>, DecisionError> {
        ctx.check()?;
        Ok(self.rules.get_rules_by_category(ctx, category)?)
    }

    pub fn add_rule(
        &self,
        ctx: &OperationContext,
        mut rule: DecisionRule,
    ) -> Result<DecisionRule, DecisionError> {
        rule.validate()?;
        let now = Utc::now();
        rule.created_at = now;
        rule.updated_at = now;

        let _writes = self.lock_rule_writes();
        ctx.check()?;
        self.rules
            .save_rule(ctx, rule.clone())
            .map_err(|error| match error {
                RepositoryError::Conflict => DecisionError::Duplicate(format!("rule {}", rule.id)),
                other => other.into(),
            })?;
        info!(rule_id = %rule.id, priority = rule.priority, "rule added");

        self.install_committed(RuleChange::Upsert(&rule))?;
        Ok(rule)
    }

    pub fn update_rule(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
        mut rule: DecisionRule,
    ) -> Result<DecisionRule, DecisionError> {
        if rule.id != rule_id {
            return Err(RuleConfigurationError::IdMismatch {
                path: rule_id.to_string(),
                payload: rule.id,
            }
            .into());
        }
        rule.validate()?;

        let _writes = self.lock_rule_writes();
        let existing = self.get_rule(ctx, rule_id)?;
        rule.created_at = existing.created_at;
        rule.updated_at = Utc::now();

        ctx.check()?;
        self.rules.update_rule(ctx, rule.clone())?;
        info!(rule_id = %rule.id, active = rule.active, "rule updated");

        self.install_committed(RuleChange::Upsert(&rule))?;
        Ok(rule)
    }

    pub fn set_rule_active(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
        active: bool,
    ) -> Result<DecisionRule, DecisionError> {
        let _writes = self.lock_rule_writes();
        let mut rule = self.get_rule(ctx, rule_id)?;
        rule.active = active;
        rule.updated_at = Utc::now();

        ctx.check()?;
        self.rules.update_rule(ctx, rule.clone())?;
        info!(rule_id = %rule.id, active, "rule activation changed");

        self.install_committed(RuleChange::Upsert(&rule))?;
        Ok(rule)
    }

    pub fn delete_rule(&self, ctx: &OperationContext, rule_id: &str) -> Result<(), DecisionError> {
        let _writes = self.lock_rule_writes();
        ctx.check()?;
        self.rules.delete_rule(ctx, rule_id)?;
        info!(rule_id, "rule deleted");

        self.install_committed(RuleChange::Remove(rule_id))?;
        Ok(())
    }
}

/// Error raised by the decision service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    Validation(#[from] RequestValidationError),
    #[error(transparent)]
    RuleConfiguration(#[from] RuleConfigurationError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("invalid review: {0}")]
    InvalidReview(String),
    #[error("collaborator failure: {0}")]
    Collaborator(RepositoryError),
    #[error("operation cancelled")]
    Cancelled,
}

impl DecisionError {
    pub const fn code(&self) -> &'static str {
        match self {
            DecisionError::Validation(_) => "request_validation",
            DecisionError::RuleConfiguration(_) => "rule_configuration",
            DecisionError::NotFound(_) => "not_found",
            DecisionError::Duplicate(_) => "conflict",
            DecisionError::InvalidReview(_) => "invalid_review",
            DecisionError::Collaborator(_) => "collaborator_failure",
            DecisionError::Cancelled => "cancelled",
        }
    }
}

impl From<RepositoryError> for DecisionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Cancelled => DecisionError::Cancelled,
            RepositoryError::NotFound => DecisionError::NotFound("record".to_string()),
            RepositoryError::Conflict => DecisionError::Duplicate("record".to_string()),
            other => DecisionError::Collaborator(other),
        }
    }
}
