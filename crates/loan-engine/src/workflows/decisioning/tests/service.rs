use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::common::*;
use crate::workflows::decisioning::domain::{ApplicationId, DecisionType, UserId};
use crate::workflows::decisioning::repository::RulesRepository;
use crate::workflows::decisioning::rules::{
    DecisionRule, Operator, RuleAction, RuleCategory, RuleCondition, RuleConfigurationError,
};
use crate::workflows::decisioning::validation::RequestValidationError;
use crate::workflows::decisioning::{DecisionError, DecisionService, ReviewInput};
use crate::workflows::repository::{OperationContext, RepositoryError};

fn manual_review_rule() -> DecisionRule {
    rule(
        "large-loan-review",
        10,
        vec![RuleCondition::new("loan_amount", Operator::Gte, 15_000.0)],
        RuleAction::decision(DecisionType::ManualReview, "large loan sampling"),
    )
}

#[test]
fn make_decision_persists_the_response() {
    let (service, decisions, _) = build_service(Vec::new());
    let ctx = OperationContext::new();

    let decision = service
        .make_decision(&ctx, &prime_request())
        .expect("decision produced");

    assert_eq!(decision.decision, DecisionType::Approve);
    assert_eq!(decisions.save_count(), 1);
    assert_eq!(decisions.stored("app-001"), Some(decision));
}

#[test]
fn invalid_requests_are_rejected_before_any_write() {
    let (service, decisions, _) = build_service(Vec::new());
    let mut request = prime_request();
    request.credit_score = 900;

    match service.make_decision(&OperationContext::new(), &request) {
        Err(DecisionError::Validation(RequestValidationError::CreditScoreOutOfRange(900))) => {}
        other => panic!("expected credit score validation error, got {other:?}"),
    }
    assert_eq!(decisions.save_count(), 0);
}

#[test]
fn validation_errors_expose_machine_readable_codes() {
    let (service, _, _) = build_service(Vec::new());

    let mut request = prime_request();
    request.application_id = ApplicationId("  ".to_string());
    let error = service.validate_request(&request).expect_err("missing id");
    assert_eq!(error.code(), "request_validation");
    match error {
        DecisionError::Validation(inner) => assert_eq!(inner.code(), "missing_application_id"),
        other => panic!("unexpected error {other:?}"),
    }

    let mut request = prime_request();
    request.loan_amount = 500.0;
    assert!(matches!(
        service.validate_request(&request),
        Err(DecisionError::Validation(
            RequestValidationError::LoanAmountOutOfRange { .. }
        ))
    ));

    let mut request = prime_request();
    request.monthly_debt = -1.0;
    assert!(matches!(
        service.validate_request(&request),
        Err(DecisionError::Validation(RequestValidationError::NegativeAmount {
            field: "monthly_debt",
            ..
        }))
    ));

    let mut request = prime_request();
    request.requested_term = 6;
    assert!(matches!(
        service.validate_request(&request),
        Err(DecisionError::Validation(
            RequestValidationError::TermOutOfRange { term: 6, .. }
        ))
    ));
}

#[test]
fn decision_save_failure_is_surfaced() {
    let service = DecisionService::new(
        Arc::new(UnavailableDecisions),
        Arc::new(MemoryRules::default()),
        policy(),
    );

    match service.make_decision(&OperationContext::new(), &prime_request()) {
        Err(DecisionError::Collaborator(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected collaborator failure, got {other:?}"),
    }
}

#[test]
fn cancelled_context_stops_before_the_save() {
    let (service, decisions, _) = build_service(Vec::new());
    let ctx = OperationContext::new();
    ctx.cancel();

    assert_eq!(
        service.make_decision(&ctx, &prime_request()),
        Err(DecisionError::Cancelled)
    );
    assert_eq!(decisions.save_count(), 0);
}

#[test]
fn get_decision_reports_not_found() {
    let (service, _, _) = build_service(Vec::new());

    let error = service
        .get_decision(&OperationContext::new(), &ApplicationId("missing".to_string()))
        .expect_err("nothing stored");
    assert_eq!(error.code(), "not_found");
}

#[test]
fn decision_history_is_scoped_to_the_user() {
    let (service, _, _) = build_service(Vec::new());
    let ctx = OperationContext::new();

    service
        .make_decision(&ctx, &prime_request())
        .expect("first decision");
    service
        .make_decision(&ctx, &subprime_request())
        .expect("second decision");
    let mut other = prime_request();
    other.application_id = ApplicationId("app-900".to_string());
    other.user_id = UserId("user-900".to_string());
    service.make_decision(&ctx, &other).expect("other user");

    let history = service
        .get_decision_history(&ctx, &UserId("user-001".to_string()))
        .expect("history");
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|decision| decision.user_id.0 == "user-001"));
}

#[test]
fn record_review_resolves_a_manual_review_decision() {
    let (service, decisions, _) = build_service(vec![manual_review_rule()]);
    let ctx = OperationContext::new();

    let pending = service
        .make_decision(&ctx, &prime_request())
        .expect("decision");
    assert_eq!(pending.decision, DecisionType::ManualReview);
    assert!(pending.review_required);

    let reviewed = service
        .record_review(
            &ctx,
            &pending.application_id,
            ReviewInput {
                reviewer_id: UserId("underwriter-7".to_string()),
                decision: DecisionType::Approve,
                notes: "verified employer directly".to_string(),
                approved_amount: Some(18_000.0),
            },
        )
        .expect("review recorded");

    assert_eq!(reviewed.decision, DecisionType::Approve);
    assert!(!reviewed.review_required);
    assert_eq!(reviewed.approved_amount, Some(18_000.0));
    assert!(reviewed.expires_at.is_some());
    assert_eq!(decisions.stored("app-001"), Some(reviewed));
}

#[test]
fn record_review_rejects_decisions_not_awaiting_review() {
    let (service, _, _) = build_service(Vec::new());
    let ctx = OperationContext::new();
    service
        .make_decision(&ctx, &prime_request())
        .expect("decision");

    let error = service
        .record_review(
            &ctx,
            &ApplicationId("app-001".to_string()),
            ReviewInput {
                reviewer_id: UserId("underwriter-7".to_string()),
                decision: DecisionType::Deny,
                notes: "second look".to_string(),
                approved_amount: None,
            },
        )
        .expect_err("review not pending");
    assert_eq!(error.code(), "invalid_review");
}

#[test]
fn record_review_cannot_approve_more_than_was_requested() {
    let (service, decisions, _) = build_service(vec![manual_review_rule()]);
    let ctx = OperationContext::new();
    let pending = service
        .make_decision(&ctx, &prime_request())
        .expect("decision");
    assert_eq!(pending.requested_amount, 20_000.0);

    let error = service
        .record_review(
            &ctx,
            &pending.application_id,
            ReviewInput {
                reviewer_id: UserId("underwriter-7".to_string()),
                decision: DecisionType::Approve,
                notes: "approve in full".to_string(),
                approved_amount: Some(5_000_000.0),
            },
        )
        .expect_err("amount above request");

    assert_eq!(error.code(), "invalid_review");
    assert_eq!(decisions.stored("app-001"), Some(pending));
}

/// Rule store whose reads can be stalled once or failed outright.
#[derive(Default)]
struct ScriptedRules {
    inner: MemoryRules,
    stall_next_read: AtomicBool,
    fail_reads: AtomicBool,
}

impl RulesRepository for ScriptedRules {
    fn get_active_rules(
        &self,
        ctx: &OperationContext,
    ) -> Result<Vec<DecisionRule>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("replica lagging".to_string()));
        }
        let rules = self.inner.get_active_rules(ctx)?;
        if self.stall_next_read.swap(false, Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(300));
        }
        Ok(rules)
    }

    fn get_rules(&self, ctx: &OperationContext) -> Result<Vec<DecisionRule>, RepositoryError> {
        self.inner.get_rules(ctx)
    }

    fn get_rule(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
    ) -> Result<Option<DecisionRule>, RepositoryError> {
        self.inner.get_rule(ctx, rule_id)
    }

    fn save_rule(&self, ctx: &OperationContext, rule: DecisionRule) -> Result<(), RepositoryError> {
        self.inner.save_rule(ctx, rule)
    }

    fn update_rule(
        &self,
        ctx: &OperationContext,
        rule: DecisionRule,
    ) -> Result<(), RepositoryError> {
        self.inner.update_rule(ctx, rule)
    }

    fn delete_rule(&self, ctx: &OperationContext, rule_id: &str) -> Result<(), RepositoryError> {
        self.inner.delete_rule(ctx, rule_id)
    }

    fn get_rules_by_category(
        &self,
        ctx: &OperationContext,
        category: RuleCategory,
    ) -> Result<Vec<DecisionRule>, RepositoryError> {
        self.inner.get_rules_by_category(ctx, category)
    }
}

fn flag_rule(id: &str) -> DecisionRule {
    rule(
        id,
        50,
        vec![RuleCondition::new("loan_amount", Operator::Gt, 0.0)],
        RuleAction::flag("sampled"),
    )
}

fn active_ids(service: &DecisionService<MemoryDecisions, ScriptedRules>) -> Vec<String> {
    service
        .active_rules()
        .into_iter()
        .map(|rule| rule.id)
        .collect()
}

#[test]
fn concurrent_rule_additions_both_reach_the_live_set() {
    let store = Arc::new(ScriptedRules::default());
    let service = DecisionService::new(
        Arc::new(MemoryDecisions::default()),
        store.clone(),
        policy(),
    );
    store.stall_next_read.store(true, Ordering::SeqCst);

    thread::scope(|scope| {
        let first = scope.spawn(|| service.add_rule(&OperationContext::new(), flag_rule("rule-a")));
        thread::sleep(Duration::from_millis(50));
        service
            .add_rule(&OperationContext::new(), flag_rule("rule-b"))
            .expect("second rule added");
        first
            .join()
            .expect("writer thread")
            .expect("first rule added");
    });

    let stored = store
        .get_active_rules(&OperationContext::new())
        .expect("stored rules");
    assert_eq!(stored.len(), 2);
    assert_eq!(active_ids(&service), vec!["rule-a".to_string(), "rule-b".to_string()]);
}

#[test]
fn committed_rule_reaches_the_live_set_when_the_reload_fails() {
    let store = Arc::new(ScriptedRules::default());
    let service = DecisionService::new(
        Arc::new(MemoryDecisions::default()),
        store.clone(),
        policy(),
    );
    let ctx = OperationContext::new();
    service
        .add_rule(&ctx, flag_rule("rule-a"))
        .expect("first rule added");

    store.fail_reads.store(true, Ordering::SeqCst);
    service
        .add_rule(&ctx, flag_rule("rule-b"))
        .expect("write committed");
    assert_eq!(active_ids(&service), vec!["rule-a".to_string(), "rule-b".to_string()]);

    service.delete_rule(&ctx, "rule-a").expect("rule deleted");
    assert_eq!(active_ids(&service), vec!["rule-b".to_string()]);
}

#[test]
fn added_rules_take_effect_for_later_decisions() {
    let (service, _, _) = build_service(Vec::new());
    let ctx = OperationContext::new();

    service
        .add_rule(&ctx, manual_review_rule())
        .expect("rule added");
    assert_eq!(service.active_rules().len(), 1);

    let decision = service
        .make_decision(&ctx, &prime_request())
        .expect("decision");
    assert_eq!(decision.decision, DecisionType::ManualReview);
    assert_eq!(decision.applied_rules, vec!["large-loan-review".to_string()]);
}

#[test]
fn add_rule_rejects_invalid_and_duplicate_rules() {
    let (service, _, _) = build_service(vec![manual_review_rule()]);
    let ctx = OperationContext::new();

    let empty = rule("empty", 1, Vec::new(), RuleAction::flag("never"));
    assert_eq!(
        service.add_rule(&ctx, empty),
        Err(DecisionError::RuleConfiguration(
            RuleConfigurationError::NoConditions {
                rule_id: "empty".to_string()
            }
        ))
    );

    let duplicate = service
        .add_rule(&ctx, manual_review_rule())
        .expect_err("duplicate id");
    assert_eq!(duplicate.code(), "conflict");
}

#[test]
fn deactivating_a_rule_removes_it_from_evaluation() {
    let (service, _, _) = build_service(vec![manual_review_rule()]);
    let ctx = OperationContext::new();

    let updated = service
        .set_rule_active(&ctx, "large-loan-review", false)
        .expect("rule toggled");
    assert!(!updated.active);
    assert!(service.active_rules().is_empty());

    let decision = service
        .make_decision(&ctx, &prime_request())
        .expect("decision");
    assert_eq!(decision.decision, DecisionType::Approve);
}

#[test]
fn update_rule_requires_matching_ids() {
    let (service, _, _) = build_service(vec![manual_review_rule()]);

    let error = service
        .update_rule(&OperationContext::new(), "other-id", manual_review_rule())
        .expect_err("id mismatch");
    assert!(matches!(
        error,
        DecisionError::RuleConfiguration(RuleConfigurationError::IdMismatch { .. })
    ));
}

#[test]
fn update_rule_keeps_creation_time_and_refreshes_the_book() {
    let (service, _, _) = build_service(vec![manual_review_rule()]);
    let ctx = OperationContext::new();

    let mut edited = manual_review_rule();
    edited.conditions = vec![RuleCondition::new("loan_amount", Operator::Gte, 50_000.0)];
    edited.created_at = fixed_time() + chrono::Duration::days(10);

    let stored = service
        .update_rule(&ctx, "large-loan-review", edited)
        .expect("rule updated");
    assert_eq!(stored.created_at, fixed_time());

    let decision = service
        .make_decision(&ctx, &prime_request())
        .expect("decision");
    assert_eq!(decision.decision, DecisionType::Approve);
}

#[test]
fn refresh_keeps_the_previous_set_when_storage_holds_an_invalid_rule() {
    let (service, _, rules) = build_service(vec![manual_review_rule()]);
    rules.force_insert(rule("broken", 1, Vec::new(), RuleAction::flag("broken")));

    let error = service
        .refresh_rules(&OperationContext::new())
        .expect_err("broken rule");
    assert_eq!(error.code(), "rule_configuration");
    assert_eq!(service.active_rules().len(), 1);
}

#[test]
fn delete_rule_and_category_lookup() {
    let mut credit_rule = manual_review_rule();
    credit_rule.id = "credit-floor".to_string();
    credit_rule.category = RuleCategory::Credit;
    let (service, _, _) = build_service(vec![manual_review_rule(), credit_rule]);
    let ctx = OperationContext::new();

    let credit = service
        .rules_by_category(&ctx, RuleCategory::Credit)
        .expect("category lookup");
    assert_eq!(credit.len(), 1);

    service
        .delete_rule(&ctx, "credit-floor")
        .expect("rule deleted");
    assert_eq!(service.active_rules().len(), 1);
    assert_eq!(
        service
            .get_rule(&ctx, "credit-floor")
            .expect_err("deleted")
            .code(),
        "not_found"
    );
}
