use chrono::{DateTime, Utc};
use loan_engine::workflows::decisioning::{
    Adjustment, ApplicationId, DecisionRepository, DecisionResponse, DecisionRule,
    DecisionType, Operator, RuleAction, RuleCategory, RuleCondition, RuleValue, RulesRepository,
    UserId,
};
use loan_engine::workflows::lifecycle::{
    status_for, ApplicationState, LoanApplication, LoanRepository, StateTransition,
};
use loan_engine::workflows::{OperationContext, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRulesRepository {
    rules: Arc<Mutex<BTreeMap<String, DecisionRule>>>,
}

impl InMemoryRulesRepository {
    pub(crate) fn seeded(rules: Vec<DecisionRule>) -> Self {
        let repository = Self::default();
        if let Ok(mut guard) = repository.rules.lock() {
            for rule in rules {
                guard.insert(rule.id.clone(), rule);
            }
        }
        repository
    }
}

impl RulesRepository for InMemoryRulesRepository {
    fn get_active_rules(
        &self,
        ctx: &OperationContext,
    ) -> Result<Vec<DecisionRule>, RepositoryError> {
        Ok(self
            .get_rules(ctx)?
            .into_iter()
            .filter(|rule| rule.active)
            .collect())
    }

    fn get_rules(&self, ctx: &OperationContext) -> Result<Vec<DecisionRule>, RepositoryError> {
        ctx.check()?;
        Ok(lock(&self.rules, "rules")?.values().cloned().collect())
    }

    fn get_rule(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
    ) -> Result<Option<DecisionRule>, RepositoryError> {
        ctx.check()?;
        Ok(lock(&self.rules, "rules")?.get(rule_id).cloned())
    }

    fn save_rule(&self, ctx: &OperationContext, rule: DecisionRule) -> Result<(), RepositoryError> {
        ctx.check()?;
        let mut guard = lock(&self.rules, "rules")?;
        if guard.contains_key(&rule.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn update_rule(
        &self,
        ctx: &OperationContext,
        rule: DecisionRule,
    ) -> Result<(), RepositoryError> {
        ctx.check()?;
        let mut guard = lock(&self.rules, "rules")?;
        if !guard.contains_key(&rule.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn delete_rule(&self, ctx: &OperationContext, rule_id: &str) -> Result<(), RepositoryError> {
        ctx.check()?;
        lock(&self.rules, "rules")?
            .remove(rule_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn get_rules_by_category(
        &self,
        ctx: &OperationContext,
        category: RuleCategory,
    ) -> Result<Vec<DecisionRule>, RepositoryError> {
        Ok(self
            .get_rules(ctx)?
            .into_iter()
            .filter(|rule| rule.category == category)
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionRepository {
    records: Arc<Mutex<HashMap<ApplicationId, DecisionResponse>>>,
}

impl DecisionRepository for InMemoryDecisionRepository {
    fn save_decision(
        &self,
        ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        ctx.check()?;
        lock(&self.records, "decisions")?
            .insert(decision.application_id.clone(), decision.clone());
        Ok(())
    }

    fn get_decision(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<DecisionResponse>, RepositoryError> {
        ctx.check()?;
        Ok(lock(&self.records, "decisions")?.get(application_id).cloned())
    }

    fn get_decision_history(
        &self,
        ctx: &OperationContext,
        user_id: &UserId,
    ) -> Result<Vec<DecisionResponse>, RepositoryError> {
        ctx.check()?;
        let mut history: Vec<_> = lock(&self.records, "decisions")?
            .values()
            .filter(|decision| &decision.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|left, right| right.decided_at.cmp(&left.decided_at));
        Ok(history)
    }

    fn update_decision(
        &self,
        ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        ctx.check()?;
        let mut guard = lock(&self.records, "decisions")?;
        match guard.get_mut(&decision.application_id) {
            Some(stored) => {
                *stored = decision.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    applications: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
    transitions: Arc<Mutex<Vec<StateTransition>>>,
}

impl InMemoryLoanRepository {
    pub(crate) fn seeded(applications: Vec<LoanApplication>) -> Self {
        let repository = Self::default();
        if let Ok(mut guard) = repository.applications.lock() {
            for application in applications {
                guard.insert(application.id.clone(), application);
            }
        }
        repository
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn get_application_by_id(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        ctx.check()?;
        Ok(lock(&self.applications, "applications")?
            .get(application_id)
            .cloned())
    }

    fn update_application(
        &self,
        ctx: &OperationContext,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        ctx.check()?;
        let mut guard = lock(&self.applications, "applications")?;
        let stored = guard
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != application.version {
            return Err(RepositoryError::StaleVersion);
        }

        let mut next = application;
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    fn create_state_transition(
        &self,
        ctx: &OperationContext,
        transition: &StateTransition,
    ) -> Result<(), RepositoryError> {
        ctx.check()?;
        lock(&self.transitions, "transitions")?.push(transition.clone());
        Ok(())
    }

    fn get_state_transitions(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, RepositoryError> {
        ctx.check()?;
        Ok(lock(&self.transitions, "transitions")?
            .iter()
            .filter(|transition| &transition.application_id == application_id)
            .cloned()
            .collect())
    }
}

/// Starter rule set loaded into the in-memory rules store.
pub(crate) fn default_rules(now: DateTime<Utc>) -> Vec<DecisionRule> {
    let rule = |id: &str,
                name: &str,
                category: RuleCategory,
                priority: i32,
                conditions: Vec<RuleCondition>,
                action: RuleAction| DecisionRule {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        category,
        priority,
        conditions,
        action,
        active: true,
        created_at: now,
        updated_at: now,
        metadata: BTreeMap::new(),
    };

    vec![
        rule(
            "unemployed-deny",
            "Deny applicants without employment income",
            RuleCategory::Employment,
            10,
            vec![
                RuleCondition::new("employment_type", Operator::Eq, "unemployed"),
                RuleCondition::new("annual_income", Operator::Lt, 25_000.0),
            ],
            RuleAction::decision(DecisionType::Deny, "No verifiable employment income"),
        ),
        rule(
            "large-loan-review",
            "Route large loans to an underwriter",
            RuleCategory::General,
            20,
            vec![RuleCondition::new("loan_amount", Operator::Gt, 250_000.0)],
            RuleAction::flag("Loan amount above automated approval limit"),
        ),
        rule(
            "business-purpose-documents",
            "Business plan for business-purpose loans",
            RuleCategory::General,
            30,
            vec![RuleCondition::new("loan_purpose", Operator::Eq, "business")],
            RuleAction::requirement(
                vec!["Business plan".to_string()],
                vec!["Funds used for the stated business purpose".to_string()],
                "Business-purpose loans must document intended use",
            ),
        ),
        rule(
            "elevated-dti-cap",
            "Cap the offer when debt load is elevated",
            RuleCategory::Debt,
            40,
            vec![
                RuleCondition::new("dti_ratio", Operator::Gte, 0.36),
                RuleCondition::new(
                    "loan_purpose",
                    Operator::In,
                    RuleValue::text_set(["personal", "vacation", "other"]),
                ),
            ],
            RuleAction::adjustment(
                vec![
                    Adjustment::AmountFactor(0.8),
                    Adjustment::InterestRateDelta(0.5),
                ],
                "Elevated debt-to-income ratio",
            ),
        ),
    ]
}

pub(crate) fn sample_applications(now: DateTime<Utc>) -> Vec<LoanApplication> {
    [
        ("app-1001", "user-001", 20_000.0, ApplicationState::Submitted),
        ("app-1002", "user-002", 8_500.0, ApplicationState::UnderReview),
        ("app-1003", "user-003", 45_000.0, ApplicationState::Approved),
    ]
    .into_iter()
    .map(|(id, user, amount, state)| LoanApplication {
        id: ApplicationId(id.to_string()),
        user_id: UserId(user.to_string()),
        loan_amount: amount,
        current_state: state,
        status: status_for(state),
        version: 1,
        created_at: now,
        updated_at: now,
    })
    .collect()
}
