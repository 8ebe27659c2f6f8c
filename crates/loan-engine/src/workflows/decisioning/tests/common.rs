use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::decisioning::domain::{
    ApplicationId, DecisionRequest, DecisionResponse, EmploymentType, LoanPurpose, UserId,
};
use crate::workflows::decisioning::repository::{DecisionRepository, RulesRepository};
use crate::workflows::decisioning::rules::{
    DecisionRule, RuleAction, RuleCategory, RuleCondition,
};
use crate::workflows::decisioning::{decision_router, DecisionPolicy, DecisionService};
use crate::workflows::repository::{OperationContext, RepositoryError};

/// Applicant with 780 credit, 90k income, and a 0.20 DTI asking for 20k.
pub(super) fn prime_request() -> DecisionRequest {
    DecisionRequest {
        application_id: ApplicationId("app-001".to_string()),
        user_id: UserId("user-001".to_string()),
        loan_amount: 20_000.0,
        annual_income: 90_000.0,
        monthly_income: 7_500.0,
        monthly_debt: 1_500.0,
        credit_score: 780,
        employment_type: EmploymentType::FullTime,
        requested_term: 36,
        loan_purpose: LoanPurpose::Personal,
        additional_data: BTreeMap::new(),
        requested_at: fixed_time(),
    }
}

pub(super) fn subprime_request() -> DecisionRequest {
    DecisionRequest {
        application_id: ApplicationId("app-002".to_string()),
        credit_score: 550,
        ..prime_request()
    }
}

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn rule(
    id: &str,
    priority: i32,
    conditions: Vec<RuleCondition>,
    action: RuleAction,
) -> DecisionRule {
    DecisionRule {
        id: id.to_string(),
        name: format!("{id} rule"),
        description: String::new(),
        category: RuleCategory::General,
        priority,
        conditions,
        action,
        active: true,
        created_at: fixed_time(),
        updated_at: fixed_time(),
        metadata: BTreeMap::new(),
    }
}

pub(super) fn policy() -> DecisionPolicy {
    DecisionPolicy::default()
}

pub(super) type MemoryService = DecisionService<MemoryDecisions, MemoryRules>;

pub(super) fn build_service(
    rules: Vec<DecisionRule>,
) -> (MemoryService, Arc<MemoryDecisions>, Arc<MemoryRules>) {
    let decisions = Arc::new(MemoryDecisions::default());
    let rule_store = Arc::new(MemoryRules::with_rules(rules));
    let service = DecisionService::new(decisions.clone(), rule_store.clone(), policy());
    service
        .refresh_rules(&OperationContext::new())
        .expect("seed rules compile");
    (service, decisions, rule_store)
}

#[derive(Default, Clone)]
pub(super) struct MemoryDecisions {
    records: Arc<Mutex<HashMap<ApplicationId, DecisionResponse>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryDecisions {
    pub(super) fn save_count(&self) -> usize {
        *self.saves.lock().expect("decision mutex poisoned")
    }

    pub(super) fn stored(&self, id: &str) -> Option<DecisionResponse> {
        self.records
            .lock()
            .expect("decision mutex poisoned")
            .get(&ApplicationId(id.to_string()))
            .cloned()
    }
}

impl DecisionRepository for MemoryDecisions {
    fn save_decision(
        &self,
        _ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        *self.saves.lock().expect("decision mutex poisoned") += 1;
        self.records
            .lock()
            .expect("decision mutex poisoned")
            .insert(decision.application_id.clone(), decision.clone());
        Ok(())
    }

    fn get_decision(
        &self,
        _ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<DecisionResponse>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("decision mutex poisoned")
            .get(application_id)
            .cloned())
    }

    fn get_decision_history(
        &self,
        _ctx: &OperationContext,
        user_id: &UserId,
    ) -> Result<Vec<DecisionResponse>, RepositoryError> {
        let mut history: Vec<_> = self
            .records
            .lock()
            .expect("decision mutex poisoned")
            .values()
            .filter(|decision| &decision.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|left, right| right.decided_at.cmp(&left.decided_at));
        Ok(history)
    }

    fn update_decision(
        &self,
        _ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("decision mutex poisoned");
        if !guard.contains_key(&decision.application_id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(decision.application_id.clone(), decision.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRules {
    rules: Arc<Mutex<BTreeMap<String, DecisionRule>>>,
}

impl MemoryRules {
    pub(super) fn with_rules(rules: Vec<DecisionRule>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.rules.lock().expect("rule mutex poisoned");
            for rule in rules {
                guard.insert(rule.id.clone(), rule);
            }
        }
        store
    }

    /// Write straight to storage, bypassing validation, as an out-of-band edit would.
    pub(super) fn force_insert(&self, rule: DecisionRule) {
        self.rules
            .lock()
            .expect("rule mutex poisoned")
            .insert(rule.id.clone(), rule);
    }
}

impl RulesRepository for MemoryRules {
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

    fn get_rules(&self, _ctx: &OperationContext) -> Result<Vec<DecisionRule>, RepositoryError> {
        Ok(self
            .rules
            .lock()
            .expect("rule mutex poisoned")
            .values()
            .cloned()
            .collect())
    }

    fn get_rule(
        &self,
        _ctx: &OperationContext,
        rule_id: &str,
    ) -> Result<Option<DecisionRule>, RepositoryError> {
        Ok(self
            .rules
            .lock()
            .expect("rule mutex poisoned")
            .get(rule_id)
            .cloned())
    }

    fn save_rule(
        &self,
        _ctx: &OperationContext,
        rule: DecisionRule,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        if guard.contains_key(&rule.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn update_rule(
        &self,
        _ctx: &OperationContext,
        rule: DecisionRule,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        if !guard.contains_key(&rule.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn delete_rule(&self, _ctx: &OperationContext, rule_id: &str) -> Result<(), RepositoryError> {
        self.rules
            .lock()
            .expect("rule mutex poisoned")
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

pub(super) struct UnavailableDecisions;

impl DecisionRepository for UnavailableDecisions {
    fn save_decision(
        &self,
        _ctx: &OperationContext,
        _decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn get_decision(
        &self,
        _ctx: &OperationContext,
        _application_id: &ApplicationId,
    ) -> Result<Option<DecisionResponse>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn get_decision_history(
        &self,
        _ctx: &OperationContext,
        _user_id: &UserId,
    ) -> Result<Vec<DecisionResponse>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_decision(
        &self,
        _ctx: &OperationContext,
        _decision: &DecisionResponse,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    decision_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
