use super::domain::{ApplicationId, DecisionResponse, UserId};
use super::rules::{DecisionRule, RuleCategory};
use crate::workflows::repository::{OperationContext, RepositoryError};

/// Storage for business rules managed through the administration path.
pub trait RulesRepository: Send + Sync {
    fn get_active_rules(&self, ctx: &OperationContext)
        -> Result<Vec<DecisionRule>, RepositoryError>;
    fn get_rules(&self, ctx: &OperationContext) -> Result<Vec<DecisionRule>, RepositoryError>;
    fn get_rule(
        &self,
        ctx: &OperationContext,
        rule_id: &str,
    ) -> Result<Option<DecisionRule>, RepositoryError>;
    fn save_rule(&self, ctx: &OperationContext, rule: DecisionRule)
        -> Result<(), RepositoryError>;
    fn update_rule(
        &self,
        ctx: &OperationContext,
        rule: DecisionRule,
    ) -> Result<(), RepositoryError>;
    fn delete_rule(&self, ctx: &OperationContext, rule_id: &str) -> Result<(), RepositoryError>;
    fn get_rules_by_category(
        &self,
        ctx: &OperationContext,
        category: RuleCategory,
    ) -> Result<Vec<DecisionRule>, RepositoryError>;
}

/// Storage for issued decisions.
pub trait DecisionRepository: Send + Sync {
    fn save_decision(
        &self,
        ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError>;
    fn get_decision(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<DecisionResponse>, RepositoryError>;
    /// Decisions issued to a user, newest first.
    fn get_decision_history(
        &self,
        ctx: &OperationContext,
        user_id: &UserId,
    ) -> Result<Vec<DecisionResponse>, RepositoryError>;
    fn update_decision(
        &self,
        ctx: &OperationContext,
        decision: &DecisionResponse,
    ) -> Result<(), RepositoryError>;
}
