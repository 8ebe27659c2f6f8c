use super::domain::{LoanApplication, StateTransition};
use crate::workflows::decisioning::domain::ApplicationId;
use crate::workflows::repository::{OperationContext, RepositoryError};

/// Storage abstraction for applications and their transition audit trail.
pub trait LoanRepository: Send + Sync {
    fn get_application_by_id(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError>;

    /// Persist `application` if its `version` still matches storage, returning the stored copy
    /// with the bumped version. A mismatch yields [`RepositoryError::StaleVersion`].
    fn update_application(
        &self,
        ctx: &OperationContext,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError>;

    fn create_state_transition(
        &self,
        ctx: &OperationContext,
        transition: &StateTransition,
    ) -> Result<(), RepositoryError>;

    /// Recorded transitions for an application, oldest first.
    fn get_state_transitions(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, RepositoryError>;
}
