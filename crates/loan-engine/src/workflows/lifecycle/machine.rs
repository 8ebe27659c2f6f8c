use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::domain::{
    ApplicationState, StateTransition, TransitionOutcome, TransitionRequest,
};
use super::repository::LoanRepository;
use super::table::{can_transition, derive_status, status_for};
use crate::workflows::decisioning::domain::ApplicationId;
use crate::workflows::repository::{OperationContext, RepositoryError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Entry point shared by the persisted and simulated machines so adapters stay agnostic.
pub trait StateTransitioner: Send + Sync {
    fn transition_to(
        &self,
        ctx: &OperationContext,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError>;

    fn transition_history(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, TransitionError>;
}

/// State machine backed by a [`LoanRepository`]; the persisted state is authoritative.
pub struct PersistedStateMachine<L> {
    repository: Arc<L>,
    max_attempts: u32,
}

impl<L> PersistedStateMachine<L>
where
    L: LoanRepository + 'static,
{
    pub fn new(repository: Arc<L>) -> Self {
        Self::with_max_attempts(repository, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(repository: Arc<L>, max_attempts: u32) -> Self {
        Self {
            repository,
            max_attempts: max_attempts.max(1),
        }
    }

    fn record_audit(&self, transition: &StateTransition) -> bool {
        // The application write already landed, so the audit write runs even if the caller
        // has since cancelled.
        let audit_ctx = OperationContext::new();
        match self
            .repository
            .create_state_transition(&audit_ctx, transition)
        {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    application_id = %transition.application_id,
                    transition_id = %transition.id,
                    error = %error,
                    "failed to record state transition"
                );
                false
            }
        }
    }
}

impl<L> StateTransitioner for PersistedStateMachine<L>
where
    L: LoanRepository + 'static,
{
    fn transition_to(
        &self,
        ctx: &OperationContext,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        check_request(&request)?;
        let to_state = request.to_state;

        for attempt in 1..=self.max_attempts {
            ctx.check()?;
            let application = self
                .repository
                .get_application_by_id(ctx, &request.application_id)?
                .ok_or_else(|| TransitionError::NotFound(request.application_id.clone()))?;
            let current = application.current_state;

            if let Some(claimed) = request.from_state.filter(|claimed| *claimed != current) {
                warn!(
                    application_id = %request.application_id,
                    claimed_state = claimed.label(),
                    persisted_state = current.label(),
                    "caller state disagrees with persisted state; using persisted state"
                );
            }

            if current == to_state {
                info!(
                    application_id = %request.application_id,
                    state = current.label(),
                    "application already in target state"
                );
                return Ok(TransitionOutcome {
                    success: true,
                    application_id: application.id,
                    previous_state: current,
                    new_state: current,
                    new_status: application.status,
                    updated_at: application.updated_at,
                    transition: None,
                    idempotent: true,
                    simulated: false,
                    audit_recorded: false,
                });
            }

            if !can_transition(current, to_state) {
                warn!(
                    application_id = %request.application_id,
                    from_state = current.label(),
                    to_state = to_state.label(),
                    "invalid state transition attempted"
                );
                return Err(TransitionError::InvalidTransition {
                    from: current,
                    to: to_state,
                });
            }

            let now = Utc::now();
            let mut updated = application.clone();
            updated.current_state = to_state;
            updated.status = derive_status(application.status, to_state);
            updated.updated_at = now;

            ctx.check()?;
            let stored = match self.repository.update_application(ctx, updated) {
                Ok(stored) => stored,
                Err(RepositoryError::StaleVersion) => {
                    debug!(
                        application_id = %request.application_id,
                        attempt,
                        "application changed concurrently; re-reading"
                    );
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            let transition = build_transition(&request, Some(current), now);
            let audit_recorded = self.record_audit(&transition);

            info!(
                application_id = %request.application_id,
                from_state = current.label(),
                to_state = to_state.label(),
                status = stored.status.label(),
                audit_recorded,
                "state transition completed"
            );

            return Ok(TransitionOutcome {
                success: true,
                application_id: stored.id,
                previous_state: current,
                new_state: stored.current_state,
                new_status: stored.status,
                updated_at: stored.updated_at,
                transition: Some(transition),
                idempotent: false,
                simulated: false,
                audit_recorded,
            });
        }

        warn!(
            application_id = %request.application_id,
            attempts = self.max_attempts,
            "state transition abandoned after repeated version conflicts"
        );
        Err(TransitionError::Collaborator(RepositoryError::StaleVersion))
    }

    fn transition_history(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, TransitionError> {
        ctx.check()?;
        Ok(self.repository.get_state_transitions(ctx, application_id)?)
    }
}

/// State machine used when no repository is configured. Validates against the caller's
/// `from_state` (or a configured default) and never persists anything.
#[derive(Debug, Clone)]
pub struct SimulatedStateMachine {
    default_from: ApplicationState,
}

impl Default for SimulatedStateMachine {
    fn default() -> Self {
        Self::new(ApplicationState::Initiated)
    }
}

impl SimulatedStateMachine {
    pub fn new(default_from: ApplicationState) -> Self {
        Self { default_from }
    }
}

impl StateTransitioner for SimulatedStateMachine {
    fn transition_to(
        &self,
        ctx: &OperationContext,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        check_request(&request)?;
        ctx.check()?;

        let current = request.from_state.unwrap_or(self.default_from);
        let to_state = request.to_state;
        let now = Utc::now();

        if current == to_state {
            return Ok(TransitionOutcome {
                success: true,
                application_id: request.application_id,
                previous_state: current,
                new_state: current,
                new_status: status_for(current),
                updated_at: now,
                transition: None,
                idempotent: true,
                simulated: true,
                audit_recorded: false,
            });
        }

        if !can_transition(current, to_state) {
            return Err(TransitionError::InvalidTransition {
                from: current,
                to: to_state,
            });
        }

        let transition = build_transition(&request, Some(current), now);
        info!(
            application_id = %request.application_id,
            from_state = current.label(),
            to_state = to_state.label(),
            "simulated state transition"
        );

        Ok(TransitionOutcome {
            success: true,
            application_id: request.application_id,
            previous_state: current,
            new_state: to_state,
            new_status: derive_status(status_for(current), to_state),
            updated_at: now,
            transition: Some(transition),
            idempotent: false,
            simulated: true,
            audit_recorded: false,
        })
    }

    fn transition_history(
        &self,
        _ctx: &OperationContext,
        _application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, TransitionError> {
        Ok(Vec::new())
    }
}

fn check_request(request: &TransitionRequest) -> Result<(), TransitionError> {
    if request.application_id.0.trim().is_empty() {
        return Err(TransitionError::InvalidRequest(
            "application id is required".to_string(),
        ));
    }
    Ok(())
}

fn build_transition(
    request: &TransitionRequest,
    from_state: Option<ApplicationState>,
    created_at: DateTime<Utc>,
) -> StateTransition {
    let reason = if request.reason.trim().is_empty() {
        "State transition".to_string()
    } else {
        request.reason.clone()
    };

    StateTransition {
        id: Uuid::new_v4(),
        application_id: request.application_id.clone(),
        from_state,
        to_state: request.to_state,
        reason,
        actor_user_id: request.actor_user_id.clone(),
        automated: request.automated,
        created_at,
    }
}

/// Error raised by the application state machines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("invalid transition request: {0}")]
    InvalidRequest(String),
    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        from: ApplicationState,
        to: ApplicationState,
    },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("collaborator failure: {0}")]
    Collaborator(RepositoryError),
    #[error("operation cancelled")]
    Cancelled,
}

impl TransitionError {
    pub const fn code(&self) -> &'static str {
        match self {
            TransitionError::InvalidRequest(_) => "request_validation",
            TransitionError::InvalidTransition { .. } => "state_transition_invalid",
            TransitionError::NotFound(_) => "not_found",
            TransitionError::Collaborator(_) => "collaborator_failure",
            TransitionError::Cancelled => "cancelled",
        }
    }
}

impl From<RepositoryError> for TransitionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Cancelled => TransitionError::Cancelled,
            other => TransitionError::Collaborator(other),
        }
    }
}
