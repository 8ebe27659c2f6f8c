//! Loan application lifecycle: the transition table, status roll-up, and the persisted and
//! simulated state machines that apply transitions idempotently.

pub mod domain;
pub mod machine;
pub mod repository;
pub mod router;
pub mod table;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationState, ApplicationStatus, LoanApplication, StateTransition, TransitionOutcome,
    TransitionRequest,
};
pub use machine::{
    PersistedStateMachine, SimulatedStateMachine, StateTransitioner, TransitionError,
    DEFAULT_MAX_ATTEMPTS,
};
pub use repository::LoanRepository;
pub use router::lifecycle_router;
pub use table::{allowed_targets, can_transition, derive_status, status_for};
