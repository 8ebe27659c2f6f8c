use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::decisioning::domain::{ApplicationId, UserId};

/// Fine-grained lifecycle position of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Initiated,
    Submitted,
    UnderReview,
    Approved,
    Conditional,
    Denied,
    Funded,
    Active,
    Closed,
}

impl ApplicationState {
    pub const ALL: [ApplicationState; 9] = [
        ApplicationState::Initiated,
        ApplicationState::Submitted,
        ApplicationState::UnderReview,
        ApplicationState::Approved,
        ApplicationState::Conditional,
        ApplicationState::Denied,
        ApplicationState::Funded,
        ApplicationState::Active,
        ApplicationState::Closed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationState::Initiated => "initiated",
            ApplicationState::Submitted => "submitted",
            ApplicationState::UnderReview => "under_review",
            ApplicationState::Approved => "approved",
            ApplicationState::Conditional => "conditional",
            ApplicationState::Denied => "denied",
            ApplicationState::Funded => "funded",
            ApplicationState::Active => "active",
            ApplicationState::Closed => "closed",
        }
    }

    /// States with no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationState::Denied | ApplicationState::Closed)
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse status shown to applicants, derived from the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Denied,
    Funded,
    Active,
    Closed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Funded => "funded",
            ApplicationStatus::Active => "active",
            ApplicationStatus::Closed => "closed",
        }
    }

    /// Statuses that record an outcome and are never rolled back to an in-progress status.
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved
                | ApplicationStatus::Denied
                | ApplicationStatus::Funded
                | ApplicationStatus::Active
                | ApplicationStatus::Closed
        )
    }
}

/// Persisted application record as seen by the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub loan_amount: f64,
    pub current_state: ApplicationState,
    pub status: ApplicationStatus,
    /// Optimistic-concurrency token; bumped by the repository on every successful write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record of an applied transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub id: Uuid,
    pub application_id: ApplicationId,
    pub from_state: Option<ApplicationState>,
    pub to_state: ApplicationState,
    pub reason: String,
    /// `None` when the system acted on its own.
    pub actor_user_id: Option<UserId>,
    pub automated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub application_id: ApplicationId,
    /// Caller's view of the current state. Advisory when persistence is available.
    #[serde(default)]
    pub from_state: Option<ApplicationState>,
    pub to_state: ApplicationState,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub actor_user_id: Option<UserId>,
    #[serde(default)]
    pub automated: bool,
}

impl TransitionRequest {
    pub fn new(application_id: impl Into<String>, to_state: ApplicationState) -> Self {
        Self {
            application_id: ApplicationId(application_id.into()),
            from_state: None,
            to_state,
            reason: String::new(),
            actor_user_id: None,
            automated: true,
        }
    }

    pub fn from_state(mut self, state: ApplicationState) -> Self {
        self.from_state = Some(state);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn acted_by(mut self, user: impl Into<String>) -> Self {
        self.actor_user_id = Some(UserId(user.into()));
        self.automated = false;
        self
    }
}

/// Result of a transition attempt that did not error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub application_id: ApplicationId,
    pub previous_state: ApplicationState,
    pub new_state: ApplicationState,
    pub new_status: ApplicationStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<StateTransition>,
    pub idempotent: bool,
    pub simulated: bool,
    pub audit_recorded: bool,
}
