use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::decisioning::domain::{ApplicationId, UserId};
use crate::workflows::lifecycle::domain::{
    ApplicationState, ApplicationStatus, LoanApplication, StateTransition,
};
use crate::workflows::lifecycle::repository::LoanRepository;
use crate::workflows::lifecycle::table::status_for;
use crate::workflows::repository::{OperationContext, RepositoryError};

pub(super) fn opened_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn application(id: &str, state: ApplicationState) -> LoanApplication {
    LoanApplication {
        id: ApplicationId(id.to_string()),
        user_id: UserId("user-001".to_string()),
        loan_amount: 20_000.0,
        current_state: state,
        status: status_for(state),
        version: 1,
        created_at: opened_at(),
        updated_at: opened_at(),
    }
}

/// In-memory loan store with switches for the failure modes the machine must tolerate.
#[derive(Default, Clone)]
pub(super) struct MemoryLoans {
    applications: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
    transitions: Arc<Mutex<Vec<StateTransition>>>,
    updates: Arc<AtomicU32>,
    stale_writes_remaining: Arc<AtomicU32>,
    fail_audit: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
}

impl MemoryLoans {
    pub(super) fn with(applications: Vec<LoanApplication>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.applications.lock().expect("loan mutex poisoned");
            for application in applications {
                guard.insert(application.id.clone(), application);
            }
        }
        store
    }

    pub(super) fn stored(&self, id: &str) -> LoanApplication {
        self.applications
            .lock()
            .expect("loan mutex poisoned")
            .get(&ApplicationId(id.to_string()))
            .cloned()
            .expect("application stored")
    }

    pub(super) fn recorded(&self) -> Vec<StateTransition> {
        self.transitions
            .lock()
            .expect("transition mutex poisoned")
            .clone()
    }

    pub(super) fn update_count(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make the next `count` writes fail as if another writer got there first.
    pub(super) fn inject_stale_writes(&self, count: u32) {
        self.stale_writes_remaining.store(count, Ordering::SeqCst);
    }

    pub(super) fn fail_audit_writes(&self) {
        self.fail_audit.store(true, Ordering::SeqCst);
    }

    pub(super) fn fail_application_writes(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

impl LoanRepository for MemoryLoans {
    fn get_application_by_id(
        &self,
        ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, RepositoryError> {
        ctx.check()?;
        Ok(self
            .applications
            .lock()
            .expect("loan mutex poisoned")
            .get(application_id)
            .cloned())
    }

    fn update_application(
        &self,
        ctx: &OperationContext,
        application: LoanApplication,
    ) -> Result<LoanApplication, RepositoryError> {
        ctx.check()?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }

        let mut guard = self.applications.lock().expect("loan mutex poisoned");
        let stored = guard
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;

        let pending_stale = self.stale_writes_remaining.load(Ordering::SeqCst);
        if pending_stale > 0 {
            self.stale_writes_remaining
                .store(pending_stale - 1, Ordering::SeqCst);
            stored.version += 1;
            return Err(RepositoryError::StaleVersion);
        }

        if stored.version != application.version {
            return Err(RepositoryError::StaleVersion);
        }

        let mut next = application;
        next.version += 1;
        *stored = next.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(next)
    }

    fn create_state_transition(
        &self,
        _ctx: &OperationContext,
        transition: &StateTransition,
    ) -> Result<(), RepositoryError> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("audit log offline".to_string()));
        }
        self.transitions
            .lock()
            .expect("transition mutex poisoned")
            .push(transition.clone());
        Ok(())
    }

    fn get_state_transitions(
        &self,
        _ctx: &OperationContext,
        application_id: &ApplicationId,
    ) -> Result<Vec<StateTransition>, RepositoryError> {
        Ok(self
            .recorded()
            .into_iter()
            .filter(|transition| &transition.application_id == application_id)
            .collect())
    }
}

pub(super) fn status_of(loans: &MemoryLoans, id: &str) -> ApplicationStatus {
    loans.stored(id).status
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
