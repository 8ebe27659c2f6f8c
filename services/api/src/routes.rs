use crate::infra::{
    default_rules, sample_applications, AppState, InMemoryDecisionRepository,
    InMemoryLoanRepository, InMemoryRulesRepository,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use loan_engine::config::{AppConfig, PersistenceMode};
use loan_engine::error::AppError;
use loan_engine::workflows::decisioning::{decision_router, DecisionService};
use loan_engine::workflows::lifecycle::{
    lifecycle_router, PersistedStateMachine, SimulatedStateMachine,
};
use loan_engine::workflows::OperationContext;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub(crate) type InMemoryDecisionService =
    DecisionService<InMemoryDecisionRepository, InMemoryRulesRepository>;

/// Decision service over in-memory stores, seeded with the starter rules and loaded.
pub(crate) fn decision_service(
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<InMemoryDecisionService, AppError> {
    let rules = Arc::new(InMemoryRulesRepository::seeded(default_rules(now)));
    let decisions = Arc::new(InMemoryDecisionRepository::default());
    let service = DecisionService::new(decisions, rules, config.decision.clone());
    service.refresh_rules(&OperationContext::new())?;
    Ok(service)
}

/// Decision and lifecycle APIs, with the state machine backend chosen by configuration.
pub(crate) fn build_api(config: &AppConfig) -> Result<Router, AppError> {
    let now = Utc::now();
    let decisions = decision_router(Arc::new(decision_service(config, now)?));

    let lifecycle = match config.lifecycle.persistence {
        PersistenceMode::Memory => {
            let loans = Arc::new(InMemoryLoanRepository::seeded(sample_applications(now)));
            lifecycle_router(Arc::new(PersistedStateMachine::with_max_attempts(
                loans,
                config.lifecycle.max_attempts,
            )))
        }
        PersistenceMode::Simulated => lifecycle_router(Arc::new(SimulatedStateMachine::new(
            config.lifecycle.simulated_from_state,
        ))),
    };
    info!(persistence = ?config.lifecycle.persistence, "lifecycle backend selected");

    Ok(decisions.merge(lifecycle))
}

pub(crate) fn with_service_routes(api: Router) -> Router {
    api.route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
