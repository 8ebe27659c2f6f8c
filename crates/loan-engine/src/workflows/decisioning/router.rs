use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, DecisionRequest, UserId};
use super::repository::{DecisionRepository, RulesRepository};
use super::rules::{DecisionRule, RuleCategory};
use super::service::{DecisionError, DecisionService, ReviewInput};
use crate::error::AppError;
use crate::workflows::repository::OperationContext;

type SharedService<D, R> = Arc<DecisionService<D, R>>;

/// Router builder exposing decision and rule administration endpoints.
pub fn decision_router<D, R>(service: SharedService<D, R>) -> Router
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    Router::new()
        .route("/api/v1/decisions", post(decide_handler::<D, R>))
        .route("/api/v1/decisions/validate", post(validate_handler::<D, R>))
        .route(
            "/api/v1/decisions/:application_id",
            get(decision_handler::<D, R>),
        )
        .route(
            "/api/v1/decisions/:application_id/review",
            post(review_handler::<D, R>),
        )
        .route(
            "/api/v1/users/:user_id/decisions",
            get(history_handler::<D, R>),
        )
        .route(
            "/api/v1/rules",
            get(list_rules_handler::<D, R>).post(add_rule_handler::<D, R>),
        )
        .route(
            "/api/v1/rules/:rule_id",
            get(get_rule_handler::<D, R>)
                .put(update_rule_handler::<D, R>)
                .delete(delete_rule_handler::<D, R>),
        )
        .route(
            "/api/v1/rules/:rule_id/active",
            put(rule_activation_handler::<D, R>),
        )
        .with_state(service)
}

pub(crate) fn decision_error_response(error: DecisionError) -> Response {
    AppError::from(error).into_response()
}

pub(crate) async fn decide_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.make_decision(&ctx, &request) {
        Ok(decision) => (StatusCode::CREATED, Json(decision)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

pub(crate) async fn validate_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    match service.validate_request(&request) {
        Ok(()) => (StatusCode::OK, Json(json!({ "valid": true }))).into_response(),
        Err(DecisionError::Validation(error)) => {
            let payload = json!({
                "valid": false,
                "error": error.to_string(),
                "code": error.code(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(other) => decision_error_response(other),
    }
}

async fn decision_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(application_id): Path<String>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.get_decision(&ctx, &ApplicationId(application_id)) {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

async fn review_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(application_id): Path<String>,
    Json(review): Json<ReviewInput>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.record_review(&ctx, &ApplicationId(application_id), review) {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

async fn history_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(user_id): Path<String>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.get_decision_history(&ctx, &UserId(user_id)) {
        Ok(decisions) => (StatusCode::OK, Json(decisions)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleFilter {
    category: Option<RuleCategory>,
}

async fn list_rules_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Query(filter): Query<RuleFilter>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let rules = match filter.category {
        Some(category) => {
            let ctx = OperationContext::new();
            match service.rules_by_category(&ctx, category) {
                Ok(rules) => rules,
                Err(error) => return decision_error_response(error),
            }
        }
        None => service.active_rules(),
    };
    (StatusCode::OK, Json(rules)).into_response()
}

async fn add_rule_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Json(rule): Json<DecisionRule>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.add_rule(&ctx, rule) {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

async fn get_rule_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(rule_id): Path<String>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.get_rule(&ctx, &rule_id) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

async fn update_rule_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(rule_id): Path<String>,
    Json(rule): Json<DecisionRule>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.update_rule(&ctx, &rule_id, rule) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(error) => decision_error_response(error),
    }
}

async fn delete_rule_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(rule_id): Path<String>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.delete_rule(&ctx, &rule_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => decision_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivationToggle {
    active: bool,
}

async fn rule_activation_handler<D, R>(
    State(service): State<SharedService<D, R>>,
    Path(rule_id): Path<String>,
    Json(toggle): Json<ActivationToggle>,
) -> Response
where
    D: DecisionRepository + 'static,
    R: RulesRepository + 'static,
{
    let ctx = OperationContext::new();
    match service.set_rule_active(&ctx, &rule_id, toggle.active) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(error) => decision_error_response(error),
    }
}
