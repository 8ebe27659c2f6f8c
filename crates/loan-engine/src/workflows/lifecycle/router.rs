use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::domain::{ApplicationState, TransitionRequest};
use super::machine::{StateTransitioner, TransitionError};
use crate::workflows::decisioning::domain::{ApplicationId, UserId};
use crate::error::AppError;
use crate::workflows::repository::OperationContext;

/// Router builder exposing lifecycle transitions for either machine flavour.
pub fn lifecycle_router<T>(machine: Arc<T>) -> Router
where
    T: StateTransitioner + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:application_id/transitions",
            post(transition_handler::<T>).get(history_handler::<T>),
        )
        .with_state(machine)
}

/// Body of a transition request; the application id comes from the path.
#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    #[serde(default)]
    from_state: Option<ApplicationState>,
    to_state: ApplicationState,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    actor_user_id: Option<String>,
    #[serde(default)]
    automated: Option<bool>,
}

pub(crate) fn transition_error_response(error: TransitionError) -> Response {
    AppError::from(error).into_response()
}

pub(crate) async fn transition_handler<T>(
    State(machine): State<Arc<T>>,
    Path(application_id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Response
where
    T: StateTransitioner + 'static,
{
    let automated = body.automated.unwrap_or(body.actor_user_id.is_none());
    let request = TransitionRequest {
        application_id: ApplicationId(application_id),
        from_state: body.from_state,
        to_state: body.to_state,
        reason: body.reason,
        actor_user_id: body.actor_user_id.map(UserId),
        automated,
    };

    let ctx = OperationContext::new();
    match machine.transition_to(&ctx, request) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => transition_error_response(error),
    }
}

async fn history_handler<T>(
    State(machine): State<Arc<T>>,
    Path(application_id): Path<String>,
) -> Response
where
    T: StateTransitioner + 'static,
{
    let ctx = OperationContext::new();
    match machine.transition_history(&ctx, &ApplicationId(application_id)) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(error) => transition_error_response(error),
    }
}
