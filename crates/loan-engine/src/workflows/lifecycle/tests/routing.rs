use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::lifecycle::domain::ApplicationState;
use crate::workflows::lifecycle::machine::{PersistedStateMachine, SimulatedStateMachine};
use crate::workflows::lifecycle::router::lifecycle_router;

fn post_transition(id: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(format!("/api/v1/applications/{id}/transitions"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn transition_route_applies_and_lists_history() {
    let loans = MemoryLoans::with(vec![application("app-1", ApplicationState::Submitted)]);
    let router = lifecycle_router(Arc::new(PersistedStateMachine::new(Arc::new(loans.clone()))));

    let response = router
        .clone()
        .oneshot(post_transition(
            "app-1",
            json!({ "to_state": "under_review", "reason": "documents received", "actor_user_id": "ops-2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["new_state"], "under_review");
    assert_eq!(body["new_status"], "under_review");
    assert_eq!(body["idempotent"], false);
    assert_eq!(body["transition"]["automated"], false);

    let response = router
        .oneshot(
            Request::get("/api/v1/applications/app-1/transitions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = read_json_body(response).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["actor_user_id"], "ops-2");
}

#[tokio::test]
async fn invalid_transition_maps_to_conflict() {
    let loans = MemoryLoans::with(vec![application("app-1", ApplicationState::Denied)]);
    let router = lifecycle_router(Arc::new(PersistedStateMachine::new(Arc::new(loans))));

    let response = router
        .oneshot(post_transition("app-1", json!({ "to_state": "active" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["code"], "state_transition_invalid");
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.starts_with("transition error")));
}

#[tokio::test]
async fn unknown_application_maps_to_not_found() {
    let router = lifecycle_router(Arc::new(PersistedStateMachine::new(Arc::new(
        MemoryLoans::default(),
    ))));

    let response = router
        .oneshot(post_transition("ghost", json!({ "to_state": "submitted" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn simulated_router_marks_outcomes() {
    let router = lifecycle_router(Arc::new(SimulatedStateMachine::default()));

    let response = router
        .oneshot(post_transition(
            "app-sim",
            json!({ "from_state": "under_review", "to_state": "conditional" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["simulated"], true);
    assert_eq!(body["audit_recorded"], false);
    assert_eq!(body["previous_state"], "under_review");
}
