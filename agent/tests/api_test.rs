//! Integration tests for the local HTTP API.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{app_state, RecordingTransport};
use serde_json::{json, Value};
use tether_agent::{build_router, AppState};
use tower::ServiceExt;

async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

#[tokio::test]
async fn health() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;
    let (status, body) = send(&state, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["online"], false);
    assert_eq!(body["remote"], "http://remote.test");
}

#[tokio::test]
async fn enqueue_list_and_clear() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;

    let (status, body) = send(
        &state,
        Method::POST,
        "/queue",
        Some(json!({"kind": "CREATE", "collection": "activityTypes", "payload": {"name": "Yoga"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_i64());

    let (_, body) = send(&state, Method::GET, "/queue", None).await;
    assert_eq!(body["length"], 1);

    let (status, body) = send(&state, Method::GET, "/queue/operations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["kind"], "CREATE");
    assert_eq!(body[0]["collection"], "activityTypes");
    assert_eq!(body[0]["retryCount"], 0);

    let (status, body) = send(&state, Method::DELETE, "/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
}

#[tokio::test]
async fn enqueue_update_without_id_is_rejected() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;

    let (status, body) = send(
        &state,
        Method::POST,
        "/queue",
        Some(json!({"kind": "UPDATE", "collection": "roles", "payload": {"name": "Lead"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    assert!(body["details"].is_string());
    assert_eq!(state.queue.queue_length().await, 0);
}

#[tokio::test]
async fn sync_reports_pass_outcome() {
    let transport = Arc::new(RecordingTransport::failing_when(|call| {
        call.id.as_deref() == Some("bad")
    }));
    let state = app_state(transport.clone()).await;

    for payload in [json!({"id": "ok-1"}), json!({"id": "bad"}), json!({"id": "ok-2"})] {
        state
            .queue
            .enqueue(tether_engine::OperationKind::Delete, tether_engine::Collection::Venues, payload)
            .await
            .unwrap();
    }

    let (status, body) = send(&state, Method::POST, "/sync", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn snapshots_replace_and_read() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;

    let (status, _) = send(
        &state,
        Method::PUT,
        "/snapshots",
        Some(json!({"activityTypes": [{"id": 1, "name": "Yoga"}, {"id": 2, "name": "Run"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&state, Method::GET, "/snapshots/activity-types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1, "name": "Yoga"}, {"id": 2, "name": "Run"}]));

    let (_, body) = send(&state, Method::GET, "/snapshots/venues", None).await;
    assert_eq!(body, json!([]));

    let (status, body) = send(&state, Method::DELETE, "/snapshots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 2);
}

#[tokio::test]
async fn invalid_snapshot_batch_writes_nothing() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;

    let (status, _) = send(
        &state,
        Method::PUT,
        "/snapshots",
        Some(json!({"roles": [{"id": "r1"}], "venues": [{"name": "no id"}]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = send(&state, Method::GET, "/snapshots/roles", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;
    let (status, body) = send(&state, Method::GET, "/snapshots/widgets", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown collection: widgets");
}

#[tokio::test]
async fn connectivity_round_trip() {
    let state = app_state(Arc::new(RecordingTransport::accepting())).await;

    let (status, body) = send(&state, Method::PUT, "/connectivity", Some(json!({"online": true}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"online": true, "changed": true}));

    let (_, body) = send(&state, Method::PUT, "/connectivity", Some(json!({"online": true}))).await;
    assert_eq!(body["changed"], false);

    let (_, body) = send(&state, Method::GET, "/connectivity", None).await;
    assert_eq!(body, json!({"online": true}));
}
