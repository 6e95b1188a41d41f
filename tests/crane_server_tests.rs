use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use tams::app::AppState;
use tams::ccs::server::crane_router;
use tams::ccs::types::{Coordinates, Job, JobType, Unit};
use tams::state::JobState;
use tams::storage::{Stack, Storage};

fn test_state() -> AppState {
    let mut a1 = Stack::new("A1", Coordinates::new(1000, 2000, 0), 2);
    a1.push(Unit::new("C1"));
    let storage = Storage::new(vec![a1, Stack::new("A2", Coordinates::new(4000, 2000, 0), 2)]);
    AppState::new(JobState::new(false), storage)
}

fn app(state: &AppState) -> Router {
    crane_router(state.clone(), false)
}

async fn post(app: Router, uri: &str, body: String) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn dispatch(state: &AppState, job: Job) {
    let mut jobs = state.jobs.write().await;
    jobs.enqueue(job).unwrap();
    jobs.dispatch_next().unwrap();
}

#[tokio::test]
async fn test_done_status_reconciles_running_pick() {
    let state = test_state();
    dispatch(
        &state,
        Job::new(JobType::Pick, Coordinates::new(1000, 2000, 0), Unit::new("C1")),
    )
    .await;

    let (status, body) = post(
        app(&state),
        "/state",
        json!({"jobType": "pick", "jobStatus": "done"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    assert!(!state.jobs.read().await.has_running_job());
    assert_eq!(state.storage.read().await.crane().number(), Some("C1"));
    let feed = state.messages.read(false).await;
    assert!(feed.msg.iter().any(|m| m.text == "job done"));
}

#[tokio::test]
async fn test_in_progress_status_is_cached() {
    let state = test_state();
    let (status, _) = post(
        app(&state),
        "/state",
        json!({"jobType": "move", "jobStatus": "inProgress", "unit": {"number": "C1"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let jobs = state.jobs.read().await;
    assert_eq!(jobs.status().unwrap().unit.number, "C1");
}

#[tokio::test]
async fn test_malformed_status_is_rejected() {
    let state = test_state();
    let (status, body) = post(app(&state), "/state", "{\"jobStatus\": 5}".to_string()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, "Invalid input");
    assert!(state.jobs.read().await.status().is_none());
}

#[tokio::test]
async fn test_failed_reconciliation_returns_500() {
    let state = test_state();
    dispatch(
        &state,
        Job::new(JobType::Drop, Coordinates::new(4000, 2000, 0), Unit::new("C9")),
    )
    .await;

    let (status, body) = post(
        app(&state),
        "/state",
        json!({"jobType": "drop", "jobStatus": "done"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("crane holds no unit"));

    assert!(state.jobs.read().await.has_running_job());
    let feed = state.messages.read(false).await;
    assert_eq!(feed.msg.len(), 1);
    assert_eq!(feed.msg[0].title, "CCS state_post");
}

#[tokio::test]
async fn test_details_post() {
    let state = test_state();
    let details = json!({
        "features": [{"featureId": "f1", "type": "cis", "vendor": "acme", "version": "v2"}]
    });

    let (status, _) = post(app(&state), "/details", details.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    {
        let jobs = state.jobs.read().await;
        assert_eq!(jobs.details().features.len(), 1);
        assert_eq!(jobs.details().features[0].vendor, "acme");
    }

    let (status, _) = post(app(&state), "/details", "features: none".to_string()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_alarm_is_reported_as_error_message() {
    let state = test_state();
    let (status, _) = post(app(&state), "/alarm", "emergency stop".to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let feed = state.messages.read(true).await;
    assert_eq!(feed.msg[0].text, "emergency stop");
    assert_eq!(feed.msg[0].kind, tams::web::MessageKind::Error);
}

#[tokio::test]
async fn test_metric_post() {
    let state = test_state();
    let (status, _) = post(app(&state), "/metric", json!({"lifts": 42}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.metrics.get().await, json!({"lifts": 42}));

    let (status, _) = post(app(&state), "/metric", "lifts=42".to_string()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(state.metrics.get().await, json!({"lifts": 42}));
}
