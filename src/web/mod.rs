//! Operator UI endpoints.
//!
//! Everything is JSON (or plain text for short acknowledgements). Views read
//! the shared state; actions enqueue jobs or correct the yard by hand.

pub mod messages;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::ccs::types::{Coordinates, Job, JobType, UNIT_HEIGHT_MM};
use crate::error::{JobError, YardError};
use crate::storage::Stack;

pub use messages::{Message, MessageFeed, MessageKind, Messages};

const INVALID_INPUT: &str = "Invalid input";

/// Which editing view the operator UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    #[default]
    Init,
    Pos,
    Drop,
    Auto,
}

impl fmt::Display for UiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiMode::Init => write!(f, "init"),
            UiMode::Pos => write!(f, "pos"),
            UiMode::Drop => write!(f, "drop"),
            UiMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for UiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "init" => Ok(UiMode::Init),
            "pos" => Ok(UiMode::Pos),
            "drop" => Ok(UiMode::Drop),
            "auto" => Ok(UiMode::Auto),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

#[derive(Serialize)]
struct JobsResponse {
    pending: Vec<Job>,
    running: Option<Job>,
}

#[derive(Deserialize)]
struct MessagesQuery {
    clear: Option<bool>,
}

pub fn web_router(state: AppState, log_calls: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/stacks", get(stacks_get))
        .route("/container", get(container_get))
        .route("/jobs", get(jobs_get))
        .route("/state", get(state_get))
        .route("/details", get(details_get))
        .route("/metric", get(metric_get))
        .route("/messages", get(messages_get))
        .route("/refresh", get(refresh_get))
        .route("/mode", get(mode_get).post(mode_post))
        .route("/job", post(job_post))
        .route("/job_cancel", post(job_cancel))
        .route("/job_clear_running", post(job_clear_running))
        .route("/job_clear_pending", post(job_clear_pending))
        .route(
            "/stacks/container/{layer}/{stack_name}/{unit}",
            post(stacks_container_post),
        )
        .route("/stacks/setpos/{stack_name}", post(stacks_setpos_post))
        .route("/stacks/drop/{stack_name}", post(stacks_drop_post))
        .route(
            "/container/generate_move/{from}/{to}",
            post(generate_move_post),
        )
        .layer(cors);

    let router = if log_calls {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

pub async fn run_web_server(
    addr: SocketAddr,
    state: AppState,
    log_calls: bool,
    shutdown: CancellationToken,
) {
    let app = web_router(state, log_calls);

    tracing::info!(addr = %addr, "Starting web UI server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind web UI server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "Web UI server failed");
    }
}

async fn stacks_get(State(state): State<AppState>) -> Json<Vec<Stack>> {
    Json(state.storage.read().await.stacks().to_vec())
}

async fn container_get(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.storage.read().await.unit_locations())
}

async fn jobs_get(State(state): State<AppState>) -> Json<JobsResponse> {
    let jobs = state.jobs.read().await;
    Json(JobsResponse {
        pending: jobs.pending_jobs().cloned().collect(),
        running: jobs.running_job().cloned(),
    })
}

async fn state_get(State(state): State<AppState>) -> Response {
    match state.jobs.read().await.status() {
        Some(status) => Json(status.clone()).into_response(),
        None => Json(json!({})).into_response(),
    }
}

async fn details_get(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.jobs.read().await.details().clone())
}

async fn metric_get(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get().await)
}

async fn messages_get(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Json<MessageFeed> {
    Json(state.messages.read(query.clear.unwrap_or(true)).await)
}

async fn refresh_get(State(state): State<AppState>) -> impl IntoResponse {
    let refresh = state.storage.write().await.take_ui_refresh();
    Json(json!({ "refresh": refresh }))
}

async fn mode_get(State(state): State<AppState>) -> String {
    state.mode.read().await.to_string()
}

async fn mode_post(State(state): State<AppState>, body: String) -> (StatusCode, &'static str) {
    match body.parse::<UiMode>() {
        Ok(mode) => {
            tracing::info!(mode = %mode, "UI mode changed");
            *state.mode.write().await = mode;
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected UI mode");
            (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT)
        }
    }
}

async fn job_post(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let result = state.jobs.write().await.enqueue_json(&body);
    match result {
        Ok(()) => {
            state.messages.add("WEB job_post", "ok").await;
            (StatusCode::OK, "OK".to_string())
        }
        Err(JobError::InvalidPayload(_)) => {
            state.messages.add_error("WEB job_post", "invalid").await;
            (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT.to_string())
        }
        Err(e) => {
            state.messages.add_error("WEB job_post", e.to_string()).await;
            (StatusCode::METHOD_NOT_ALLOWED, e.to_string())
        }
    }
}

async fn job_cancel(State(state): State<AppState>) -> &'static str {
    state.jobs.write().await.request_cancel();
    state.messages.add("WEB job_cancel", "ok").await;
    "OK"
}

async fn job_clear_running(State(state): State<AppState>) -> &'static str {
    state.jobs.write().await.clear_running_job();
    state.messages.add("WEB job_clear_running", "ok").await;
    "OK"
}

async fn job_clear_pending(State(state): State<AppState>) -> &'static str {
    state.jobs.write().await.clear_pending_jobs();
    state.messages.add("WEB job_clear_pending", "ok").await;
    "OK"
}

fn yard_error_status(e: &YardError) -> StatusCode {
    match e {
        YardError::StackNotFound(_) | YardError::UnitNotFound(_) => StatusCode::NOT_FOUND,
        YardError::LayerOutOfRange { .. } => StatusCode::BAD_REQUEST,
    }
}

async fn stacks_container_post(
    State(state): State<AppState>,
    Path((layer, stack_name, unit)): Path<(usize, String, String)>,
) -> (StatusCode, String) {
    let number = unit.replace('_', " ");
    let result = state
        .storage
        .write()
        .await
        .place_in_stack(layer, &stack_name, &number);

    match result {
        Ok(placement) => {
            tracing::debug!(stack = %stack_name, layer, unit = %number, placement = ?placement, "Manual placement");
            (StatusCode::OK, "OK".to_string())
        }
        Err(e) => {
            state
                .messages
                .add_error("WEB stacks_container", e.to_string())
                .await;
            (yard_error_status(&e), e.to_string())
        }
    }
}

async fn stacks_setpos_post(
    State(state): State<AppState>,
    Path(stack_name): Path<String>,
    body: String,
) -> (StatusCode, String) {
    let coordinates: Coordinates = match serde_json::from_str(&body) {
        Ok(coordinates) => coordinates,
        Err(e) => {
            tracing::warn!(stack = %stack_name, error = %e, "Rejected stack position");
            return (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT.to_string());
        }
    };

    let result = state
        .storage
        .write()
        .await
        .set_stack_position(&stack_name, coordinates);
    match result {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(e) => (yard_error_status(&e), e.to_string()),
    }
}

/// Target for a unit landing on top of `stack`.
fn drop_target(stack: &Stack) -> Coordinates {
    let mut target = stack.coordinates;
    target.z += UNIT_HEIGHT_MM * stack.count() as i64;
    target
}

/// Target for the top unit of a non-empty `stack`.
fn pick_target(stack: &Stack) -> Coordinates {
    let mut target = stack.coordinates;
    target.z += UNIT_HEIGHT_MM * (stack.count() as i64 - 1);
    target
}

async fn stacks_drop_post(
    State(state): State<AppState>,
    Path(stack_name): Path<String>,
) -> (StatusCode, String) {
    let mut jobs = state.jobs.write().await;
    let storage = state.storage.read().await;

    let Some(stack) = storage.find_stack(&stack_name) else {
        return (
            StatusCode::NOT_FOUND,
            YardError::StackNotFound(stack_name).to_string(),
        );
    };
    let Some(unit) = storage.crane().unit() else {
        drop(storage);
        drop(jobs);
        state
            .messages
            .add_error("WEB stacks_drop", "crane holds no unit")
            .await;
        return (StatusCode::CONFLICT, "crane holds no unit".to_string());
    };
    if stack.is_full() {
        return (StatusCode::CONFLICT, format!("stack {stack_name} is full"));
    }

    let job = Job::new(JobType::Drop, drop_target(stack), unit.clone());
    drop(storage);
    let result = jobs.enqueue(job);
    drop(jobs);

    match result {
        Ok(()) => {
            state
                .messages
                .add("WEB stacks_drop", format!("drop onto {stack_name}"))
                .await;
            (StatusCode::OK, "OK".to_string())
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn generate_move_post(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
) -> (StatusCode, String) {
    if from == to {
        state
            .messages
            .add_error("from and to are identical", "invalid")
            .await;
        return (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT.to_string());
    }

    let mut jobs = state.jobs.write().await;
    let storage = state.storage.read().await;

    let (Some(from_stack), Some(to_stack)) = (storage.find_stack(&from), storage.find_stack(&to))
    else {
        let missing = if storage.find_stack(&from).is_none() {
            from
        } else {
            to
        };
        return (
            StatusCode::NOT_FOUND,
            YardError::StackNotFound(missing).to_string(),
        );
    };
    let Some(unit) = from_stack.top().cloned() else {
        return (StatusCode::CONFLICT, format!("stack {from} is empty"));
    };
    if to_stack.is_full() {
        return (StatusCode::CONFLICT, format!("stack {to} is full"));
    }

    let pick = Job::new(JobType::Pick, pick_target(from_stack), unit.clone());
    let drop_job = Job::new(JobType::Drop, drop_target(to_stack), unit);
    drop(storage);

    let result = jobs.enqueue(pick).and_then(|()| jobs.enqueue(drop_job));
    drop(jobs);

    match result {
        Ok(()) => {
            state
                .messages
                .add("WEB generate_move", format!("generate jobs {from} -> {to}"))
                .await;
            (StatusCode::OK, "OK".to_string())
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccs::types::Unit;

    #[test]
    fn ui_mode_parses_known_names() {
        assert_eq!("auto".parse::<UiMode>().unwrap(), UiMode::Auto);
        assert_eq!(" pos\n".parse::<UiMode>().unwrap(), UiMode::Pos);
        assert!("manual".parse::<UiMode>().is_err());
        assert_eq!(UiMode::default().to_string(), "init");
    }

    #[test]
    fn targets_follow_stack_fill() {
        let mut stack = Stack::new("A1", Coordinates::new(100, 200, 10), 3);
        assert_eq!(drop_target(&stack).z, 10);
        stack.push(Unit::new("C1"));
        stack.push(Unit::new("C2"));
        assert_eq!(drop_target(&stack).z, 10 + 2 * UNIT_HEIGHT_MM);
        assert_eq!(pick_target(&stack).z, 10 + UNIT_HEIGHT_MM);
        assert_eq!(pick_target(&stack).x, 100);
    }

    #[test]
    fn yard_errors_map_to_http_status() {
        assert_eq!(
            yard_error_status(&YardError::StackNotFound("Z9".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            yard_error_status(&YardError::LayerOutOfRange {
                stack: "A1".into(),
                layer: 9,
                height: 2
            }),
            StatusCode::BAD_REQUEST
        );
    }
}
