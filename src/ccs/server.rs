use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::post, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::ccs::types::CraneDetails;
use crate::error::JobError;
use crate::state::StatusOutcome;

const INVALID_INPUT: &str = "Invalid input";

/// Routes the crane posts to.
pub fn crane_router(state: AppState, log_calls: bool) -> Router {
    let router = Router::new()
        .route("/state", post(state_post))
        .route("/details", post(details_post))
        .route("/alarm", post(alarm_post))
        .route("/metric", post(metric_post));

    let router = if log_calls {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

pub async fn run_crane_server(
    addr: SocketAddr,
    state: AppState,
    log_calls: bool,
    shutdown: CancellationToken,
) {
    let app = crane_router(state, log_calls);

    tracing::info!(addr = %addr, "Starting crane endpoint server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind crane endpoint server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "Crane endpoint server failed");
    }
}

async fn state_post(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let result = {
        let mut jobs = state.jobs.write().await;
        let mut storage = state.storage.write().await;
        jobs.report_status(&body, &mut storage)
    };

    match result {
        Ok(StatusOutcome::Done(_)) => {
            state.messages.add("CCS state_post", "job done").await;
            (StatusCode::OK, "OK".to_string())
        }
        Ok(StatusOutcome::Updated) => (StatusCode::OK, "OK".to_string()),
        Err(JobError::InvalidPayload(_)) => {
            (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT.to_string())
        }
        Err(e) => {
            state
                .messages
                .add_error("CCS state_post", e.to_string())
                .await;
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn details_post(State(state): State<AppState>, body: String) -> (StatusCode, &'static str) {
    match serde_json::from_str::<CraneDetails>(&body) {
        Ok(details) => {
            state.jobs.write().await.set_details(details);
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed crane details");
            (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT)
        }
    }
}

async fn alarm_post(State(state): State<AppState>, body: String) -> &'static str {
    tracing::warn!(alarm = %body, "Crane alarm");
    state.messages.add_error("CCS alarm", body).await;
    "OK"
}

async fn metric_post(State(state): State<AppState>, body: String) -> (StatusCode, &'static str) {
    match serde_json::from_str(&body) {
        Ok(metrics) => {
            state.metrics.set(metrics).await;
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed crane metrics");
            (StatusCode::METHOD_NOT_ALLOWED, INVALID_INPUT)
        }
    }
}
