use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::ccs::client::{CraneEndpoint, CraneReply};

/// Periodically drives the crane: forwards cancel requests, refreshes the
/// crane details and dispatches the next pending job.
///
/// Locks on the job state are only held for in-memory updates, never across
/// a request to the crane.
pub struct CcsPoller<C> {
    crane: C,
    state: AppState,
    interval: Duration,
}

impl<C: CraneEndpoint> CcsPoller<C> {
    pub fn new(crane: C, state: AppState, interval: Duration) -> Self {
        Self {
            crane,
            state,
            interval,
        }
    }

    /// Poll until `shutdown` is cancelled. A slow crane only delays the next cycle.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "CCS poller started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("CCS poller stopped");
                    break;
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    /// One poll cycle.
    pub async fn tick(&self) {
        self.forward_cancel().await;
        self.refresh_details().await;
        self.dispatch().await;
    }

    async fn forward_cancel(&self) {
        if !self.state.jobs.read().await.cancel_requested() {
            return;
        }

        let reply = self.crane.cancel_job().await;
        let mut jobs = self.state.jobs.write().await;
        jobs.clear_cancel();
        match reply {
            Ok(CraneReply::Accepted) => {
                jobs.clear_running_job();
                drop(jobs);
                tracing::info!("Crane cancelled job");
                self.state
                    .messages
                    .add("CCS send_cancel", "crane cancelled job")
                    .await;
            }
            Ok(CraneReply::Rejected { status, body }) => {
                drop(jobs);
                tracing::warn!(status, body = %body, "Crane refused cancel");
                self.state
                    .messages
                    .add_error("CCS send_cancel", "crane cancel job not possible")
                    .await;
            }
            Err(e) => {
                drop(jobs);
                tracing::warn!(error = %e, "Cancel request to crane failed");
                self.state
                    .messages
                    .add_error("CCS send_cancel", format!("crane unreachable: {e}"))
                    .await;
            }
        }
    }

    async fn refresh_details(&self) {
        match self.crane.fetch_details().await {
            Ok(details) => self.state.jobs.write().await.set_details(details),
            Err(e) => tracing::debug!(error = %e, "Crane details unavailable"),
        }
    }

    async fn dispatch(&self) {
        let job = {
            let mut jobs = self.state.jobs.write().await;
            if jobs.has_running_job() || !jobs.has_pending_jobs() {
                return;
            }
            match jobs.dispatch_next() {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!(error = %e, "Dispatch skipped");
                    return;
                }
            }
        };

        match self.crane.send_job(&job).await {
            Ok(CraneReply::Accepted) => {
                tracing::info!(job_type = %job.job_type, unit = %job.unit.number, "Crane acked job");
                self.state.messages.add("CCS send_job", "crane acked job").await;
            }
            Ok(CraneReply::Rejected { status, body }) => {
                tracing::warn!(
                    job_type = %job.job_type,
                    unit = %job.unit.number,
                    status,
                    body = %body,
                    "Crane rejected job"
                );
                self.state
                    .messages
                    .add_error("CCS send_job", "crane rejected job")
                    .await;
            }
            Err(e) => {
                tracing::warn!(job_type = %job.job_type, unit = %job.unit.number, error = %e, "Sending job to crane failed");
                self.state
                    .messages
                    .add_error("CCS send_job", format!("crane unreachable: {e}"))
                    .await;
            }
        }
    }
}
