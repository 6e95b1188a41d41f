//! Job queue and lifecycle.
//!
//! [`JobState`] holds the FIFO of pending jobs, the single job currently
//! running on the crane, and the last status and details the crane reported.
//! When the crane reports DONE for the running job, the job is handed to
//! [`Storage::process_job_done`] and only cleared if the yard accepted it.

use std::collections::VecDeque;

use crate::ccs::types::{CraneDetails, CraneStatus, Job, JobType};
use crate::error::JobError;
use crate::storage::Storage;

/// Outcome of a valid status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Status cached, no job finished.
    Updated,
    /// The running job finished and was applied to the yard.
    Done(Job),
}

#[derive(Debug, Default)]
pub struct JobState {
    pending: VecDeque<Job>,
    running: Option<Job>,
    status: Option<CraneStatus>,
    details: CraneDetails,
    cancel_requested: bool,
    verbose: bool,
}

impl JobState {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    /// Queue a job for dispatch.
    pub fn enqueue(&mut self, job: Job) -> Result<(), JobError> {
        if job.job_type == JobType::Unknown {
            tracing::warn!(unit = %job.unit.number, "Rejected job with unknown type");
            return Err(JobError::UnsupportedType(job.job_type));
        }

        if self.verbose {
            tracing::info!(job = ?job, "Job enqueued");
        } else {
            tracing::info!(
                job_type = %job.job_type,
                x = job.target.x,
                y = job.target.y,
                z = job.target.z,
                unit = %job.unit.number,
                "Job enqueued"
            );
        }
        self.pending.push_back(job);
        Ok(())
    }

    /// Parse and queue a serialized job. Malformed payloads are discarded.
    pub fn enqueue_json(&mut self, payload: &str) -> Result<(), JobError> {
        let job: Job = serde_json::from_str(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed job payload");
            JobError::InvalidPayload(e)
        })?;
        self.enqueue(job)
    }

    pub fn has_running_job(&self) -> bool {
        self.running.is_some()
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn peek_next_pending(&self) -> Option<&Job> {
        self.pending.front()
    }

    pub fn running_job(&self) -> Option<&Job> {
        self.running.as_ref()
    }

    pub fn pending_jobs(&self) -> impl Iterator<Item = &Job> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn status(&self) -> Option<&CraneStatus> {
        self.status.as_ref()
    }

    pub fn details(&self) -> &CraneDetails {
        &self.details
    }

    pub fn set_details(&mut self, details: CraneDetails) {
        self.details = details;
    }

    /// Promote the head of the queue to the running job.
    ///
    /// Callers are expected to check [`has_running_job`](Self::has_running_job)
    /// and [`has_pending_jobs`](Self::has_pending_jobs) first; violating either
    /// is reported as an error and changes nothing.
    pub fn dispatch_next(&mut self) -> Result<Job, JobError> {
        if self.running.is_some() {
            return Err(JobError::AlreadyRunning);
        }
        let job = self.pending.pop_front().ok_or(JobError::NoPendingJobs)?;
        tracing::info!(job_type = %job.job_type, unit = %job.unit.number, "Job dispatched");
        self.running = Some(job.clone());
        Ok(job)
    }

    /// Parse and apply a status report from the crane.
    pub fn report_status(
        &mut self,
        payload: &str,
        storage: &mut Storage,
    ) -> Result<StatusOutcome, JobError> {
        let status: CraneStatus = serde_json::from_str(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected malformed status payload");
            JobError::InvalidPayload(e)
        })?;
        self.apply_status(status, storage)
    }

    /// Cache a status snapshot and reconcile the running job once it is done.
    ///
    /// A failed reconciliation keeps the running job so the inconsistency
    /// stays visible to the operator.
    pub fn apply_status(
        &mut self,
        status: CraneStatus,
        storage: &mut Storage,
    ) -> Result<StatusOutcome, JobError> {
        tracing::debug!(
            job_type = %status.job_type,
            job_status = %status.job_status,
            unit = %status.unit.number,
            "Crane status received"
        );
        let done = status.is_done();
        self.status = Some(status);

        if !done {
            return Ok(StatusOutcome::Updated);
        }
        let Some(job) = self.running.take() else {
            return Ok(StatusOutcome::Updated);
        };

        if let Err(e) = storage.process_job_done(&job) {
            tracing::error!(
                job_type = %job.job_type,
                unit = %job.unit.number,
                error = %e,
                "Completed job could not be applied to the yard"
            );
            self.running = Some(job);
            return Err(JobError::Reconcile(e));
        }

        tracing::info!(job_type = %job.job_type, unit = %job.unit.number, "Job done");
        Ok(StatusOutcome::Done(job))
    }

    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub fn clear_cancel(&mut self) {
        self.cancel_requested = false;
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn clear_running_job(&mut self) {
        if let Some(job) = self.running.take() {
            tracing::info!(job_type = %job.job_type, unit = %job.unit.number, "Running job cleared");
        }
    }

    pub fn clear_pending_jobs(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        tracing::info!(dropped, "Pending jobs cleared");
    }
}
