use thiserror::Error;

use crate::ccs::types::JobType;

#[derive(Error, Debug)]
pub enum TamsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Crane request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TamsError>;

/// Failures of job queue operations.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid job payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Unsupported job type: {0}")]
    UnsupportedType(JobType),

    #[error("A job is already running")]
    AlreadyRunning,

    #[error("No pending jobs")]
    NoPendingJobs,

    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Failures of operator-driven yard relocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum YardError {
    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Layer {layer} out of range for stack {stack} (height {height})")]
    LayerOutOfRange {
        stack: String,
        layer: usize,
        height: usize,
    },
}

/// Failures applying a completed job to the yard. The yard is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Drop reported but the crane holds no unit")]
    CraneEmpty,

    #[error("Pick reported but the crane already holds unit {0}")]
    CraneOccupied(String),

    #[error("No stack at x={x} y={y}")]
    NoStackAt { x: i64, y: i64 },

    #[error("Stack {0} is full")]
    StackFull(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Unsupported job type: {0}")]
    UnsupportedJobType(JobType),
}
