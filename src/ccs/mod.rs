//! Everything that talks to the crane control system (CCS).
//!
//! - [`types`]: wire types shared with the crane (jobs, units, status)
//! - [`client`]: outbound HTTP calls to the crane
//! - [`poller`]: the loop that dispatches jobs and refreshes crane details
//! - [`server`]: inbound endpoints the crane posts status, alarms and metrics to
//!
//! # Dispatch Flow
//!
//! 1. Operator enqueues a job through the UI server
//! 2. [`poller::CcsPoller`] dispatches it and posts it to the crane
//! 3. The crane posts status reports to [`server`]
//! 4. A DONE report reconciles the job against the yard

pub mod client;
pub mod poller;
pub mod server;
pub mod types;

pub use client::{CraneEndpoint, CraneReply, HttpCraneClient};
pub use poller::CcsPoller;
