use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tams::app::AppState;
use tams::ccs::types::{CraneDetails, Feature, Job, JobType, Unit};
use tams::ccs::{CcsPoller, CraneEndpoint, CraneReply};
use tams::error::{Result, TamsError};
use tams::state::JobState;
use tams::storage::Storage;
use tams::web::MessageKind;

/// Scripted crane: answers every call with the configured reply and records
/// what it was sent.
#[derive(Clone)]
struct MockCrane {
    job_reply: Option<CraneReply>,
    cancel_reply: Option<CraneReply>,
    details: Option<CraneDetails>,
    sent: Arc<Mutex<Vec<Job>>>,
    cancels: Arc<Mutex<usize>>,
}

impl MockCrane {
    fn accepting() -> Self {
        Self {
            job_reply: Some(CraneReply::Accepted),
            cancel_reply: Some(CraneReply::Accepted),
            details: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            cancels: Arc::new(Mutex::new(0)),
        }
    }

    fn rejecting() -> Self {
        let rejected = CraneReply::Rejected {
            status: 409,
            body: "busy".to_string(),
        };
        Self {
            job_reply: Some(rejected.clone()),
            cancel_reply: Some(rejected),
            ..Self::accepting()
        }
    }

    /// Every call fails as if the crane were offline.
    fn unreachable() -> Self {
        Self {
            job_reply: None,
            cancel_reply: None,
            ..Self::accepting()
        }
    }

    fn sent(&self) -> Vec<Job> {
        self.sent.lock().unwrap().clone()
    }
}

fn offline() -> TamsError {
    TamsError::Internal("connection refused".to_string())
}

impl CraneEndpoint for MockCrane {
    async fn send_job(&self, job: &Job) -> Result<CraneReply> {
        self.sent.lock().unwrap().push(job.clone());
        self.job_reply.clone().ok_or_else(offline)
    }

    async fn cancel_job(&self) -> Result<CraneReply> {
        *self.cancels.lock().unwrap() += 1;
        self.cancel_reply.clone().ok_or_else(offline)
    }

    async fn fetch_details(&self) -> Result<CraneDetails> {
        self.details.clone().ok_or_else(offline)
    }
}

fn state_with_jobs(numbers: &[&str]) -> AppState {
    let mut jobs = JobState::new(false);
    for number in numbers {
        jobs.enqueue(Job::new(JobType::Move, Default::default(), Unit::new(*number)))
            .unwrap();
    }
    AppState::new(jobs, Storage::default())
}

fn poller(crane: &MockCrane, state: &AppState) -> CcsPoller<MockCrane> {
    CcsPoller::new(crane.clone(), state.clone(), Duration::from_millis(10))
}

#[tokio::test]
async fn test_tick_dispatches_one_job_at_a_time() {
    let crane = MockCrane::accepting();
    let state = state_with_jobs(&["C1", "C2"]);
    let poller = poller(&crane, &state);

    poller.tick().await;
    poller.tick().await;

    let sent = crane.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].unit.number, "C1");

    let jobs = state.jobs.read().await;
    assert_eq!(jobs.running_job().unwrap().unit.number, "C1");
    assert_eq!(jobs.pending_len(), 1);

    let feed = state.messages.read(false).await;
    assert_eq!(feed.msg[0].title, "CCS send_job");
    assert_eq!(feed.msg[0].text, "crane acked job");
}

#[tokio::test]
async fn test_rejected_job_stays_running() {
    let crane = MockCrane::rejecting();
    let state = state_with_jobs(&["C1"]);

    poller(&crane, &state).tick().await;

    assert!(state.jobs.read().await.has_running_job());
    let feed = state.messages.read(false).await;
    assert_eq!(feed.msg[0].kind, MessageKind::Error);
    assert_eq!(feed.msg[0].text, "crane rejected job");
}

#[tokio::test]
async fn test_unreachable_crane_keeps_job_running() {
    let crane = MockCrane::unreachable();
    let state = state_with_jobs(&["C1"]);

    poller(&crane, &state).tick().await;

    assert!(state.jobs.read().await.has_running_job());
    let feed = state.messages.read(false).await;
    assert!(feed.msg[0].text.starts_with("crane unreachable"));
}

#[tokio::test]
async fn test_accepted_cancel_clears_running_job() {
    let crane = MockCrane::accepting();
    let state = state_with_jobs(&["C1", "C2"]);
    let poller = poller(&crane, &state);
    poller.tick().await;

    state.jobs.write().await.request_cancel();
    poller.tick().await;

    assert_eq!(*crane.cancels.lock().unwrap(), 1);
    let jobs = state.jobs.read().await;
    assert!(!jobs.cancel_requested());
    // The cancelled job is gone and the next one was dispatched in the same cycle.
    assert_eq!(jobs.running_job().unwrap().unit.number, "C2");
    drop(jobs);

    let texts: Vec<String> = state
        .messages
        .read(false)
        .await
        .msg
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert!(texts.contains(&"crane cancelled job".to_string()));
}

#[tokio::test]
async fn test_refused_cancel_keeps_running_job() {
    let crane = MockCrane::rejecting();
    let state = state_with_jobs(&["C1"]);
    let poller = poller(&crane, &state);
    poller.tick().await;

    state.jobs.write().await.request_cancel();
    poller.tick().await;

    let jobs = state.jobs.read().await;
    assert!(!jobs.cancel_requested());
    assert_eq!(jobs.running_job().unwrap().unit.number, "C1");
    drop(jobs);

    let feed = state.messages.read(false).await;
    assert!(feed
        .msg
        .iter()
        .any(|m| m.text == "crane cancel job not possible" && m.kind == MessageKind::Error));
}

#[tokio::test]
async fn test_tick_refreshes_details() {
    let mut crane = MockCrane::accepting();
    crane.details = Some(CraneDetails {
        features: vec![Feature {
            vendor: "acme".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    });
    let state = state_with_jobs(&[]);

    poller(&crane, &state).tick().await;

    assert_eq!(state.jobs.read().await.details().features[0].vendor, "acme");
    assert!(crane.sent().is_empty());
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let crane = MockCrane::accepting();
    let state = state_with_jobs(&["C1"]);
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(poller(&crane, &state).run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller did not stop")
        .unwrap();
    assert_eq!(crane.sent().len(), 1);
}
