use tams::ccs::types::{Coordinates, CraneJobStatus, CraneStatus, Job, JobType, Unit};
use tams::error::JobError;
use tams::state::{JobState, StatusOutcome};
use tams::storage::Storage;

fn move_job(number: &str) -> Job {
    Job::new(JobType::Move, Coordinates::new(0, 0, 0), Unit::new(number))
}

fn status(job_status: CraneJobStatus) -> CraneStatus {
    CraneStatus::new(JobType::Move, job_status)
}

#[test]
fn test_dispatch_preserves_fifo_order() {
    let mut storage = Storage::default();
    let mut state = JobState::new(false);
    let numbers: Vec<String> = (1..=5).map(|i| format!("C{i}")).collect();
    for number in &numbers {
        state.enqueue(move_job(number)).unwrap();
    }

    for number in &numbers {
        let job = state.dispatch_next().unwrap();
        assert_eq!(&job.unit.number, number);
        state
            .apply_status(status(CraneJobStatus::Done), &mut storage)
            .unwrap();
    }
    assert!(!state.has_pending_jobs());
}

#[test]
fn test_at_most_one_running_job() {
    let mut storage = Storage::default();
    let mut state = JobState::new(false);

    // Deterministic interleaving of enqueue / dispatch / status reports.
    for step in 0..60u32 {
        match step % 7 {
            0 | 3 => state.enqueue(move_job(&format!("C{step}"))).unwrap(),
            1 | 4 | 6 => {
                let had_running = state.has_running_job();
                match state.dispatch_next() {
                    Ok(_) => assert!(!had_running),
                    Err(JobError::AlreadyRunning) => assert!(had_running),
                    Err(JobError::NoPendingJobs) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            2 => {
                state
                    .apply_status(status(CraneJobStatus::InProgress), &mut storage)
                    .unwrap();
            }
            _ => {
                state
                    .apply_status(status(CraneJobStatus::Done), &mut storage)
                    .unwrap();
            }
        }
        assert!(state.running_job().into_iter().count() <= 1);
    }
}

#[test]
fn test_malformed_payload_leaves_queue_unchanged() {
    let mut state = JobState::new(false);
    state.enqueue(move_job("C1")).unwrap();

    let err = state.enqueue_json("{\"type\": \"move\", \"unit\":").unwrap_err();
    assert!(matches!(err, JobError::InvalidPayload(_)));
    assert_eq!(state.pending_len(), 1);

    let err = state.enqueue_json("[1, 2, 3]").unwrap_err();
    assert!(matches!(err, JobError::InvalidPayload(_)));
    assert_eq!(state.pending_len(), 1);
}

#[test]
fn test_enqueue_json_fills_defaults() {
    let mut state = JobState::new(false);
    state
        .enqueue_json(r#"{"type": "pick", "target": {"x": 10, "y": 20, "z": 30}, "unit": {"number": "C7"}}"#)
        .unwrap();

    let job = state.peek_next_pending().unwrap();
    assert_eq!(job.job_type, JobType::Pick);
    assert_eq!(job.target, Coordinates::new(10, 20, 30));
    assert_eq!(job.unit.number, "C7");
    assert_eq!(job.unit.height, 2591);
    assert!(!job.metadata.event_id.is_empty());
}

#[test]
fn test_bare_status_completes_running_move() {
    let mut storage = Storage::default();
    let mut state = JobState::new(false);
    state.enqueue(move_job("C1")).unwrap();
    state.dispatch_next().unwrap();

    let outcome = state
        .report_status(r#"{"unit": {"number": "C1"}}"#, &mut storage)
        .unwrap();
    assert!(matches!(outcome, StatusOutcome::Done(ref job) if job.unit.number == "C1"));
    assert!(!state.has_running_job());

    let err = state
        .report_status(r#"{"jobStatus": 5}"#, &mut storage)
        .unwrap_err();
    assert!(matches!(err, JobError::InvalidPayload(_)));

    let outcome = state
        .report_status(r#"{"jobType": "move", "jobStatus": "paused"}"#, &mut storage)
        .unwrap();
    assert_eq!(outcome, StatusOutcome::Updated);
    assert_eq!(
        state.status().map(|s| s.job_status),
        Some(CraneJobStatus::Paused)
    );
}

#[test]
fn test_status_with_future_job_type_is_accepted() {
    let mut storage = Storage::default();
    let mut state = JobState::new(false);
    let outcome = state
        .report_status(r#"{"jobType": "hover", "jobStatus": "inProgress"}"#, &mut storage)
        .unwrap();
    assert_eq!(outcome, StatusOutcome::Updated);
    assert_eq!(state.status().unwrap().job_type, JobType::Unknown);
}
