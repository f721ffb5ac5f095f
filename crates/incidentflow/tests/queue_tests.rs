//! The job queue driving the real stages.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{IncidentRow, SheetBuilder, TestHarness};

use incidentflow::config::QueueConfig;
use incidentflow::db::upload_repo;
use incidentflow::model::UploadStatus;
use incidentflow::queue::{JobContext, JobHandler};
use incidentflow::{Job, JobError, JobKind, JobQueue, JobStatus, QueueError, StageHandler};

const TIMEOUT: Duration = Duration::from_secs(10);

fn queue_for(harness: &TestHarness) -> JobQueue {
    let config = harness.config();
    let handler = Arc::new(StageHandler::from_config(&config, harness.db.clone()));
    JobQueue::new(config.queue.clone(), handler)
}

fn wait_for_status(queue: &JobQueue, id: &str, status: JobStatus) {
    let deadline = Instant::now() + TIMEOUT;
    while queue.get_job(id).unwrap().status != status {
        assert!(Instant::now() < deadline, "job {} never reached {}", id, status);
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_ingest_then_score_jobs_complete() {
    let harness = TestHarness::new();
    let csv = SheetBuilder::new()
        .row(IncidentRow::new("INC001").brief("Server restart"))
        .row(IncidentRow::new("INC002").brief("Investigate report"))
        .build();
    let upload = harness.add_upload(&csv);
    let queue = queue_for(&harness);

    let job = queue
        .submit_job(JobKind::IngestUpload, &upload.id, serde_json::Value::Null)
        .unwrap();
    let done = queue.wait_for(&job.id, TIMEOUT).unwrap();
    assert_eq!(done.status, JobStatus::Completed, "{:?}", done.error);
    assert_eq!(done.progress, 100);
    let result = done.result.unwrap();
    assert_eq!(result["inserted_rows"], 2);
    assert_eq!(result["status"], "completed");

    for kind in [JobKind::ScoreSentiment, JobKind::ScoreAutomation] {
        let job = queue
            .submit_job(kind, &upload.id, serde_json::Value::Null)
            .unwrap();
        let done = queue.wait_for(&job.id, TIMEOUT).unwrap();
        assert_eq!(done.status, JobStatus::Completed, "{:?}", done.error);
        assert_eq!(done.result.unwrap()["processed"], 2);
    }

    assert_eq!(queue.jobs_by_upload(&upload.id).len(), 3);
    queue.shutdown();
}

#[test]
fn test_failing_stage_is_retried_until_budget_is_spent() {
    let harness = TestHarness::new();
    let upload = harness.add_missing_upload();
    let queue = queue_for(&harness);

    let job = queue
        .submit_job(JobKind::IngestUpload, &upload.id, serde_json::Value::Null)
        .unwrap();
    let done = queue.wait_for(&job.id, TIMEOUT).unwrap();

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.retry_count, 2);
    assert!(done.error.as_ref().unwrap().contains("missing.csv"));
    assert_eq!(
        done.status_path(),
        vec![
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Retrying,
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Retrying,
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Failed,
        ]
    );
    let mut last = 0;
    for transition in &done.transitions {
        assert!(transition.retry_count == last || transition.retry_count == last + 1);
        assert!(transition.retry_count <= 2);
        last = transition.retry_count;
    }

    assert_eq!(
        upload_repo::get(&harness.db, &upload.id).unwrap().status,
        UploadStatus::Failed
    );
    queue.shutdown();
}

#[test]
fn test_scoring_unknown_upload_fails() {
    let harness = TestHarness::new();
    let queue = queue_for(&harness);
    let job = queue
        .submit_job(JobKind::ScoreSentiment, "no-such-upload", serde_json::Value::Null)
        .unwrap();
    let done = queue.wait_for(&job.id, TIMEOUT).unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    queue.shutdown();
}

#[test]
fn test_shutdown_cancels_in_flight_work() {
    let handler: Arc<dyn JobHandler> = Arc::new(
        |_: &Job, ctx: &JobContext| -> Result<serde_json::Value, JobError> {
            while !ctx.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(JobError::Cancelled)
        },
    );
    let queue = JobQueue::new(
        QueueConfig {
            workers: 1,
            buffer_size: 4,
            max_retries: 3,
            backoff_unit_ms: 10,
        },
        handler,
    );

    let running = queue
        .submit_job(JobKind::IngestUpload, "up-1", serde_json::Value::Null)
        .unwrap();
    wait_for_status(&queue, &running.id, JobStatus::Running);
    let queued = queue
        .submit_job(JobKind::IngestUpload, "up-2", serde_json::Value::Null)
        .unwrap();

    queue.shutdown();

    let running = queue.get_job(&running.id).unwrap();
    assert_eq!(running.status, JobStatus::Failed);
    assert_eq!(running.retry_count, 0);
    assert_eq!(queue.get_job(&queued.id).unwrap().status, JobStatus::Pending);

    let rejected = queue.submit_job(JobKind::IngestUpload, "up-3", serde_json::Value::Null);
    assert_eq!(rejected.unwrap_err(), QueueError::ShutDown);
}

#[test]
fn test_workers_run_jobs_concurrently() {
    let harness = TestHarness::new();
    let queue = queue_for(&harness);
    let uploads: Vec<_> = (0..6)
        .map(|i| {
            harness.add_upload(
                &SheetBuilder::new()
                    .row(IncidentRow::new(&format!("INC{}", i)))
                    .build(),
            )
        })
        .collect();

    let jobs: Vec<Job> = uploads
        .iter()
        .map(|upload| {
            queue
                .submit_job(JobKind::IngestUpload, &upload.id, serde_json::Value::Null)
                .unwrap()
        })
        .collect();
    for job in jobs {
        let done = queue.wait_for(&job.id, TIMEOUT).unwrap();
        assert_eq!(done.status, JobStatus::Completed, "{:?}", done.error);
    }
    queue.shutdown();
}
