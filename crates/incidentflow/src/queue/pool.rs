use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::job::JobStatus;
use super::registry::JobRegistry;
use super::retry::{backoff_delay, RetryRequest};
use super::{JobContext, JobHandler};
use crate::cancel::CancelFlag;
use crate::error::JobError;

/// State shared by every worker thread.
pub(crate) struct WorkerShared {
    pub registry: Arc<JobRegistry>,
    pub handler: Arc<dyn JobHandler>,
    pub retry_sender: Sender<RetryRequest>,
    pub cancel: CancelFlag,
    pub backoff_unit: Duration,
}

pub(crate) fn spawn_workers(
    count: usize,
    job_receiver: Receiver<String>,
    shared: Arc<WorkerShared>,
) -> Vec<JoinHandle<()>> {
    let workers = (0..count)
        .map(|worker_id| {
            let job_rx = job_receiver.clone();
            let shared = Arc::clone(&shared);
            thread::spawn(move || run_worker(worker_id, job_rx, shared))
        })
        .collect();

    info!("Started {} queue workers", count);
    workers
}

fn run_worker(worker_id: usize, job_receiver: Receiver<String>, shared: Arc<WorkerShared>) {
    debug!("Worker {} started", worker_id);

    loop {
        if shared.cancel.is_cancelled() {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job_id) => process_job(worker_id, &job_id, &shared),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn process_job(worker_id: usize, job_id: &str, shared: &WorkerShared) {
    let claimed = shared
        .registry
        .update(job_id, |job| {
            if job.status != JobStatus::Pending {
                return None;
            }
            job.message = format!("Running {}", job.kind);
            job.transition(JobStatus::Running);
            Some(job.clone())
        })
        .flatten();
    let Some(job) = claimed else {
        warn!("Worker {} skipped job {}: not pending", worker_id, job_id);
        return;
    };

    debug!(
        "Worker {} running {} job {} (attempt {})",
        worker_id,
        job.kind,
        job.id,
        job.retry_count + 1
    );

    let ctx = JobContext::new(job_id, Arc::clone(&shared.registry), shared.cancel.clone());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.handler.handle(&job, &ctx)))
        .unwrap_or_else(|_| {
            error!("Handler panicked on job {}", job_id);
            Err(JobError::Stage("job handler panicked".to_string()))
        });

    match outcome {
        Ok(result) => {
            shared.registry.update(job_id, |job| job.complete(result));
            info!("Job {} completed", job_id);
        }
        Err(JobError::Cancelled) => {
            shared
                .registry
                .update(job_id, |job| job.fail(JobError::Cancelled.to_string()));
            info!("Job {} cancelled", job_id);
        }
        Err(JobError::Stage(message)) => handle_failure(job_id, message, shared),
    }
}

/// Schedules a retry while budget remains, otherwise fails the job for good.
fn handle_failure(job_id: &str, message: String, shared: &WorkerShared) {
    let shutting_down = shared.cancel.is_cancelled();
    let retry = shared
        .registry
        .update(job_id, |job| {
            if job.can_retry() && !shutting_down {
                job.retry_count += 1;
                job.message = format!(
                    "Attempt failed, retry {} of {} scheduled",
                    job.retry_count, job.max_retries
                );
                job.error = Some(message.clone());
                job.transition(JobStatus::Retrying);
                Some(job.retry_count)
            } else {
                job.fail(message.clone());
                None
            }
        })
        .flatten();

    let Some(retry_count) = retry else {
        warn!("Job {} failed: {}", job_id, message);
        return;
    };

    let delay = backoff_delay(shared.backoff_unit, retry_count);
    warn!(
        "Job {} failed ({}), retry {} in {:?}",
        job_id, message, retry_count, delay
    );
    let request = RetryRequest {
        job_id: job_id.to_string(),
        due: Instant::now() + delay,
    };
    if shared.retry_sender.send(request).is_err() {
        shared.registry.update(job_id, |job| {
            job.fail(format!("retry scheduler unavailable (last error: {})", message))
        });
    }
}
