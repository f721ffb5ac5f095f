use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, info, warn};

use super::job::JobStatus;
use super::registry::JobRegistry;
use crate::cancel::CancelFlag;

const TICK: Duration = Duration::from_millis(100);

/// Retry `n` (1-based) waits `unit * n²`.
pub fn backoff_delay(unit: Duration, retry_count: u32) -> Duration {
    unit.saturating_mul(retry_count.saturating_mul(retry_count))
}

#[derive(Debug)]
pub(crate) struct RetryRequest {
    pub job_id: String,
    pub due: Instant,
}

/// Single thread that re-enqueues retrying jobs once their backoff elapses.
pub(crate) struct RetryScheduler {
    sender: Sender<RetryRequest>,
    handle: JoinHandle<()>,
}

impl RetryScheduler {
    pub fn spawn(registry: Arc<JobRegistry>, job_sender: Sender<String>, cancel: CancelFlag) -> Self {
        let (sender, receiver) = unbounded::<RetryRequest>();
        let handle = thread::spawn(move || run_scheduler(receiver, registry, job_sender, cancel));
        Self { sender, handle }
    }

    pub fn into_parts(self) -> (Sender<RetryRequest>, JoinHandle<()>) {
        (self.sender, self.handle)
    }
}

fn run_scheduler(
    receiver: Receiver<RetryRequest>,
    registry: Arc<JobRegistry>,
    job_sender: Sender<String>,
    cancel: CancelFlag,
) {
    debug!("Retry scheduler started");

    // (due, arrival order, job id); arrival order keeps equal due times FIFO.
    let mut heap: BinaryHeap<Reverse<(Instant, u64, String)>> = BinaryHeap::new();
    let mut seq: u64 = 0;

    loop {
        let timeout = heap
            .peek()
            .map(|Reverse((due, _, _))| due.saturating_duration_since(Instant::now()))
            .unwrap_or(TICK)
            .min(TICK);

        match receiver.recv_timeout(timeout) {
            Ok(request) => {
                debug!("Retry for job {} queued", request.job_id);
                heap.push(Reverse((request.due, seq, request.job_id)));
                seq += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        while heap.peek().is_some_and(|Reverse((due, _, _))| *due <= now) {
            if let Some(Reverse((_, _, job_id))) = heap.pop() {
                resubmit(&registry, &job_sender, &cancel, &job_id);
            }
        }
    }

    if !heap.is_empty() {
        info!("Failing {} job(s) still waiting for a retry", heap.len());
    }
    while let Some(Reverse((_, _, job_id))) = heap.pop() {
        force_fail(&registry, &job_id, "queue shut down before retry");
    }

    debug!("Retry scheduler stopped");
}

fn resubmit(registry: &JobRegistry, job_sender: &Sender<String>, cancel: &CancelFlag, job_id: &str) {
    if cancel.is_cancelled() {
        force_fail(registry, job_id, "queue shut down before retry");
        return;
    }

    // Pending must be visible before a worker can pull the id.
    let requeued = registry
        .update(job_id, |job| {
            if job.status != JobStatus::Retrying {
                return false;
            }
            job.message = format!("Retry {} of {} queued", job.retry_count, job.max_retries);
            job.transition(JobStatus::Pending);
            true
        })
        .unwrap_or(false);
    if !requeued {
        return;
    }

    match job_sender.try_send(job_id.to_string()) {
        Ok(()) => debug!("Job {} re-submitted", job_id),
        Err(TrySendError::Full(_)) => force_fail(registry, job_id, "retry re-submission failed: queue full"),
        Err(TrySendError::Disconnected(_)) => {
            force_fail(registry, job_id, "retry re-submission failed: queue shut down")
        }
    }
}

fn force_fail(registry: &JobRegistry, job_id: &str, reason: &str) {
    warn!("Job {} failed: {}", job_id, reason);
    registry.update(job_id, |job| {
        if !job.status.is_terminal() {
            let error = match job.error.take() {
                Some(last) => format!("{} (last error: {})", reason, last),
                None => reason.to_string(),
            };
            job.fail(error);
        }
    });
}
