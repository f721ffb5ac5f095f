//! In-memory job queue with a fixed worker pool and exponential-backoff
//! retries.
//!
//! Jobs move `pending -> running -> {completed | failed | retrying}`, and a
//! retrying job goes back to `pending` once its backoff elapses. The
//! registry is the only state shared between workers; callers get clones.

pub mod job;
pub mod pool;
pub mod registry;
pub mod retry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, error, info, warn};

use crate::cancel::CancelFlag;
use crate::config::QueueConfig;
use crate::error::{JobError, QueueError};
use crate::pipeline::progress::{ProgressEvent, ProgressReporter};

pub use job::{Job, JobKind, JobStatus, Transition};
pub use registry::JobRegistry;
pub use retry::backoff_delay;

use pool::{spawn_workers, WorkerShared};
use retry::{RetryRequest, RetryScheduler};

/// Runs one job attempt. Returning `JobError::Stage` lets the queue retry.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &Job, ctx: &JobContext) -> Result<serde_json::Value, JobError>;
}

impl<F> JobHandler for F
where
    F: Fn(&Job, &JobContext) -> Result<serde_json::Value, JobError> + Send + Sync,
{
    fn handle(&self, job: &Job, ctx: &JobContext) -> Result<serde_json::Value, JobError> {
        self(job, ctx)
    }
}

/// Handed to a running handler: progress updates land in the registry and
/// the cancel flag is the queue's shutdown signal.
pub struct JobContext {
    job_id: String,
    registry: Arc<JobRegistry>,
    cancel: CancelFlag,
}

impl JobContext {
    pub(crate) fn new(job_id: &str, registry: Arc<JobRegistry>, cancel: CancelFlag) -> Self {
        Self {
            job_id: job_id.to_string(),
            registry,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn set_progress(&self, percent: u8, message: &str) {
        self.registry.update(&self.job_id, |job| {
            job.progress = percent.min(100);
            job.message = message.to_string();
        });
    }
}

impl ProgressReporter for JobContext {
    fn report(&self, event: ProgressEvent) {
        self.set_progress(event.percent(), event.message());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct JobQueue {
    config: QueueConfig,
    registry: Arc<JobRegistry>,
    cancel: CancelFlag,
    shutdown: AtomicBool,
    job_sender: Mutex<Option<Sender<String>>>,
    retry_sender: Mutex<Option<Sender<RetryRequest>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    /// Starts `config.workers` workers (at least one) and the retry scheduler.
    pub fn new(config: QueueConfig, handler: Arc<dyn JobHandler>) -> Self {
        let worker_count = config.workers.max(1);
        let capacity = config.buffer_size.max(1);
        let (job_sender, job_receiver) = bounded::<String>(capacity);
        let registry = Arc::new(JobRegistry::new());
        let cancel = CancelFlag::new();

        let (retry_sender, scheduler) =
            RetryScheduler::spawn(Arc::clone(&registry), job_sender.clone(), cancel.clone())
                .into_parts();

        let shared = Arc::new(WorkerShared {
            registry: Arc::clone(&registry),
            handler,
            retry_sender: retry_sender.clone(),
            cancel: cancel.clone(),
            backoff_unit: config.backoff_unit(),
        });
        let workers = spawn_workers(worker_count, job_receiver, shared);

        Self {
            config,
            registry,
            cancel,
            shutdown: AtomicBool::new(false),
            job_sender: Mutex::new(Some(job_sender)),
            retry_sender: Mutex::new(Some(retry_sender)),
            workers: Mutex::new(workers),
            scheduler: Mutex::new(Some(scheduler)),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Registers a pending job and enqueues it. A full queue is reported as
    /// `QueueError::Full` and the job is not kept.
    pub fn submit_job(
        &self,
        kind: JobKind,
        upload_id: &str,
        payload: serde_json::Value,
    ) -> Result<Job, QueueError> {
        if self.is_shutdown() {
            return Err(QueueError::ShutDown);
        }

        let job = Job::new(kind, upload_id, payload, self.config.max_retries);
        let job_id = job.id.clone();
        let snapshot = job.clone();
        self.registry.insert(job);

        let sender = lock(&self.job_sender);
        let Some(sender) = sender.as_ref() else {
            self.registry.remove(&job_id);
            return Err(QueueError::ShutDown);
        };

        match sender.try_send(job_id.clone()) {
            Ok(()) => {
                debug!("Submitted {} job {} for upload {}", kind, job_id, upload_id);
                Ok(snapshot)
            }
            Err(TrySendError::Full(_)) => {
                self.registry.remove(&job_id);
                warn!("Job queue full, rejected {} job for upload {}", kind, upload_id);
                Err(QueueError::Full {
                    capacity: self.config.buffer_size.max(1),
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.registry.remove(&job_id);
                Err(QueueError::ShutDown)
            }
        }
    }

    pub fn get_job(&self, id: &str) -> Result<Job, QueueError> {
        self.registry
            .get(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    pub fn jobs_by_upload(&self, upload_id: &str) -> Vec<Job> {
        self.registry.by_upload(upload_id)
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.registry.all()
    }

    /// Polls until the job is terminal or `timeout` elapses, returning the
    /// latest snapshot either way.
    pub fn wait_for(&self, id: &str, timeout: Duration) -> Result<Job, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let job = self.get_job(id)?;
            if job.status.is_terminal() || Instant::now() >= deadline {
                return Ok(job);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Signals cancellation, closes intake and blocks until every worker and
    /// the retry scheduler have exited. Queued jobs that never started stay
    /// pending; jobs waiting on a retry are failed. Safe to call twice.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down job queue...");

        self.cancel.cancel();
        drop(lock(&self.job_sender).take());

        let workers = std::mem::take(&mut *lock(&self.workers));
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        drop(lock(&self.retry_sender).take());
        if let Some(scheduler) = lock(&self.scheduler).take() {
            if scheduler.join().is_err() {
                error!("Retry scheduler panicked");
            }
        }

        info!("Job queue stopped");
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
