use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::warn;

use super::job::Job;

/// The job map. Every read and write goes through the one mutex; reads hand
/// out clones so nothing outside the queue can mutate a live job.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| {
            warn!("Job registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn insert(&self, job: Job) {
        self.lock().insert(job.id.clone(), job);
    }

    pub fn remove(&self, id: &str) -> Option<Job> {
        self.lock().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Jobs for one upload, oldest first.
    pub fn by_upload(&self, upload_id: &str) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .lock()
            .values()
            .filter(|job| job.upload_id == upload_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.lock().values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Applies `f` to the live job under the lock. Returns `None` when the
    /// id is unknown.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::{JobKind, JobStatus};

    #[test]
    fn test_reads_are_snapshots() {
        let registry = JobRegistry::new();
        let job = Job::new(JobKind::IngestUpload, "up-1", serde_json::Value::Null, 3);
        let id = job.id.clone();
        registry.insert(job);

        let mut snapshot = registry.get(&id).unwrap();
        snapshot.status = JobStatus::Completed;
        assert_eq!(registry.get(&id).unwrap().status, JobStatus::Pending);

        registry.update(&id, |job| job.transition(JobStatus::Running));
        assert_eq!(registry.get(&id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn test_by_upload_filters() {
        let registry = JobRegistry::new();
        registry.insert(Job::new(JobKind::IngestUpload, "a", serde_json::Value::Null, 3));
        registry.insert(Job::new(JobKind::ScoreSentiment, "a", serde_json::Value::Null, 3));
        registry.insert(Job::new(JobKind::IngestUpload, "b", serde_json::Value::Null, 3));

        assert_eq!(registry.by_upload("a").len(), 2);
        assert_eq!(registry.by_upload("b").len(), 1);
        assert!(registry.by_upload("c").is_empty());
        assert_eq!(registry.len(), 3);
        assert!(registry.update("missing", |_| ()).is_none());
    }
}
