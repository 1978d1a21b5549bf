//! Job record storage.
//!
//! The job table is the single shared mutable resource between the HTTP
//! surface and the workers, so it sits behind an explicit store trait:
//! the in-memory implementation here is process-local (records do not
//! survive a restart, a documented limitation), and a persistent backend
//! can be swapped in without touching the manager.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Job, JobResult, JobStatus};

/// A partial update applied to a job record.
///
/// Unset fields leave the record untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub result: Option<JobResult>,
}

impl JobUpdate {
    /// Update carrying only a status change.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Update carrying a progress step and message.
    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a progress value.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a completion result.
    pub fn with_result(mut self, result: JobResult) -> Self {
        self.result = Some(result);
        self
    }
}

/// Storage for job records.
///
/// Writes to a single record are serialized by the implementation; reads
/// return cloned snapshots.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, job: Job);

    /// Snapshot a record by id.
    async fn get(&self, job_id: &str) -> Option<Job>;

    /// Apply a partial update.
    ///
    /// Returns `false` when the id is unknown or the record is already in a
    /// terminal state (terminal jobs are never resurrected). Progress only
    /// moves forward; a lower value than the current one is ignored.
    async fn apply(&self, job_id: &str, update: JobUpdate) -> bool;
}

/// Process-local [`JobStore`] backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the store tracks no jobs.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    async fn apply(&self, job_id: &str, update: JobUpdate) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(progress) = update.progress {
            job.progress = job.progress.max(progress.min(100));
        }
        if let Some(message) = update.message {
            job.message = message;
        }
        if let Some(result) = update.result {
            job.result = Some(result);
        }
        job.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("j-1")).await;

        let job = store.get("j-1").await.unwrap();
        assert_eq!(job.job_id, "j-1");
        assert_eq!(job.status, JobStatus::Queued);

        assert!(store.get("j-2").await.is_none());
    }

    #[tokio::test]
    async fn test_apply_updates_fields() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("j-1")).await;

        assert!(
            store
                .apply(
                    "j-1",
                    JobUpdate::status(JobStatus::Processing).with_message("working")
                )
                .await
        );

        let job = store.get("j-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.message, "working");
        assert!(job.updated_at >= job.created_at);
    }

    #[tokio::test]
    async fn test_apply_unknown_id_is_noop() {
        let store = InMemoryJobStore::new();
        assert!(!store.apply("ghost", JobUpdate::progress(10, "hi")).await);
    }

    #[tokio::test]
    async fn test_terminal_jobs_absorb_updates() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("j-1")).await;
        store
            .apply("j-1", JobUpdate::status(JobStatus::Failed).with_message("boom"))
            .await;

        // A terminal record refuses further mutation
        assert!(
            !store
                .apply("j-1", JobUpdate::status(JobStatus::Processing))
                .await
        );
        let job = store.get("j-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "boom");
    }

    #[tokio::test]
    async fn test_progress_never_moves_backwards() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("j-1")).await;

        store.apply("j-1", JobUpdate::progress(60, "later step")).await;
        store.apply("j-1", JobUpdate::progress(30, "stale step")).await;

        let job = store.get("j-1").await.unwrap();
        assert_eq!(job.progress, 60);
        // The message still advances even when the progress value is stale
        assert_eq!(job.message, "stale step");
    }

    #[tokio::test]
    async fn test_progress_caps_at_100() {
        let store = InMemoryJobStore::new();
        store.insert(Job::new("j-1")).await;
        store.apply("j-1", JobUpdate::progress(250, "overflow")).await;

        assert_eq!(store.get("j-1").await.unwrap().progress, 100);
    }
}
