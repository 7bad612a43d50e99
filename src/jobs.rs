//! In-process background jobs.
//!
//! Long-running uploads and lecture renders run as tokio tasks; clients poll
//! the job table by ID. Finished jobs are dropped once older than the
//! retention period.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Ingest,
    Lecture,
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failure,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

/// A tracked job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How long finished jobs stay queryable by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Job table plus the spawner.
#[derive(Clone)]
pub struct JobQueue {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    retention: Duration,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self {
            jobs: Arc::default(),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Drop finished jobs last updated longer ago than the retention.
    pub async fn prune(&self) -> usize {
        let now = Utc::now();
        let retention = self.retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            let expired = job.status.is_finished()
                && (now - job.updated_at)
                    .to_std()
                    .is_ok_and(|age| age >= retention);
            !expired
        });
        let pruned = before - jobs.len();
        if pruned > 0 {
            debug!("Pruned {} expired jobs", pruned);
        }
        pruned
    }

    /// Spawn `task` and return its ID immediately.
    ///
    /// A task that panics is recorded as a failure.
    pub async fn submit<F>(&self, kind: JobKind, task: F) -> Uuid
    where
        F: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        self.prune().await;

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.write().await.insert(
            id,
            Job {
                id,
                kind,
                status: JobStatus::Pending,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );

        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            Self::update(&jobs, id, |job| job.status = JobStatus::Running).await;
            info!("Job {} ({:?}) started", id, kind);

            let outcome = match tokio::spawn(task).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(join_error) if join_error.is_panic() => Err("Job panicked".to_string()),
                Err(join_error) => Err(format!("Job aborted: {}", join_error)),
            };

            match outcome {
                Ok(value) => {
                    Self::update(&jobs, id, |job| {
                        job.status = JobStatus::Success;
                        job.result = Some(value);
                    })
                    .await;
                    info!("Job {} finished", id);
                }
                Err(e) => {
                    warn!("Job {} failed: {}", id, e);
                    Self::update(&jobs, id, |job| {
                        job.status = JobStatus::Failure;
                        job.error = Some(e);
                    })
                    .await;
                }
            }
        });

        id
    }

    pub async fn status(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    async fn update(jobs: &RwLock<HashMap<Uuid, Job>>, id: Uuid, apply: impl FnOnce(&mut Job)) {
        if let Some(job) = jobs.write().await.get_mut(&id) {
            apply(job);
            job.updated_at = Utc::now();
        }
    }
}
