/*!
 * Job queue contract and an in-process implementation.
 *
 * [`LocalJobQueue`] runs each job on its own tokio task. A job whose handler
 * fails with a transient error is retried with exponential backoff before it
 * is marked as failed. A finished job's status stays queryable for a
 * retention window and is purged on a later submit.
 */

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::errors::TranslationError;

use super::models::{JobSpec, JobState, JobStatus};

/// Executes one unit of background work
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, spec: &JobSpec) -> Result<String, TranslationError>;
}

/// Submit work and poll its state by opaque id
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job and return its id
    async fn submit(&self, spec: JobSpec) -> Result<String, TranslationError>;

    /// Current status, `None` for unknown ids
    async fn poll(&self, job_id: &str) -> Option<JobStatus>;
}

/// Job-level retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry; doubles each time
    pub backoff: Duration,
}

impl JobRetryPolicy {
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff
            .checked_mul(1u32.checked_shl(retry).unwrap_or(u32::MAX))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for JobRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Default time a finished job stays queryable
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Log-friendly prefix of a job id
pub fn short_id(job_id: &str) -> &str {
    job_id
        .char_indices()
        .nth(8)
        .map_or(job_id, |(end, _)| &job_id[..end])
}

/// Job queue backed by tokio tasks in this process
#[derive(Clone)]
pub struct LocalJobQueue {
    handler: Arc<dyn JobHandler>,
    statuses: Arc<RwLock<HashMap<String, JobStatus>>>,
    retry: JobRetryPolicy,
    retention: Duration,
}

impl LocalJobQueue {
    pub fn new(handler: Arc<dyn JobHandler>, retry: JobRetryPolicy) -> Self {
        Self {
            handler,
            statuses: Arc::new(RwLock::new(HashMap::new())),
            retry,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Keep finished statuses for `retention` instead of the default
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Number of statuses held, finished or not
    pub fn len(&self) -> usize {
        self.statuses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.read().is_empty()
    }

    /// Drop finished statuses older than the retention window
    fn purge_finished(&self) {
        let now = Utc::now();
        let retention = self.retention;
        let mut statuses = self.statuses.write();
        let before = statuses.len();
        statuses.retain(|_, status| match status.finished_at {
            Some(finished_at) => (now - finished_at)
                .to_std()
                .map_or(true, |age| age < retention),
            None => true,
        });
        let purged = before - statuses.len();
        if purged > 0 {
            debug!("Purged {} finished job status(es)", purged);
        }
    }

    /// Number of jobs not yet finished
    pub fn pending(&self) -> usize {
        self.statuses
            .read()
            .values()
            .filter(|s| !s.state.is_finished())
            .count()
    }

    fn update(&self, job_id: &str, f: impl FnOnce(&mut JobStatus)) {
        if let Some(status) = self.statuses.write().get_mut(job_id) {
            f(status);
        }
    }

    async fn run_job(self, job_id: String, spec: JobSpec) {
        let short_id = short_id(&job_id);
        let mut retries = 0;

        self.update(&job_id, |s| {
            s.state = JobState::Started;
            s.started_at = Some(Utc::now());
        });
        info!("Job {} started ({} chars)", short_id, spec.text.chars().count());

        loop {
            self.update(&job_id, |s| s.attempts = retries + 1);

            match self.handler.run(&spec).await {
                Ok(result) => {
                    info!("Job {} succeeded", short_id);
                    self.update(&job_id, |s| {
                        s.state = JobState::Success;
                        s.result = Some(result);
                        s.finished_at = Some(Utc::now());
                    });
                    return;
                }
                Err(e) if e.is_transient() && retries < self.retry.max_retries => {
                    let delay = self.retry.delay(retries);
                    retries += 1;
                    warn!(
                        "Job {} failed ({}), retry {}/{} in {:?}",
                        short_id, e, retries, self.retry.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Job {} failed: {}", short_id, e);
                    self.update(&job_id, |s| {
                        s.state = JobState::Failure;
                        s.error = Some(e.client_message());
                        s.finished_at = Some(Utc::now());
                    });
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl JobQueue for LocalJobQueue {
    async fn submit(&self, spec: JobSpec) -> Result<String, TranslationError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TranslationError::Queue(e.to_string()))?;

        self.purge_finished();

        let job_id = Uuid::new_v4().to_string();
        self.statuses
            .write()
            .insert(job_id.clone(), JobStatus::queued(job_id.clone()));

        info!("Job {} queued", short_id(&job_id));
        runtime.spawn(self.clone().run_job(job_id.clone(), spec));

        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Option<JobStatus> {
        self.statuses.read().get(job_id).cloned()
    }
}

/// Poll until the job finishes or `timeout` elapses; returns the last status seen
pub async fn wait_until_finished(
    queue: &dyn JobQueue,
    job_id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Option<JobStatus> {
    let deadline = Instant::now() + timeout;

    loop {
        let status = queue.poll(job_id).await?;
        if status.state.is_finished() || Instant::now() >= deadline {
            return Some(status);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
