/*!
 * Background job models.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a background translation needs; same fields as a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub user_id: i64,
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Level tag, empty when not applicable
    pub level: String,
    /// Full-text cache key computed by the dispatcher
    pub cache_key: String,
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Started,
    Success,
    Failure,
}

impl JobState {
    /// Whether the job has reached a terminal state
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Started => write!(f, "started"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Snapshot of a job as reported by polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    #[serde(rename = "task_id")]
    pub job_id: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Attempts made so far, including the running one
    #[serde(skip)]
    pub attempts: u32,
}

impl JobStatus {
    pub fn queued(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Queued,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
            attempts: 0,
        }
    }
}
