use crate::store::ArtifactHandle;
use crate::types::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a conversion job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Why a job ended up Failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input can never convert (malformed or unsupported image).
    Rejected,
    /// Transient failures used up the retry ceiling.
    RetriesExhausted,
    /// The caller asked for the job to stop.
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Rejected,
            message: message.into(),
        }
    }

    pub fn retries_exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::RetriesExhausted,
            message: format!("gave up after {} attempts: {}", attempts, last_error.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: "cancelled by caller".to_string(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// One blueprint conversion request and its lifecycle record.
///
/// Snapshots of this struct circulate freely; the authoritative copy lives
/// in the ledger and changes only through its transition operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub input_ref: ArtifactHandle,
    pub output_ref: Option<ArtifactHandle>,
    pub error: Option<JobFailure>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn new(input_ref: ArtifactHandle) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: JobState::Queued,
            input_ref,
            output_ref: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// All artifact handles this record points at.
    pub fn artifacts(&self) -> impl Iterator<Item = ArtifactHandle> + '_ {
        std::iter::once(self.input_ref.clone()).chain(self.output_ref.clone())
    }
}
