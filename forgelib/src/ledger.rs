use crate::error::LedgerError;
use crate::job::{FailureKind, Job, JobFailure, JobState};
use crate::store::ArtifactHandle;
use crate::types::JobId;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Requested state changes; the ledger decides whether they are legal.
#[derive(Debug)]
pub enum Transition {
    /// Queued -> Running; counts one more reconstruction attempt.
    Start,
    /// Running -> Succeeded with the finished model.
    Succeed { output: ArtifactHandle },
    /// Running -> Failed; also Queued -> Failed, but only for cancellation.
    Fail { failure: JobFailure },
    /// Running -> Queued after a transient failure.
    Requeue,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Succeed { .. } => "succeed",
            Transition::Fail { .. } => "fail",
            Transition::Requeue => "requeue",
        }
    }
}

/// Single source of truth for job records.
///
/// Every mutation goes through [`JobLedger::transition`], which takes the
/// internal lock, checks legality against the current state and commits in
/// one step. The lock is only held for the map operation itself, never
/// across an await, so a transition attempted from a stale view loses
/// cleanly with [`LedgerError::InvalidTransition`] instead of clobbering a
/// newer state.
pub struct JobLedger {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Create a Queued job for an uploaded blueprint.
    pub fn create(&self, input_ref: ArtifactHandle) -> Job {
        let job = Job::new(input_ref);
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        job
    }

    pub fn get(&self, id: JobId) -> Result<Job, LedgerError> {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    pub fn transition(&self, id: JobId, transition: Transition) -> Result<Job, LedgerError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&id).ok_or(LedgerError::NotFound)?;

        let legal = match (&transition, job.state) {
            (Transition::Start, JobState::Queued) => true,
            (Transition::Succeed { .. }, JobState::Running) => true,
            (Transition::Requeue, JobState::Running) => true,
            (Transition::Fail { .. }, JobState::Running) => true,
            // cancellation is the only way a job fails without ever running
            (Transition::Fail { failure }, JobState::Queued) => {
                failure.kind == FailureKind::Cancelled
            }
            _ => false,
        };
        if !legal {
            return Err(LedgerError::InvalidTransition {
                job_id: id,
                from: job.state,
                requested: transition.name(),
            });
        }

        match transition {
            Transition::Start => {
                job.state = JobState::Running;
                job.attempts += 1;
            }
            Transition::Succeed { output } => {
                job.state = JobState::Succeeded;
                job.output_ref = Some(output);
            }
            Transition::Fail { failure } => {
                job.state = JobState::Failed;
                job.error = Some(failure);
            }
            Transition::Requeue => {
                job.state = JobState::Queued;
            }
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    /// Drop terminal jobs whose last transition is older than `retention`.
    /// Returns the removed records so their artifacts can be released.
    pub fn sweep(&self, retention: Duration) -> Vec<Job> {
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::days(36500));
        let cutoff = Utc::now() - retention;
        let mut jobs = self.jobs.lock().unwrap();
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.state.is_terminal() && job.updated_at < cutoff)
            .map(|job| job.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| jobs.remove(&id))
            .collect()
    }

    /// Handles still referenced by any job on record. Content addressing
    /// means a live job may share a digest with an expired one, so sweeps
    /// must check here before deleting bytes.
    pub fn referenced_handles(&self) -> HashSet<ArtifactHandle> {
        let jobs = self.jobs.lock().unwrap();
        jobs.values().flat_map(|job| job.artifacts()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobLedger {
    fn default() -> Self {
        Self::new()
    }
}
