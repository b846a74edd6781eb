mod actor;
pub(crate) mod messages;

use self::actor::Orchestrator;
use self::messages::OrchestratorMessage;
use crate::adapter::ReconstructionAdapter;
use crate::error::{CancelError, LedgerError, ResultError, SubmitError};
use crate::job::{Job, JobState};
use crate::ledger::JobLedger;
use crate::store::{ArtifactHandle, ArtifactStore};
use crate::types::{ImageBytes, JobId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Tunables for the orchestrator. These all arrive from deployment
/// configuration; no default here is load-bearing for correctness.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Maximum attempts running in parallel.
    pub workers: usize,
    /// Queue depth beyond which submissions are refused.
    pub max_queue_depth: usize,
    /// Maximum reconstruction attempts per job.
    pub retry_ceiling: u32,
    /// Backoff before the first retry; doubles per further attempt.
    pub retry_backoff: Duration,
    /// Wall-clock limit for one attempt.
    pub attempt_timeout: Duration,
    /// How long finished jobs stay queryable.
    pub retention_window: Duration,
    /// Cadence of the retention sweep.
    pub sweep_interval: Duration,
    /// Capacity of the orchestrator inbox.
    pub message_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_queue_depth: 32,
            retry_ceiling: 3,
            retry_backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(120),
            retention_window: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            message_capacity: 64,
        }
    }
}

/// A `JobOrchestrator` which accepts uploaded blueprints and drives their
/// conversion jobs through the lifecycle.
///
/// This struct is actually an actor handle, the real work is done in the
/// actor spawned by `JobOrchestratorHandle::spawn`. The handle clones
/// freely across tasks without any extra synchronization, and it reads job
/// snapshots straight from the shared ledger, so status polling never
/// waits on the actor loop.
#[derive(Clone)]
pub struct JobOrchestratorHandle {
    sender: mpsc::Sender<OrchestratorMessage>,
    ledger: Arc<JobLedger>,
    store: Arc<dyn ArtifactStore>,
    queue_depth: Arc<AtomicUsize>,
    max_queue_depth: usize,
}

impl JobOrchestratorHandle {
    /// Spawn a new orchestrator over the given store and adapter.
    pub fn spawn(
        store: Arc<dyn ArtifactStore>,
        adapter: Arc<dyn ReconstructionAdapter>,
        config: OrchestratorConfig,
    ) -> Self {
        let ledger = Arc::new(JobLedger::new());
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let max_queue_depth = config.max_queue_depth;
        let (sender, inbox) = mpsc::channel(config.message_capacity);
        Orchestrator::spawn(
            inbox,
            Arc::clone(&ledger),
            Arc::clone(&store),
            adapter,
            Arc::clone(&queue_depth),
            config,
        );
        Self {
            sender,
            ledger,
            store,
            queue_depth,
            max_queue_depth,
        }
    }

    /// Accept one uploaded blueprint: persist it, create a Queued job and
    /// return its id without waiting for the conversion.
    pub async fn submit(
        &self,
        image: ImageBytes,
        media_type: &str,
    ) -> Result<JobId, SubmitError> {
        // cheap pre-check so a flooded queue rejects before paying for the
        // artifact write; the actor re-checks authoritatively
        if self.queue_depth.load(Ordering::Relaxed) >= self.max_queue_depth {
            return Err(SubmitError::Overloaded);
        }
        let input_ref = self.store.put(image, media_type).await?;
        let (tx, rx) = oneshot::channel();
        let msg = OrchestratorMessage::Submit {
            input_ref,
            response: tx,
        };
        self.sender.send(msg).await.expect("JobOrchestrator exited");
        rx.await.expect("JobOrchestrator exited")
    }

    /// Snapshot of the job record.
    pub fn status(&self, job_id: JobId) -> Result<Job, LedgerError> {
        self.ledger.get(job_id)
    }

    /// The finished model's handle, or why it is not available.
    pub fn result(&self, job_id: JobId) -> Result<ArtifactHandle, ResultError> {
        let job = self.ledger.get(job_id).map_err(|_| ResultError::NotFound)?;
        match (job.state, job.output_ref, job.error) {
            (JobState::Succeeded, Some(output), _) => Ok(output),
            (JobState::Failed, _, Some(failure)) => Err(ResultError::Failed(failure)),
            (JobState::Queued | JobState::Running, _, _) => Err(ResultError::NotReady),
            (state, _, _) => {
                // the ledger invariant guarantees the payloads above; a miss
                // here is a bug, not a user error
                warn!(job_id = %job_id, state = ?state, "job record violates its state invariant");
                Err(ResultError::NotReady)
            }
        }
    }

    /// Ask for a job to be cancelled. Queued jobs are removed before they
    /// start; Running jobs are interrupted on a best-effort basis.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), CancelError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(OrchestratorMessage::Cancel {
                job_id,
                response: tx,
            })
            .await
            .expect("JobOrchestrator exited");
        rx.await.expect("JobOrchestrator exited")
    }
}
