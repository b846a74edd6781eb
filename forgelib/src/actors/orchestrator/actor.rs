use super::messages::{InternalEvent, OrchestratorMessage};
use super::OrchestratorConfig;
use crate::actors::worker::{AttemptOutcome, WorkerHandle};
use crate::adapter::ReconstructionAdapter;
use crate::error::{CancelError, ConvertError, LedgerError, SubmitError};
use crate::job::{JobFailure, JobState};
use crate::ledger::{JobLedger, Transition};
use crate::store::{ArtifactHandle, ArtifactStore};
use crate::types::JobId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct Orchestrator {
    inbox: mpsc::Receiver<OrchestratorMessage>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    ledger: Arc<JobLedger>,
    store: Arc<dyn ArtifactStore>,
    adapter: Arc<dyn ReconstructionAdapter>,
    queue_depth: Arc<AtomicUsize>,
    config: OrchestratorConfig,
    pending: VecDeque<JobId>,
    running: HashMap<JobId, WorkerHandle>,
}

impl Orchestrator {
    pub fn spawn(
        inbox: mpsc::Receiver<OrchestratorMessage>,
        ledger: Arc<JobLedger>,
        store: Arc<dyn ArtifactStore>,
        adapter: Arc<dyn ReconstructionAdapter>,
        queue_depth: Arc<AtomicUsize>,
        config: OrchestratorConfig,
    ) {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let actor = Self {
            inbox,
            internal_rx,
            internal_tx,
            ledger,
            store,
            adapter,
            queue_depth,
            config,
            pending: VecDeque::new(),
            running: HashMap::new(),
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                maybe_msg = self.inbox.recv() => {
                    match maybe_msg {
                        Some(OrchestratorMessage::Submit { input_ref, response }) => {
                            let _ = response.send(self.submit(input_ref));
                        }
                        Some(OrchestratorMessage::Cancel { job_id, response }) => {
                            let _ = response.send(self.cancel(job_id));
                        }
                        // every handle dropped; in-flight attempts finish on
                        // their own, nobody is left to observe the results
                        None => break,
                    }
                }
                Some(event) = self.internal_rx.recv() => {
                    match event {
                        InternalEvent::AttemptFinished { job_id, outcome } => {
                            self.attempt_finished(job_id, outcome);
                        }
                        InternalEvent::RetryDue { job_id } => self.retry_due(job_id),
                    }
                }
                _ = sweep.tick() => self.sweep_expired(),
            }
        }
    }

    fn submit(&mut self, input_ref: ArtifactHandle) -> Result<JobId, SubmitError> {
        if self.pending.len() >= self.config.max_queue_depth {
            return Err(SubmitError::Overloaded);
        }
        let job = self.ledger.create(input_ref);
        debug!(job_id = %job.id, "job accepted");
        self.pending.push_back(job.id);
        self.publish_depth();
        self.dispatch();
        Ok(job.id)
    }

    /// Hand queued jobs to workers while there is capacity.
    fn dispatch(&mut self) {
        while self.running.len() < self.config.workers {
            let Some(job_id) = self.pending.pop_front() else {
                break;
            };
            self.publish_depth();
            let job = match self.ledger.transition(job_id, Transition::Start) {
                Ok(job) => job,
                // cancelled while it waited in the queue
                Err(LedgerError::InvalidTransition { .. }) => continue,
                Err(LedgerError::NotFound) => continue,
            };
            debug!(job_id = %job_id, attempt = job.attempts, "attempt started");
            let worker = WorkerHandle::spawn(
                job_id,
                job.input_ref.clone(),
                Arc::clone(&self.store),
                Arc::clone(&self.adapter),
                self.config.attempt_timeout,
                self.internal_tx.clone(),
            );
            self.running.insert(job_id, worker);
        }
    }

    fn attempt_finished(&mut self, job_id: JobId, outcome: AttemptOutcome) {
        self.running.remove(&job_id);
        match outcome {
            AttemptOutcome::Completed(output) => {
                self.commit(job_id, Transition::Succeed { output });
                info!(job_id = %job_id, "job succeeded");
            }
            AttemptOutcome::Cancelled => {
                self.commit(
                    job_id,
                    Transition::Fail {
                        failure: JobFailure::cancelled(),
                    },
                );
                info!(job_id = %job_id, "running job cancelled");
            }
            AttemptOutcome::Failed(ConvertError::Permanent(message)) => {
                info!(job_id = %job_id, %message, "job failed permanently");
                self.commit(
                    job_id,
                    Transition::Fail {
                        failure: JobFailure::rejected(message),
                    },
                );
            }
            AttemptOutcome::Failed(ConvertError::Transient(message)) => {
                self.transient_failure(job_id, message);
            }
        }
        self.dispatch();
    }

    fn transient_failure(&mut self, job_id: JobId, message: String) {
        let attempts = match self.ledger.get(job_id) {
            Ok(job) => job.attempts,
            // swept while the attempt was in flight; nothing to record
            Err(_) => return,
        };
        if attempts >= self.config.retry_ceiling {
            warn!(job_id = %job_id, attempts, %message, "retry ceiling reached");
            self.commit(
                job_id,
                Transition::Fail {
                    failure: JobFailure::retries_exhausted(attempts, message),
                },
            );
            return;
        }
        // commit the requeue now; the timer only gates re-dispatch
        if !self.commit(job_id, Transition::Requeue) {
            return;
        }
        let delay = self.backoff_for(attempts);
        debug!(
            job_id = %job_id,
            attempts,
            delay_ms = delay.as_millis() as u64,
            %message,
            "transient failure, retrying"
        );
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal_tx.send(InternalEvent::RetryDue { job_id });
        });
    }

    /// Exponential backoff: the base doubles for every attempt already made.
    fn backoff_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        self.config.retry_backoff.saturating_mul(1 << exponent)
    }

    fn retry_due(&mut self, job_id: JobId) {
        // the job may have been cancelled while it waited out the backoff
        match self.ledger.get(job_id) {
            Ok(job) if job.state == JobState::Queued => {
                self.pending.push_back(job_id);
                self.publish_depth();
                self.dispatch();
            }
            _ => {}
        }
    }

    fn cancel(&mut self, job_id: JobId) -> Result<(), CancelError> {
        let job = self.ledger.get(job_id).map_err(|_| CancelError::NotFound)?;
        match job.state {
            JobState::Queued => {
                self.pending.retain(|id| *id != job_id);
                self.publish_depth();
                self.commit(
                    job_id,
                    Transition::Fail {
                        failure: JobFailure::cancelled(),
                    },
                );
                info!(job_id = %job_id, "queued job cancelled");
                Ok(())
            }
            JobState::Running => {
                // best effort: if the attempt just finished, its outcome wins
                if let Some(worker) = self.running.get_mut(&job_id) {
                    worker.cancel();
                }
                Ok(())
            }
            JobState::Succeeded | JobState::Failed => Err(CancelError::AlreadyFinished),
        }
    }

    fn sweep_expired(&mut self) {
        let swept = self.ledger.sweep(self.config.retention_window);
        if swept.is_empty() {
            return;
        }
        info!(count = swept.len(), "retention sweep removed finished jobs");

        // content addressing: a surviving job may point at the same bytes
        let still_referenced = self.ledger.referenced_handles();
        let removable: HashSet<ArtifactHandle> = swept
            .iter()
            .flat_map(|job| job.artifacts())
            .filter(|handle| !still_referenced.contains(handle))
            .collect();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            for handle in removable {
                if let Err(err) = store.remove(&handle).await {
                    warn!(artifact = %handle, %err, "failed to remove expired artifact");
                }
            }
        });
    }

    /// Apply a transition, logging an invariant violation instead of
    /// panicking; returns whether the transition was committed.
    fn commit(&self, job_id: JobId, transition: Transition) -> bool {
        match self.ledger.transition(job_id, transition) {
            Ok(_) => true,
            Err(err) => {
                warn!(job_id = %job_id, %err, "ledger refused transition");
                false
            }
        }
    }

    fn publish_depth(&self) {
        self.queue_depth
            .store(self.pending.len(), Ordering::Relaxed);
    }
}
