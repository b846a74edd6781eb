use super::orchestrator::messages::InternalEvent;
use crate::adapter::ReconstructionAdapter;
use crate::error::ConvertError;
use crate::store::{ArtifactHandle, ArtifactStore};
use crate::types::JobId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Media type generated models are stored and served with.
pub const MODEL_MEDIA_TYPE: &str = "model/gltf-binary";

/// How a single reconstruction attempt ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    Completed(ArtifactHandle),
    Failed(ConvertError),
    Cancelled,
}

/// Handle to one in-flight reconstruction attempt.
///
/// Dropping the handle does not abort the attempt; cancellation is an
/// explicit signal, so the attempt still reports an outcome either way.
pub struct WorkerHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl WorkerHandle {
    /// Spawn a task that runs one conversion attempt for `job_id` and
    /// reports the outcome on `events_tx`.
    pub fn spawn(
        job_id: JobId,
        input_ref: ArtifactHandle,
        store: Arc<dyn ArtifactStore>,
        adapter: Arc<dyn ReconstructionAdapter>,
        attempt_timeout: Duration,
        events_tx: mpsc::UnboundedSender<InternalEvent>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = run_attempt(input_ref, store, adapter, attempt_timeout, cancel_rx).await;
            // a closed channel means the orchestrator is gone; nothing left
            // to report to
            let _ = events_tx.send(InternalEvent::AttemptFinished { job_id, outcome });
        });
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Best-effort cancellation: the attempt is abandoned at its next await
    /// point and reported as Cancelled.
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

async fn run_attempt(
    input_ref: ArtifactHandle,
    store: Arc<dyn ArtifactStore>,
    adapter: Arc<dyn ReconstructionAdapter>,
    attempt_timeout: Duration,
    cancel_rx: oneshot::Receiver<()>,
) -> AttemptOutcome {
    let conversion = convert_and_persist(input_ref, store, adapter, attempt_timeout);
    tokio::pin!(conversion);
    tokio::select! {
        cancelled = cancel_rx => {
            if cancelled.is_ok() {
                return AttemptOutcome::Cancelled;
            }
            // handle dropped without an explicit cancel; finish the attempt
            conversion.await
        }
        outcome = &mut conversion => outcome,
    }
}

async fn convert_and_persist(
    input_ref: ArtifactHandle,
    store: Arc<dyn ArtifactStore>,
    adapter: Arc<dyn ReconstructionAdapter>,
    attempt_timeout: Duration,
) -> AttemptOutcome {
    let input = match store.get(&input_ref).await {
        Ok(artifact) => artifact.bytes,
        // an unreadable input looks the same as a flaky backend from here;
        // the retry policy sorts it out
        Err(err) => {
            return AttemptOutcome::Failed(ConvertError::Transient(format!(
                "failed to load blueprint: {err}"
            )))
        }
    };

    let model = match timeout(attempt_timeout, adapter.convert(input)).await {
        Ok(Ok(model)) => model,
        Ok(Err(err)) => return AttemptOutcome::Failed(err),
        Err(_) => {
            return AttemptOutcome::Failed(ConvertError::Transient(format!(
                "attempt exceeded the {}s limit",
                attempt_timeout.as_secs()
            )))
        }
    };

    match store.put(model, MODEL_MEDIA_TYPE).await {
        Ok(output) => AttemptOutcome::Completed(output),
        Err(err) => AttemptOutcome::Failed(ConvertError::Transient(format!(
            "failed to persist model: {err}"
        ))),
    }
}
