use crate::actors::worker::AttemptOutcome;
use crate::error::{CancelError, SubmitError};
use crate::store::ArtifactHandle;
use crate::types::JobId;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum OrchestratorMessage {
    Submit {
        input_ref: ArtifactHandle,
        response: oneshot::Sender<Result<JobId, SubmitError>>,
    },
    Cancel {
        job_id: JobId,
        response: oneshot::Sender<Result<(), CancelError>>,
    },
}

/// Events the orchestrator sends itself from worker and timer tasks.
#[derive(Debug)]
pub enum InternalEvent {
    AttemptFinished {
        job_id: JobId,
        outcome: AttemptOutcome,
    },
    RetryDue {
        job_id: JobId,
    },
}
