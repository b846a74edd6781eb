mod actors;
pub mod adapter;
pub mod error;
pub mod job;
pub mod ledger;
pub mod store;
pub mod types;

// re-export the orchestrator handle as if it is the orchestrator itself.
pub use actors::orchestrator::{JobOrchestratorHandle as JobOrchestrator, OrchestratorConfig};
pub use actors::worker::MODEL_MEDIA_TYPE;
pub use job::{FailureKind, Job, JobFailure, JobState};
pub use store::{Artifact, ArtifactHandle, ArtifactStore, DiskStore, MemoryStore};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ReconstructionAdapter, StubReconstruction};
    use crate::error::{CancelError, ConvertError, ResultError, SubmitError};
    use crate::types::JobId;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Adapter that replays a scripted sequence of outcomes, then falls
    /// back to succeeding.
    struct ScriptedAdapter {
        script: Mutex<VecDeque<Result<Bytes, ConvertError>>>,
    }

    impl ScriptedAdapter {
        fn new(script: Vec<Result<Bytes, ConvertError>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl ReconstructionAdapter for ScriptedAdapter {
        async fn convert(&self, _input: Bytes) -> Result<Bytes, ConvertError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Bytes::from_static(b"glTF fallback model")))
        }
    }

    fn transient(msg: &str) -> Result<Bytes, ConvertError> {
        Err(ConvertError::Transient(msg.to_string()))
    }

    fn quick_config() -> OrchestratorConfig {
        OrchestratorConfig {
            workers: 2,
            max_queue_depth: 8,
            retry_ceiling: 3,
            retry_backoff: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(5),
            retention_window: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
            message_capacity: 16,
        }
    }

    fn spawn_with<A: ReconstructionAdapter>(
        adapter: A,
        config: OrchestratorConfig,
    ) -> JobOrchestrator {
        JobOrchestrator::spawn(Arc::new(MemoryStore::new()), Arc::new(adapter), config)
    }

    async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: JobId) -> Job {
        for _ in 0..500 {
            let job = orchestrator.status(job_id).expect("job disappeared");
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not reach a terminal state in time");
    }

    async fn wait_running(orchestrator: &JobOrchestrator, job_id: JobId) {
        for _ in 0..500 {
            if orchestrator.status(job_id).expect("job disappeared").state == JobState::Running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never started running");
    }

    #[tokio::test]
    async fn submit_converts_and_stores_model() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = JobOrchestrator::spawn(
            store.clone(),
            Arc::new(StubReconstruction::new()),
            quick_config(),
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"blueprint bytes"), "image/png")
            .await
            .expect("submit");

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.attempts, 1);

        let handle = orchestrator.result(job_id).expect("result");
        assert_eq!(job.output_ref.as_ref(), Some(&handle));
        let artifact = store.get(&handle).await.expect("model stored");
        assert_eq!(&artifact.bytes[..4], b"glTF");
        assert_eq!(artifact.media_type, MODEL_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn submit_returns_fresh_ids_promptly() {
        let orchestrator = spawn_with(
            StubReconstruction::with_delay(Duration::from_secs(30)),
            quick_config(),
        );
        let first = orchestrator
            .submit(Bytes::from_static(b"one"), "image/png")
            .await
            .expect("first submit");
        let second = orchestrator
            .submit(Bytes::from_static(b"two"), "image/png")
            .await
            .expect("second submit");
        assert_ne!(first, second);
        // both answered while the 30s conversions are still in flight
        assert!(!orchestrator.status(first).unwrap().state.is_terminal());
        assert!(matches!(
            orchestrator.result(first),
            Err(ResultError::NotReady)
        ));
    }

    #[tokio::test]
    async fn permanent_failure_is_never_retried() {
        let orchestrator = spawn_with(
            ScriptedAdapter::new(vec![Err(ConvertError::Permanent(
                "unreadable blueprint".to_string(),
            ))]),
            quick_config(),
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"bad"), "image/png")
            .await
            .expect("submit");

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 1);
        let failure = job.error.expect("failure recorded");
        assert_eq!(failure.kind, FailureKind::Rejected);

        match orchestrator.result(job_id) {
            Err(ResultError::Failed(failure)) => assert_eq!(failure.kind, FailureKind::Rejected),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transient_failures_exhaust_the_ceiling() {
        let orchestrator = spawn_with(
            ScriptedAdapter::new(vec![
                transient("backend busy"),
                transient("backend busy"),
                transient("backend busy"),
            ]),
            quick_config(),
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"stubborn"), "image/png")
            .await
            .expect("submit");

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 3);
        assert_eq!(
            job.error.expect("failure recorded").kind,
            FailureKind::RetriesExhausted
        );
    }

    #[tokio::test]
    async fn transient_failure_then_success() {
        let orchestrator = spawn_with(
            ScriptedAdapter::new(vec![
                transient("backend hiccup"),
                Ok(Bytes::from_static(b"glTF recovered model")),
            ]),
            quick_config(),
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"flaky"), "image/png")
            .await
            .expect("submit");

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.attempts, 2);
        assert!(job.output_ref.is_some());
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_transient() {
        let config = OrchestratorConfig {
            retry_ceiling: 2,
            attempt_timeout: Duration::from_millis(50),
            ..quick_config()
        };
        let orchestrator = spawn_with(
            StubReconstruction::with_delay(Duration::from_secs(10)),
            config,
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"slow"), "image/png")
            .await
            .expect("submit");

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 2);
        assert_eq!(
            job.error.expect("failure recorded").kind,
            FailureKind::RetriesExhausted
        );
    }

    #[tokio::test]
    async fn full_queue_rejects_new_submissions() {
        let config = OrchestratorConfig {
            workers: 1,
            max_queue_depth: 1,
            ..quick_config()
        };
        let orchestrator = spawn_with(
            StubReconstruction::with_delay(Duration::from_secs(30)),
            config,
        );

        // first occupies the lone worker, second fills the queue
        orchestrator
            .submit(Bytes::from_static(b"one"), "image/png")
            .await
            .expect("first submit");
        orchestrator
            .submit(Bytes::from_static(b"two"), "image/png")
            .await
            .expect("second submit");
        assert!(matches!(
            orchestrator
                .submit(Bytes::from_static(b"three"), "image/png")
                .await,
            Err(SubmitError::Overloaded)
        ));
    }

    #[tokio::test]
    async fn cancel_queued_job_before_it_starts() {
        let config = OrchestratorConfig {
            workers: 1,
            ..quick_config()
        };
        let orchestrator = spawn_with(
            StubReconstruction::with_delay(Duration::from_secs(30)),
            config,
        );
        let running = orchestrator
            .submit(Bytes::from_static(b"first"), "image/png")
            .await
            .expect("submit running");
        wait_running(&orchestrator, running).await;
        let queued = orchestrator
            .submit(Bytes::from_static(b"second"), "image/png")
            .await
            .expect("submit queued");

        orchestrator.cancel(queued).await.expect("cancel");
        let job = orchestrator.status(queued).expect("status");
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 0);
        assert_eq!(
            job.error.expect("failure recorded").kind,
            FailureKind::Cancelled
        );
    }

    #[tokio::test]
    async fn cancel_running_job_discards_the_attempt() {
        let orchestrator = spawn_with(
            StubReconstruction::with_delay(Duration::from_secs(30)),
            quick_config(),
        );
        let job_id = orchestrator
            .submit(Bytes::from_static(b"doomed"), "image/png")
            .await
            .expect("submit");
        wait_running(&orchestrator, job_id).await;

        orchestrator.cancel(job_id).await.expect("cancel");
        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.attempts, 1);
        assert_eq!(
            job.error.expect("failure recorded").kind,
            FailureKind::Cancelled
        );
        assert!(matches!(
            orchestrator.cancel(job_id).await,
            Err(CancelError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn unknown_job_queries_are_not_found() {
        let orchestrator = spawn_with(StubReconstruction::new(), quick_config());
        let missing = uuid::Uuid::new_v4();
        assert!(orchestrator.status(missing).is_err());
        assert!(matches!(
            orchestrator.result(missing),
            Err(ResultError::NotFound)
        ));
        assert!(matches!(
            orchestrator.cancel(missing).await,
            Err(CancelError::NotFound)
        ));
    }
}
