use crate::job::{JobFailure, JobState};
use crate::types::JobId;
use thiserror::Error;

/// Errors from persisting or fetching artifact bytes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no artifact stored under this handle")]
    NotFound,
    #[error("not a valid artifact digest")]
    InvalidHandle,
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of reconstruction failures; the retry policy keys off it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Expected to succeed on a retry (timeout, exhausted resources, flaky backend).
    #[error("transient reconstruction failure: {0}")]
    Transient(String),
    /// Retrying cannot fix this input (malformed or unsupported image).
    #[error("permanent reconstruction failure: {0}")]
    Permanent(String),
}

impl ConvertError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ConvertError::Transient(_))
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("no such job exists")]
    NotFound,
    #[error("job {job_id} is {from:?}, which does not allow {requested}")]
    InvalidTransition {
        job_id: JobId,
        from: JobState,
        requested: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("conversion queue is at capacity")]
    Overloaded,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ResultError {
    #[error("no such job exists")]
    NotFound,
    #[error("job has not finished yet")]
    NotReady,
    #[error("job failed: {0}")]
    Failed(JobFailure),
}

#[derive(Error, Debug)]
pub enum CancelError {
    #[error("no such job exists")]
    NotFound,
    #[error("job already finished")]
    AlreadyFinished,
}
