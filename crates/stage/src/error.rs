use thiserror::Error;

/// Errors surfaced by the stage engine's run loop (§4.D).
#[derive(Debug, Error)]
pub enum StageError {
    #[error("worker timed out after {0:?}")]
    WorkerTimedOut(std::time::Duration),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("retryable worker error: {0}")]
    RetryableWorker(String),

    #[error("broker error: {0}")]
    Broker(#[from] domain_intel_broker::BrokerError),

    #[error("retries exhausted after {0} attempts: {1}")]
    RetriesExhausted(u32, String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StageError {
    /// Whether the run loop should retry the current message after this
    /// error, versus halting the stage immediately. A worker timeout and
    /// an explicitly retryable worker error are the only retryable cases —
    /// everything else (bad config, exhausted retries, broker failure) is
    /// fatal to the run loop (§4.D step 3.e).
    pub fn retryable(&self) -> bool {
        matches!(self, StageError::WorkerTimedOut(_) | StageError::RetryableWorker(_))
    }
}
