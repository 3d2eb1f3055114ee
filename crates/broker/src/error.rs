//! Broker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("message send error: {0}")]
    Send(String),

    #[error("message receive error: {0}")]
    Receive(String),

    #[error("commit error: {0}")]
    Commit(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("config error: {0}")]
    Config(String),

    #[error("gave up after {0} attempts: {1}")]
    RetriesExhausted(u32, String),
}

impl BrokerError {
    /// Transport-level errors are retryable; configuration errors are not.
    pub fn retryable(&self) -> bool {
        !matches!(self, BrokerError::Config(_) | BrokerError::RetriesExhausted(..))
    }
}
