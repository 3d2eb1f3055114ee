use thiserror::Error;

/// Errors surfaced by the graph store adapter (§4.B).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store request error: {0}")]
    Request(String),

    #[error("store returned an error response: {0}")]
    Store(String),

    #[error("traversal failed, seed vertex does not exist: {0}")]
    TraverseFailed(String),

    #[error("config error: {0}")]
    Config(String),
}

impl GraphError {
    /// Only connection failures are worth retrying; a malformed request or
    /// a missing traversal seed will not resolve itself by trying again.
    pub fn retryable(&self) -> bool {
        matches!(self, GraphError::Connection(_))
    }
}
