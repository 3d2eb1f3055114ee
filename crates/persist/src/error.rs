use thiserror::Error;

use domain_intel_graph::GraphError;
use domain_intel_parsers::ParseError;

/// Errors surfaced by the persist worker (§4.F). A store failure aborts
/// the message and, when retryable, is retried by the stage engine under
/// the same policy as any other worker error; a malformed message or a
/// parse failure is fatal to that message.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] GraphError),
}

impl PersistError {
    pub fn retryable(&self) -> bool {
        matches!(self, PersistError::Store(e) if e.retryable())
    }
}
