use thiserror::Error;

/// Shared error type for the parts of the pipeline that don't own a more
/// specific error enum (broker, graph store and stage errors each define
/// their own and convert into this one at crate boundaries).
#[derive(Error, Debug)]
pub enum DomainIntelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("graph store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl DomainIntelError {
    /// Whether a caller should treat this as a transient condition worth
    /// retrying. Only transport-level failures are retryable by default;
    /// everything else is a fatal, halt-the-stage condition.
    pub fn retryable(&self) -> bool {
        matches!(self, DomainIntelError::Transport(_))
    }
}
