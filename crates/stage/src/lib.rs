pub mod engine;
pub mod error;
pub mod message;
pub mod metrics;

pub use engine::{Json, Marshal, StageConfig, Worker, run};
pub use error::StageError;
pub use message::StageMessage;
pub use metrics::{StageMetrics, StageMetricsSnapshot};
