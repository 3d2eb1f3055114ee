pub mod alexa_csv;
pub mod report;
pub mod trend;
pub mod worker;

pub use report::{build_wide_rows, header};
pub use trend::{compute_delta, Direction, Metric, TrafficPoint};
pub use worker::{ReportWorker, TraverseError, TraverseWorker};
