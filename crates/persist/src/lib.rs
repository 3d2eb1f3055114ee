pub mod error;
pub mod worker;

pub use error::PersistError;
pub use worker::{ParserFamily, PersistWorker};
