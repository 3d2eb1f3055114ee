pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;
pub use error::DomainIntelError;
pub use model::*;
