pub mod countries;
pub mod error;
pub mod store;

pub use error::GraphError;
pub use store::{edge_definitions, GraphStore, PathStep, TraversalResult};
