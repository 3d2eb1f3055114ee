pub mod analyst_qas;
pub mod error;
pub mod geodns;
pub mod projected;
pub mod rank_info;
pub mod sites_linking_in;
pub mod traffic_history;
pub mod value;
pub mod worker;

pub use error::ParseError;
pub use projected::{Projected, ProjectedRecord};
pub use value::OneOrMany;
pub use worker::{DnsParseWorker, RankFlattenWorker, TrafficFlattenWorker};
