pub mod backoff;
pub mod consumer;
pub mod error;
pub mod producer;
pub mod readiness;

pub use backoff::{FibonacciBackoff, MAX_CONNECT_ATTEMPTS, exponential_delay};
pub use consumer::{ConsumerHandle, open_consumer};
pub use error::BrokerError;
pub use producer::{ProducerHandle, open_producer};
pub use readiness::{topic_names, wait_until_ready};
