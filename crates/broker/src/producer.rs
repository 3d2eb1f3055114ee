//! `open_producer` factory (§4.A) and the scoped, flush-guaranteeing handle.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::producer::FutureProducer;

use crate::backoff::{MAX_CONNECT_ATTEMPTS, exponential_delay};
use crate::error::BrokerError;

/// An idempotent-send producer handle. Flushes on drop so that a stage
/// exiting on any path — clean shutdown, a halted retry loop, a panic
/// unwind — never leaves buffered sends unflushed.
pub struct ProducerHandle {
    inner: FutureProducer,
}

impl ProducerHandle {
    pub fn inner(&self) -> &FutureProducer {
        &self.inner
    }

    /// Block until all buffered messages are acknowledged by the broker.
    /// Called explicitly by the stage engine after each message's sends
    /// (§4.D step 3.f) and implicitly by `Drop`.
    pub fn flush(&self, timeout: Duration) -> Result<(), BrokerError> {
        self.inner.flush(timeout).map_err(|e| BrokerError::Send(e.to_string()))
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush(Duration::from_secs(10)) {
            tracing::warn!(error = %e, "producer flush on drop failed");
        }
    }
}

/// Acquire an idempotent-send producer, retrying construction and an initial
/// metadata fetch with exponential backoff up to [`MAX_CONNECT_ATTEMPTS`].
pub async fn open_producer(bootstrap_servers: &str) -> Result<ProducerHandle, BrokerError> {
    let mut last_err: Option<BrokerError> = None;

    for attempt in 0..MAX_CONNECT_ATTEMPTS {
        match try_connect(bootstrap_servers) {
            Ok(producer) => {
                if attempt > 0 {
                    tracing::info!(attempt, "broker producer connected after retry");
                }
                return Ok(ProducerHandle { inner: producer });
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "producer connect attempt failed");
                last_err = Some(e);
                tokio::time::sleep(exponential_delay(attempt)).await;
            }
        }
    }

    Err(BrokerError::RetriesExhausted(
        MAX_CONNECT_ATTEMPTS,
        last_err.map(|e| e.to_string()).unwrap_or_default(),
    ))
}

fn try_connect(bootstrap_servers: &str) -> Result<FutureProducer, BrokerError> {
    ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("enable.idempotence", "true")
        .set("message.timeout.ms", "30000")
        .create()
        .map_err(|e| BrokerError::Connection(e.to_string()))
}
