//! `open_consumer` factory (§4.A) and the scoped consumer handle.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{Consumer, StreamConsumer};

use crate::backoff::{MAX_CONNECT_ATTEMPTS, exponential_delay};
use crate::error::BrokerError;

/// A subscribed consumer handle. Offsets are never auto-committed — the
/// stage engine commits explicitly after a message's output has been
/// flushed (§4.D step 3.f).
pub struct ConsumerHandle {
    pub(crate) inner: StreamConsumer,
}

impl ConsumerHandle {
    pub fn inner(&self) -> &StreamConsumer {
        &self.inner
    }
}

/// Acquire a consumer subscribed to `topics` under `group`, reading from the
/// earliest uncommitted offset, with automatic offset commit disabled.
/// Retries client construction and the initial metadata fetch with
/// exponential backoff up to [`MAX_CONNECT_ATTEMPTS`] before surfacing the
/// last transport error.
pub async fn open_consumer(
    bootstrap_servers: &str,
    topics: &[String],
    group: &str,
    session_timeout_ms: u64,
) -> Result<ConsumerHandle, BrokerError> {
    if group.is_empty() {
        return Err(BrokerError::Config("consumer group id must not be empty".into()));
    }

    let mut last_err: Option<BrokerError> = None;

    for attempt in 0..MAX_CONNECT_ATTEMPTS {
        match try_connect(bootstrap_servers, topics, group, session_timeout_ms).await {
            Ok(consumer) => {
                if attempt > 0 {
                    tracing::info!(attempt, "broker consumer connected after retry");
                }
                return Ok(ConsumerHandle { inner: consumer });
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "consumer connect attempt failed");
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

async fn try_connect(
    bootstrap_servers: &str,
    topics: &[String],
    group: &str,
    session_timeout_ms: u64,
) -> Result<StreamConsumer, BrokerError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", group)
        .set("session.timeout.ms", session_timeout_ms.to_string())
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set_log_level(RDKafkaLogLevel::Warning)
        .create()
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

    let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
    consumer
        .subscribe(&topic_refs)
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

    // Validate connectivity by forcing a metadata round-trip.
    consumer
        .fetch_metadata(None, Duration::from_millis(session_timeout_ms))
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

    Ok(consumer)
}
