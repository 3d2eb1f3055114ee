//! Stage run-loop counters (§4.D, "metrics reported on exit").
//!
//! Grounded on the teacher's `RingBuffer`/per-topic-stats idiom, trimmed
//! down to the counters a single stage process actually needs once there
//! is no standalone broker process to expose a `/metrics` HTTP endpoint
//! for — a stage reports its counters once, on exit, via `log_summary`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters accumulated over a stage's run loop lifetime.
#[derive(Debug, Default)]
pub struct StageMetrics {
    pub messages_received: AtomicU64,
    pub messages_processed: AtomicU64,
    pub responses_marshalled: AtomicU64,
    pub messages_sent: AtomicU64,
    pub retryable_exceptions: AtomicU64,
    per_topic_sent: std::sync::Mutex<HashMap<String, u64>>,
}

/// Point-in-time JSON snapshot, for logging or a status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StageMetricsSnapshot {
    pub messages_received: u64,
    pub messages_processed: u64,
    pub responses_marshalled: u64,
    pub messages_sent: u64,
    pub retryable_exceptions: u64,
    pub per_topic_sent: HashMap<String, u64>,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_marshalled(&self) {
        self.responses_marshalled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, topic: &str) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        let mut topics = self.per_topic_sent.lock().expect("metrics mutex poisoned");
        *topics.entry(topic.to_string()).or_insert(0) += 1;
    }

    pub fn record_retryable_exception(&self) {
        self.retryable_exceptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StageMetricsSnapshot {
        StageMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            responses_marshalled: self.responses_marshalled.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            retryable_exceptions: self.retryable_exceptions.load(Ordering::Relaxed),
            per_topic_sent: self.per_topic_sent.lock().expect("metrics mutex poisoned").clone(),
        }
    }

    pub fn log_summary(&self, stage_name: &str) {
        let snap = self.snapshot();
        tracing::info!(
            stage = stage_name,
            messages_received = snap.messages_received,
            messages_processed = snap.messages_processed,
            responses_marshalled = snap.responses_marshalled,
            messages_sent = snap.messages_sent,
            retryable_exceptions = snap.retryable_exceptions,
            per_topic_sent = ?snap.per_topic_sent,
            "stage run loop exiting"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let m = StageMetrics::new();
        m.record_received();
        m.record_received();
        m.record_processed();
        m.record_marshalled();
        m.record_sent("rank-flat");
        m.record_sent("rank-flat");
        m.record_sent("link-flat");
        m.record_retryable_exception();

        let snap = m.snapshot();
        assert_eq!(snap.messages_received, 2);
        assert_eq!(snap.messages_processed, 1);
        assert_eq!(snap.responses_marshalled, 1);
        assert_eq!(snap.messages_sent, 3);
        assert_eq!(snap.retryable_exceptions, 1);
        assert_eq!(snap.per_topic_sent["rank-flat"], 2);
        assert_eq!(snap.per_topic_sent["link-flat"], 1);
    }
}
