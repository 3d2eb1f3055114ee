//! The stage run loop (§4.D): poll → worker(timeout, retry) → publish →
//! commit, one message at a time, for at-least-once delivery.
//!
//! Grounded on `domain_intel/geodns/stages.py::GeoDNSStage.run()` — the
//! per-message timeout, linear backoff retry (sleep seconds == retry
//! index), halt-without-commit on retry exhaustion, and the
//! flush-before-commit ordering all mirror that loop directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::Message as _;
use rdkafka::consumer::{CommitMode, Consumer};
use rdkafka::producer::FutureRecord;
use serde::Serialize;

use domain_intel_broker::{open_consumer, open_producer};

use crate::error::StageError;
use crate::metrics::StageMetrics;

/// A stage's business logic: consume one message's bytes, produce an
/// output (or a retryable/fatal error). Implementors are the
/// domain-specific workers (geo-dns flattener, rank parser, persist
/// dispatcher, ...); the engine owns everything around them.
#[async_trait]
pub trait Worker: Send + Sync {
    type Output: Marshal + Send;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError>;
}

/// Converts a worker's output into the bytes sent to each output topic.
/// Mirrors the original implementation's `marshal()` hook.
pub trait Marshal {
    fn marshal(&self) -> Vec<u8>;
}

impl Marshal for Vec<u8> {
    fn marshal(&self) -> Vec<u8> {
        self.clone()
    }
}

/// Wraps a `Serialize` output so it marshals to JSON bytes, for
/// flat-stage workers whose result is a structured record rather than a
/// raw passthrough payload.
pub struct Json<T>(pub T);

impl<T: Serialize> Marshal for Json<T> {
    fn marshal(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).unwrap_or_default()
    }
}

/// Static configuration for one stage run.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub name: String,
    pub input_topics: Vec<String>,
    pub output_topics: Vec<String>,
    pub group_id: String,
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub dump_dir: Option<PathBuf>,
    pub dry: bool,
    pub max_read_count: Option<u64>,
}

impl StageConfig {
    pub fn new(name: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_topics: Vec::new(),
            output_topics: Vec::new(),
            group_id: group_id.into(),
            timeout_secs: 30,
            retry_count: 10,
            dump_dir: None,
            dry: false,
            max_read_count: None,
        }
    }

    /// In dry mode each run gets its own throwaway consumer group so it
    /// never steals offsets from a real running consumer group (mirrors
    /// `--dry` in the original implementation's CLI).
    fn effective_group_id(&self) -> String {
        if self.dry {
            format!("{}-dry-{:x}", self.group_id, rand::random::<u32>())
        } else {
            self.group_id.clone()
        }
    }
}

/// Run a stage to completion (or until `max_read_count` is reached).
/// Returns the accumulated metrics once the run loop exits.
pub async fn run<W: Worker>(
    cfg: StageConfig,
    bootstrap_servers: &str,
    worker: W,
) -> Result<Arc<StageMetrics>, StageError> {
    let metrics = Arc::new(StageMetrics::new());
    let group_id = cfg.effective_group_id();

    let consumer = open_consumer(
        bootstrap_servers,
        &cfg.input_topics,
        &group_id,
        cfg.timeout_secs.saturating_mul(1000),
    )
    .await?;

    let producer = if cfg.dry { None } else { Some(open_producer(bootstrap_servers).await?) };

    let mut read_count: u64 = 0;

    loop {
        if let Some(max) = cfg.max_read_count {
            if read_count >= max {
                tracing::info!(stage = %cfg.name, read_count, "max read count reached, exiting");
                break;
            }
        }

        let borrowed = match consumer.inner().recv().await {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(stage = %cfg.name, error = %e, "consumer recv failed");
                return Err(StageError::Broker(domain_intel_broker::BrokerError::Receive(
                    e.to_string(),
                )));
            }
        };

        metrics.record_received();
        read_count += 1;

        let payload = borrowed.payload().unwrap_or_default().to_vec();

        if let Some(dir) = &cfg.dump_dir {
            dump_to_disk(dir, &cfg.name, read_count, &payload);
        }

        let outcome = run_worker_with_retry(&worker, &payload, cfg.timeout_secs, cfg.retry_count, &metrics).await;

        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(stage = %cfg.name, error = %e, "worker failed fatally, halting without commit");
                return Err(e);
            }
        };

        metrics.record_processed();
        let marshalled = output.marshal();
        metrics.record_marshalled();

        if let Some(producer) = &producer {
            for topic in &cfg.output_topics {
                let record: FutureRecord<'_, (), Vec<u8>> =
                    FutureRecord::to(topic).payload(&marshalled);
                if let Err((e, _)) = producer.inner().send(record, Duration::from_secs(0)).await {
                    return Err(StageError::Broker(domain_intel_broker::BrokerError::Send(
                        e.to_string(),
                    )));
                }
                metrics.record_sent(topic);
            }
            producer.flush(Duration::from_secs(30))?;
        }

        consumer
            .inner()
            .commit_message(&borrowed, CommitMode::Sync)
            .map_err(|e| StageError::Broker(domain_intel_broker::BrokerError::Commit(e.to_string())))?;
    }

    metrics.log_summary(&cfg.name);
    Ok(metrics)
}

/// Per-message retry loop (§4.D step 3): each attempt gets `timeout_secs`
/// to complete. A timeout or a worker error marked `retryable()` sleeps
/// `attempt` seconds (linear backoff) and tries again; anything else, or
/// exhausting `retry_count` attempts, is fatal.
async fn run_worker_with_retry<W: Worker>(
    worker: &W,
    payload: &[u8],
    timeout_secs: u64,
    retry_count: u32,
    metrics: &StageMetrics,
) -> Result<W::Output, StageError> {
    let mut last_err: Option<StageError> = None;

    for attempt in 0..retry_count {
        let call = tokio::time::timeout(Duration::from_secs(timeout_secs), worker.call(payload)).await;

        match call {
            Ok(Ok(output)) => return Ok(output),
            Ok(Err(e)) if e.retryable() => {
                metrics.record_retryable_exception();
                tracing::warn!(attempt, error = %e, "retryable worker error, backing off");
                last_err = Some(e);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                metrics.record_retryable_exception();
                let timeout_err = StageError::WorkerTimedOut(Duration::from_secs(timeout_secs));
                tracing::warn!(attempt, "worker call timed out, backing off");
                last_err = Some(timeout_err);
            }
        }

        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
    }

    Err(StageError::RetriesExhausted(
        retry_count,
        last_err.map(|e| e.to_string()).unwrap_or_default(),
    ))
}

fn dump_to_disk(dir: &std::path::Path, stage_name: &str, seq: u64, payload: &[u8]) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(error = %e, "failed to create dump directory");
        return;
    }
    let path = dir.join(format!("{stage_name}-{seq:08}.bin"));
    if let Err(e) = std::fs::write(&path, payload) {
        tracing::warn!(error = %e, path = %path.display(), "failed to dump message to disk");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        type Output = Vec<u8>;

        async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
            Ok(input.to_vec())
        }
    }

    struct FlakyWorker {
        fail_until: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl Worker for FlakyWorker {
        type Output = Vec<u8>;

        async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
            let n = self.fail_until.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            if n > 0 {
                Err(StageError::RetryableWorker("transient".into()))
            } else {
                Ok(input.to_vec())
            }
        }
    }

    #[tokio::test]
    async fn retry_loop_succeeds_immediately_on_healthy_worker() {
        let metrics = StageMetrics::new();
        let out = run_worker_with_retry(&EchoWorker, b"hello", 5, 3, &metrics).await.unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(metrics.retryable_exceptions.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn retry_loop_recovers_after_transient_failures() {
        let metrics = StageMetrics::new();
        let worker = FlakyWorker { fail_until: std::sync::atomic::AtomicU32::new(2) };
        let out = run_worker_with_retry(&worker, b"hi", 5, 5, &metrics).await.unwrap();
        assert_eq!(out, b"hi");
        assert_eq!(metrics.retryable_exceptions.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn retry_loop_halts_after_exhausting_retry_count() {
        let metrics = StageMetrics::new();
        let worker = FlakyWorker { fail_until: std::sync::atomic::AtomicU32::new(100) };
        let err = run_worker_with_retry(&worker, b"hi", 5, 3, &metrics).await.unwrap_err();
        assert!(matches!(err, StageError::RetriesExhausted(3, _)));
    }

    struct FatalWorker;

    #[async_trait]
    impl Worker for FatalWorker {
        type Output = Vec<u8>;

        async fn call(&self, _input: &[u8]) -> Result<Self::Output, StageError> {
            Err(StageError::Worker("fatal, do not retry".into()))
        }
    }

    #[tokio::test]
    async fn non_retryable_worker_error_propagates_immediately() {
        let metrics = StageMetrics::new();
        let err = run_worker_with_retry(&FatalWorker, b"hi", 5, 10, &metrics).await.unwrap_err();
        assert!(matches!(err, StageError::Worker(_)));
        assert_eq!(metrics.retryable_exceptions.load(std::sync::atomic::Ordering::Relaxed), 0);
    }
}
