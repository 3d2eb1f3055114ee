//! `label-domains` (§4.E): the projection stage that funnels all four seed
//! topics (`gtr-domains`, `sli-domains`, `traffic-domains`, `dns-domains`)
//! into the single `domain-labels` topic `traverse-domains` reads from.
//!
//! Grounded on the same `add_domain_labels` batching `LabelTracker` is
//! grounded on: the original folds every resolver's seed list into one
//! labeled-domain set before traversal.

use std::sync::Mutex;

use async_trait::async_trait;

use domain_intel_core::model::normalize_domain;
use domain_intel_stage::{StageError, Worker};

use crate::labels::LabelTracker;

/// Normalizes each seed domain and records it in a shared `LabelTracker`.
/// The stage engine publishes every message's output unconditionally
/// (§4.D), so the tracker here is bookkeeping for `already_labeled_count`,
/// not a publish gate — a restarted stage may relabel a domain once, and
/// `traverse-domains` re-traversing it is harmless.
pub struct LabelWorker {
    tracker: Mutex<LabelTracker>,
}

impl LabelWorker {
    pub fn new() -> Self {
        Self { tracker: Mutex::new(LabelTracker::new()) }
    }

    pub fn already_labeled_count(&self) -> usize {
        self.tracker.lock().unwrap().len()
    }
}

impl Default for LabelWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for LabelWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        let raw = std::str::from_utf8(input).map_err(|e| StageError::Worker(e.to_string()))?;
        let domain = normalize_domain(raw);
        if domain.is_empty() {
            return Err(StageError::Worker("empty domain seed".into()));
        }
        self.tracker.lock().unwrap().mark(&domain);
        Ok(domain.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn labels_a_seed_domain_and_tracks_it() {
        let worker = LabelWorker::new();
        let out = worker.call(b" feedblitz.com \n").await.unwrap();
        assert_eq!(out, b"feedblitz.com");
        assert_eq!(worker.already_labeled_count(), 1);
    }

    #[tokio::test]
    async fn relabeling_the_same_domain_does_not_grow_the_tracker() {
        let worker = LabelWorker::new();
        worker.call(b"feedblitz.com").await.unwrap();
        worker.call(b"feedblitz.com").await.unwrap();
        assert_eq!(worker.already_labeled_count(), 1);
    }

    #[tokio::test]
    async fn empty_seed_is_a_fatal_worker_error() {
        let err = worker_err().await;
        assert!(matches!(err, StageError::Worker(_)));
    }

    async fn worker_err() -> StageError {
        LabelWorker::new().call(b"   ").await.unwrap_err()
    }
}
