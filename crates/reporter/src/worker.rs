//! Stage workers for the tail of the catalog (§4.E): `traverse-domains`
//! walks the graph from a labeled domain, `report-wide-csv` turns that
//! traversal into CSV lines. Grounded on the same `Worker`/`Json`
//! contract the parser and persist stages use.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use domain_intel_core::model::doc_id;
use domain_intel_core::model::vertex;
use domain_intel_graph::{GraphError, GraphStore, TraversalResult};
use domain_intel_stage::{Json, StageError, Worker};

use crate::report;

#[derive(Debug, Error)]
pub enum TraverseError {
    #[error("malformed domain-label message: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] GraphError),
}

impl TraverseError {
    pub fn retryable(&self) -> bool {
        matches!(self, TraverseError::Store(e) if e.retryable())
    }
}

/// `traverse-domains`: resolve a labeled domain to its seed vertex and
/// walk the graph out to `max_depth`.
pub struct TraverseWorker {
    store: GraphStore,
    max_depth: u32,
}

impl TraverseWorker {
    pub fn new(store: GraphStore, max_depth: u32) -> Self {
        Self { store, max_depth }
    }

    async fn traverse(&self, input: &[u8]) -> Result<TraversalResult, TraverseError> {
        let domain = std::str::from_utf8(input)
            .map_err(|e| TraverseError::Malformed(e.to_string()))?
            .trim();
        if domain.is_empty() {
            return Err(TraverseError::Malformed("empty domain label".into()));
        }
        let seed_vertex_id = doc_id(vertex::DOMAIN, domain);
        Ok(self.store.traverse(&seed_vertex_id, self.max_depth).await?)
    }
}

#[async_trait]
impl Worker for TraverseWorker {
    type Output = Json<TraversalResult>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        self.traverse(input).await.map(Json).map_err(|e| {
            if e.retryable() {
                StageError::RetryableWorker(e.to_string())
            } else {
                StageError::Worker(e.to_string())
            }
        })
    }
}

/// `report-wide-csv`: render a `TraversalResult` into newline-joined wide
/// CSV rows (§4.G). `today` anchors the trend windows (§4.G step 4).
pub struct ReportWorker;

impl ReportWorker {
    fn render(&self, input: &[u8]) -> Result<Vec<u8>, StageError> {
        let traversal: TraversalResult =
            serde_json::from_slice(input).map_err(|e| StageError::Worker(e.to_string()))?;
        let rows = report::build_wide_rows(&traversal, Utc::now().date_naive());
        Ok(rows.join("\n").into_bytes())
    }
}

#[async_trait]
impl Worker for ReportWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        self.render(input)
    }
}
