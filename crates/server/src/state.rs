//! Shared process state handed to every route handler.

use std::sync::Arc;
use std::time::Instant;

use domain_intel_catalog::PIPELINE;
use domain_intel_core::config::Config;
use domain_intel_graph::GraphStore;

pub struct AppState {
    pub config: Config,
    pub graph: GraphStore,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let graph = GraphStore::new(&config.graph);
        Arc::new(Self { config, graph, started_at: Instant::now() })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn pipeline_stage_count(&self) -> usize {
        PIPELINE.len()
    }
}
