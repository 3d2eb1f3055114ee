//! Health, readiness, and pipeline-introspection endpoints. This process
//! does no pipeline work itself (that's the `cli` binary's `run-stage`);
//! it only reports on the graph store's reachability and the catalog's
//! shape, the way `stupid_server`'s `api::health`/`api::stats` report on
//! its own segment/graph state.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use domain_intel_catalog::PIPELINE;
use domain_intel_core::model::vertex;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION"), uptime_secs: state.uptime_secs() })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub graph_reachable: bool,
    pub domain_count: Option<u64>,
}

pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    match state.graph.get_count(vertex::DOMAIN).await {
        Ok(count) => Json(ReadyResponse { graph_reachable: true, domain_count: Some(count) }),
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe could not reach the graph store");
            Json(ReadyResponse { graph_reachable: false, domain_count: None })
        }
    }
}

#[derive(Serialize)]
pub struct StageSummary {
    pub name: &'static str,
    pub input_topics: &'static [&'static str],
    pub output_topics: &'static [&'static str],
    pub timeout_secs: u64,
}

#[derive(Serialize)]
pub struct PipelineResponse {
    pub stage_count: usize,
    pub stages: Vec<StageSummary>,
}

pub async fn pipeline() -> Json<PipelineResponse> {
    let stages = PIPELINE
        .iter()
        .map(|s| StageSummary {
            name: s.name,
            input_topics: s.input_topics,
            output_topics: s.output_topics,
            timeout_secs: s.timeout_secs,
        })
        .collect();
    Json(PipelineResponse { stage_count: PIPELINE.len(), stages })
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.config.redacted_summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State as AxumState;

    #[tokio::test]
    async fn pipeline_response_lists_every_catalog_stage() {
        let Json(resp) = pipeline().await;
        assert_eq!(resp.stage_count, PIPELINE.len());
        assert_eq!(resp.stages.len(), PIPELINE.len());
    }

    #[tokio::test]
    async fn health_reports_ok_status() {
        let state = AppState::new(domain_intel_core::config::Config::for_profile(""));
        let Json(resp) = health(AxumState(state)).await;
        assert_eq!(resp.status, "ok");
    }
}
