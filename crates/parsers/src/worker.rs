//! Stage workers for §4.C's flatten/parse half of the catalog:
//! `flatten-rank`, `flatten-traffic`, `parse-dns`. Each wraps one parser's
//! pure function in the `Worker` contract the stage engine runs against,
//! the same wrapping shape `persist::PersistWorker` and
//! `reporter::worker` use for their own stages.

use async_trait::async_trait;
use serde::Deserialize;

use domain_intel_stage::{StageError, Worker};

use crate::geodns;
use crate::projected::Projected;
use crate::rank_info;
use crate::traffic_history;

fn fatal(e: impl std::fmt::Display) -> StageError {
    StageError::Worker(e.to_string())
}

/// `flatten-rank`: `alexa-results` (raw `UrlInfoResult` JSON) to
/// `alexa-flattened` (a `Projected` envelope).
pub struct RankFlattenWorker;

#[async_trait]
impl Worker for RankFlattenWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        let info = rank_info::parse(input).map_err(fatal)?;
        let projected = Projected::from_payloads(info.vertex_payloads(), info.edge_payloads());
        Ok(projected.to_bytes())
    }
}

/// A raw resolver response paired with the domain it was resolved for —
/// the same `{domain, body}` envelope `persist::PersistWorker` expects for
/// the SLI family, needed here because `TrafficData` XML carries no
/// domain of its own.
#[derive(Debug, Deserialize)]
struct DomainPayload {
    domain: String,
    body: String,
}

/// `flatten-traffic`: `alexa-traffic-results` to `alexa-traffic-flattened`.
pub struct TrafficFlattenWorker;

#[async_trait]
impl Worker for TrafficFlattenWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        let payload: DomainPayload = serde_json::from_slice(input).map_err(fatal)?;
        let history = traffic_history::parse(&payload.domain, payload.body.as_bytes()).map_err(fatal)?;
        let projected = Projected::from_payloads(history.vertex_payloads(), history.edge_payloads());
        Ok(projected.to_bytes())
    }
}

/// `parse-dns`: `dns-raw` to `dns-parsed`. Validates and domain-normalizes
/// the per-country DNS lookup; the geolocation merge happens downstream,
/// once `geolocate-dns`'s external resolver call returns (§4.C, §4.E).
pub struct DnsParseWorker;

#[async_trait]
impl Worker for DnsParseWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        let dns_raw = geodns::parse_dns(input).map_err(fatal)?;
        Ok(dns_raw.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn rank_flatten_worker_projects_a_domain_vertex() {
        let input = json!({
            "UrlInfoResult": {
                "Alexa": {
                    "ContentData": { "DataUrl": "feedblitz.com" },
                    "TrafficData": { "Rank": 53960 }
                }
            }
        });
        let out = RankFlattenWorker.call(&serde_json::to_vec(&input).unwrap()).await.unwrap();
        let projected = Projected::from_bytes(&out).unwrap();
        assert_eq!(projected.vertices[0].record.get("_key").unwrap(), "feedblitz.com");
    }

    #[tokio::test]
    async fn dns_parse_worker_trims_the_domain() {
        let input = json!({ "domain": "  feedblitz.com  ", "nodes": {} });
        let out = DnsParseWorker.call(&serde_json::to_vec(&input).unwrap()).await.unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(decoded["domain"], "feedblitz.com");
    }

    #[tokio::test]
    async fn malformed_rank_input_is_a_fatal_worker_error() {
        let err = RankFlattenWorker.call(b"not json").await.unwrap_err();
        assert!(matches!(err, StageError::Worker(_)));
    }
}
