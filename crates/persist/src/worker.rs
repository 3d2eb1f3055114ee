//! The persist worker (§4.F): decode a message, select the parser family
//! its input topic belongs to, invoke that parser's vertex/edge
//! projections, and write them through the graph store. No output
//! topics — the store is the output. A stage runs one persist worker per
//! topic, so the family is fixed at construction (§4.E: each persist
//! stage names exactly one input topic), not dispatched per message.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use domain_intel_graph::GraphStore;
use domain_intel_parsers::{analyst_qas, sites_linking_in, Projected};
use domain_intel_stage::{StageError, Worker};

use crate::error::PersistError;

/// Which topic's message shape a `PersistWorker` decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserFamily {
    /// `alexa-flattened`: a `Projected` envelope from `flatten-rank`.
    Rank,
    /// `alexa-sli-results`: a raw `{domain, body}` envelope, parsed here.
    Sli,
    /// `alexa-traffic-flattened`: a `Projected` envelope from `flatten-traffic`.
    Traffic,
    /// `dns-geodns-parsed`: a `Projected` envelope from `geolocate-dns`.
    Geodns,
    /// `analyst-qas`: the raw xlsx workbook bytes, parsed here.
    AnalystQas,
}

impl ParserFamily {
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            "alexa-flattened" => Some(Self::Rank),
            "alexa-sli-results" => Some(Self::Sli),
            "alexa-traffic-flattened" => Some(Self::Traffic),
            "dns-geodns-parsed" => Some(Self::Geodns),
            "analyst-qas" => Some(Self::AnalystQas),
            _ => None,
        }
    }
}

/// A raw resolver response paired with the domain it was resolved for.
/// SitesLinkingIn carries no domain of its own in its XML body, so the
/// resolver stage that produced it must ship the domain alongside.
#[derive(Debug, Deserialize)]
struct DomainPayload {
    domain: String,
    body: String,
}

pub struct PersistWorker {
    store: GraphStore,
    family: ParserFamily,
    dry: bool,
    edge_count: AtomicU64,
}

impl PersistWorker {
    pub fn new(store: GraphStore, family: ParserFamily, dry: bool) -> Self {
        Self { store, family, dry, edge_count: AtomicU64::new(0) }
    }

    /// Edges actually created (duplicate keys don't count) across every
    /// message this worker instance has processed.
    pub fn edge_count(&self) -> u64 {
        self.edge_count.load(Ordering::Relaxed)
    }

    fn project(&self, input: &[u8]) -> Result<Projected, PersistError> {
        match self.family {
            ParserFamily::Rank | ParserFamily::Traffic | ParserFamily::Geodns => {
                Ok(Projected::from_bytes(input)?)
            }
            ParserFamily::Sli => {
                let payload: DomainPayload =
                    serde_json::from_slice(input).map_err(|e| PersistError::Malformed(e.to_string()))?;
                let parsed = sites_linking_in::parse(&payload.domain, payload.body.as_bytes());
                Ok(Projected::from_payloads(parsed.vertex_payloads(), parsed.edge_payloads()))
            }
            ParserFamily::AnalystQas => {
                let rows = analyst_qas::parse(input)?;
                let mut vertices = Vec::new();
                let mut edges = Vec::new();
                for row in &rows {
                    vertices.extend(row.vertex_payloads());
                    edges.extend(row.edge_payloads());
                }
                Ok(Projected::from_payloads(vertices, edges))
            }
        }
    }

    /// Insert every projected vertex then every projected edge, counting
    /// newly-created edges. A store error aborts the message immediately,
    /// leaving whatever was already inserted in place (inserts are
    /// idempotent, so a retried message re-inserting them is harmless).
    async fn persist(&self, input: &[u8]) -> Result<(), PersistError> {
        let projected = self.project(input)?;

        for v in &projected.vertices {
            self.store.insert_vertex(&v.collection, &v.record, self.dry).await?;
        }
        for e in &projected.edges {
            if self.store.insert_edge(&e.collection, &e.record, self.dry).await? {
                self.edge_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Worker for PersistWorker {
    type Output = Vec<u8>;

    async fn call(&self, input: &[u8]) -> Result<Self::Output, StageError> {
        self.persist(input).await.map_err(|e| {
            if e.retryable() {
                StageError::RetryableWorker(e.to_string())
            } else {
                StageError::Worker(e.to_string())
            }
        })?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_intel_core::config::GraphConfig;
    use domain_intel_core::model::Record;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg_for(base: &str) -> GraphConfig {
        let rest = base.trim_start_matches("http://");
        let (host, port) = rest.split_once(':').unwrap();
        GraphConfig {
            host: host.to_string(),
            port: port.parse().unwrap(),
            username: None,
            password: None,
            database: "domain_intel".into(),
            dry: false,
        }
    }

    fn one_vertex_one_edge() -> Projected {
        let mut v = Record::new();
        v.insert("_key".into(), Value::String("feedblitz.com".into()));
        let mut e = Record::new();
        e.insert("_key".into(), Value::String("feedblitz.com:US".into()));
        e.insert("_from".into(), Value::String("domain/feedblitz.com".into()));
        e.insert("_to".into(), Value::String("country/US".into()));
        Projected::from_payloads(vec![("domain", v)], vec![("ranked", e)])
    }

    #[tokio::test]
    async fn rank_family_inserts_from_projected_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/domain"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/ranked"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let worker = PersistWorker::new(store, ParserFamily::Rank, false);

        let input = one_vertex_one_edge().to_bytes();
        worker.persist(&input).await.unwrap();

        assert_eq!(worker.edge_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_edge_does_not_increment_edge_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/domain"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/ranked"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let worker = PersistWorker::new(store, ParserFamily::Rank, false);

        let input = one_vertex_one_edge().to_bytes();
        worker.persist(&input).await.unwrap();

        assert_eq!(worker.edge_count(), 0);
    }

    #[tokio::test]
    async fn sli_family_parses_domain_payload_before_projecting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let worker = PersistWorker::new(store, ParserFamily::Sli, false);

        let xml = r#"
            <SitesLinkingInResult>
              <Alexa>
                <SitesLinkingIn>
                  <Site><Title>Only One</Title><Url>only.example.com</Url></Site>
                </SitesLinkingIn>
              </Alexa>
            </SitesLinkingInResult>
        "#;
        let input = serde_json::to_vec(&json!({ "domain": "feedblitz.com", "body": xml })).unwrap();

        worker.persist(&input).await.unwrap();
        assert_eq!(worker.edge_count(), 1);
    }

    #[tokio::test]
    async fn store_failure_aborts_the_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/domain"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let worker = PersistWorker::new(store, ParserFamily::Rank, false);

        let input = one_vertex_one_edge().to_bytes();
        let err = worker.persist(&input).await.unwrap_err();
        assert!(matches!(err, PersistError::Store(_)));
    }
}
