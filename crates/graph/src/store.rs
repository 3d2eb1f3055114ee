//! The property-graph store adapter (§4.B, §4.A, §3), speaking the
//! document/graph HTTP API of an ArangoDB-like store. Grounded on
//! `domain_intel/store.py`: idempotent key-scoped insert, duplicate-key
//! swallowing, bounded-depth traversal, and a `dry` mode that logs the
//! mutation it would have made instead of performing it.

use domain_intel_core::config::GraphConfig;
use domain_intel_core::model::{self, EdgeDefinition, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::countries::COUNTRY_CODES;
use crate::error::GraphError;

/// A single traversal step: the edge walked and the vertex arrived at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathStep {
    pub edges: Vec<Record>,
    pub vertices: Vec<Record>,
}

/// Result of `traverse`: every vertex visited, plus the distinct paths
/// that reach them from the seed. Also the wire shape `domain-traversals`
/// messages carry (§4.G takes this as its input).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraversalResult {
    pub vertices: Vec<Record>,
    pub paths: Vec<PathStep>,
}

impl TraversalResult {
    pub fn edge_count_by_name(&self, edge_name: &str) -> usize {
        self.paths
            .iter()
            .flat_map(|p| p.edges.iter())
            .filter(|e| {
                e.get("_id")
                    .and_then(Value::as_str)
                    .map(|id| id.starts_with(&format!("{edge_name}/")))
                    .unwrap_or(false)
            })
            .count()
    }
}

pub struct GraphStore {
    client: reqwest::Client,
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl GraphStore {
    pub fn new(cfg: &GraphConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url(),
            database: cfg.database.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        }
    }

    fn db_url(&self, path: &str) -> String {
        format!("{}/_db/{}{}", self.base_url, self.database, path)
    }

    fn system_url(&self, path: &str) -> String {
        format!("{}/_db/_system{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let req = self.client.request(method, url);
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_ref()),
            None => req,
        }
    }

    /// Create the configured database if it does not already exist.
    /// Returns `true` if it was newly created, `false` if it already existed.
    pub async fn initialise(&self) -> Result<bool, GraphError> {
        let resp = self
            .request(reqwest::Method::POST, self.system_url("/_api/database"))
            .json(&json!({ "name": self.database }))
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(true);
        }
        if resp.status().as_u16() == 409 {
            tracing::debug!(database = %self.database, "database already exists");
            return Ok(false);
        }
        Err(GraphError::Store(format!(
            "database creation failed: {}",
            resp.text().await.unwrap_or_default()
        )))
    }

    /// Create every vertex collection and edge definition named in §3.
    /// Idempotent: collections that already exist are skipped silently.
    /// Returns the names newly created.
    pub async fn build_graph(&self) -> Result<Vec<String>, GraphError> {
        let mut created = Vec::new();

        for name in model::vertex::ALL {
            if self.create_collection(name, 2).await? {
                created.push((*name).to_string());
            }
        }
        for def in model::EDGE_DEFINITIONS {
            if self.create_collection(def.name, 3).await? {
                created.push(def.name.to_string());
            }
        }

        Ok(created)
    }

    async fn create_collection(&self, name: &str, collection_type: u8) -> Result<bool, GraphError> {
        let resp = self
            .request(reqwest::Method::POST, self.db_url("/_api/collection"))
            .json(&json!({ "name": name, "type": collection_type }))
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(true);
        }
        if resp.status().as_u16() == 409 {
            return Ok(false);
        }
        Err(GraphError::Store(format!(
            "collection creation failed for {name}: {}",
            resp.text().await.unwrap_or_default()
        )))
    }

    /// Pre-seed the `country` vertex collection from the ISO-3166 table so
    /// `ranked` edge inserts never race a missing country endpoint.
    pub async fn seed_country_codes(&self, dry: bool) -> Result<usize, GraphError> {
        let mut inserted = 0;
        for (code, name) in COUNTRY_CODES {
            let mut record = Record::new();
            record.insert("_key".into(), Value::String((*code).to_string()));
            record.insert("name".into(), Value::String((*name).to_string()));
            if self.insert_vertex(model::vertex::COUNTRY, &record, dry).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Insert a document into `collection` keyed by `record["_key"]`.
    /// Returns `true` iff a new row was created; a duplicate key is
    /// converted to `false` and logged, never raised.
    pub async fn insert_vertex(
        &self,
        collection: &str,
        record: &Record,
        dry: bool,
    ) -> Result<bool, GraphError> {
        self.insert_document(collection, record, dry).await
    }

    /// Identical contract to `insert_vertex`, for an edge collection.
    /// `record` must carry `_key`, `_from`, and `_to`.
    pub async fn insert_edge(
        &self,
        edge_name: &str,
        record: &Record,
        dry: bool,
    ) -> Result<bool, GraphError> {
        self.insert_document(edge_name, record, dry).await
    }

    async fn insert_document(
        &self,
        collection: &str,
        record: &Record,
        dry: bool,
    ) -> Result<bool, GraphError> {
        if dry {
            tracing::info!(collection, key = ?record.get("_key"), "dry run: would insert document");
            return Ok(true);
        }

        let resp = self
            .request(
                reqwest::Method::POST,
                self.db_url(&format!("/_api/document/{collection}")),
            )
            .json(record)
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(true);
        }
        if resp.status().as_u16() == 409 {
            tracing::debug!(collection, key = ?record.get("_key"), "duplicate key, not created");
            return Ok(false);
        }
        Err(GraphError::Store(format!(
            "insert into {collection} failed: {}",
            resp.text().await.unwrap_or_default()
        )))
    }

    /// Exact row count for `collection`.
    pub async fn get_count(&self, collection: &str) -> Result<u64, GraphError> {
        #[derive(Deserialize)]
        struct CountResponse {
            count: u64,
        }

        let resp = self
            .request(
                reqwest::Method::GET,
                self.db_url(&format!("/_api/collection/{collection}/count")),
            )
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GraphError::Store(format!(
                "count failed for {collection}: {}",
                resp.text().await.unwrap_or_default()
            )));
        }

        let body: CountResponse =
            resp.json().await.map_err(|e| GraphError::Request(e.to_string()))?;
        Ok(body.count)
    }

    /// Walk from `seed_vertex_id` (a full `collection/key` id), direction
    /// "any", up to `max_depth` hops. Fails with `TraverseFailed` when the
    /// seed does not exist.
    pub async fn traverse(
        &self,
        seed_vertex_id: &str,
        max_depth: u32,
    ) -> Result<TraversalResult, GraphError> {
        #[derive(Deserialize)]
        struct TraversalEnvelope {
            result: TraversalResult,
        }

        let resp = self
            .request(reqwest::Method::POST, self.db_url("/_api/traversal"))
            .json(&json!({
                "startVertex": seed_vertex_id,
                "direction": "any",
                "maxDepth": max_depth,
            }))
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if resp.status().as_u16() == 404 {
            return Err(GraphError::TraverseFailed(seed_vertex_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(GraphError::Store(format!(
                "traversal failed: {}",
                resp.text().await.unwrap_or_default()
            )));
        }

        let envelope: TraversalEnvelope =
            resp.json().await.map_err(|e| GraphError::Request(e.to_string()))?;
        Ok(envelope.result)
    }

    /// Destructive. Used only by tests to reset store state between runs.
    pub async fn drop_database(&self) -> Result<(), GraphError> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                self.system_url(&format!("/_api/database/{}", self.database)),
            )
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        if resp.status().is_success() || resp.status().as_u16() == 404 {
            return Ok(());
        }
        Err(GraphError::Store(format!(
            "drop database failed: {}",
            resp.text().await.unwrap_or_default()
        )))
    }
}

/// The edge definitions from §3, re-exported here for callers that only
/// need the graph shape without pulling in the rest of `domain_intel_core`.
pub fn edge_definitions() -> &'static [EdgeDefinition] {
    model::EDGE_DEFINITIONS
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn insert_vertex_dry_run_never_calls_store() {
        let server = MockServer::start().await;
        let store = GraphStore::new(&cfg_for(&server.uri()));

        let mut record = Record::new();
        record.insert("_key".into(), Value::String("feedblitz.com".into()));

        let created = store.insert_vertex("domain", &record, true).await.unwrap();
        assert!(created);
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn insert_vertex_duplicate_key_reports_not_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/domain"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let mut record = Record::new();
        record.insert("_key".into(), Value::String("feedblitz.com".into()));

        let created = store.insert_vertex("domain", &record, false).await.unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn insert_vertex_success_reports_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/document/domain"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let mut record = Record::new();
        record.insert("_key".into(), Value::String("feedblitz.com".into()));

        let created = store.insert_vertex("domain", &record, false).await.unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn get_count_parses_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_db/domain_intel/_api/collection/domain/count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 42 })))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let count = store.get_count("domain").await.unwrap();
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn traverse_missing_seed_returns_traverse_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/traversal"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let err = store.traverse("domain/missing", 1).await.unwrap_err();
        assert!(matches!(err, GraphError::TraverseFailed(_)));
    }

    #[tokio::test]
    async fn traverse_counts_edges_by_collection_name() {
        let server = MockServer::start().await;
        let body = json!({
            "result": {
                "vertices": [{"_id": "domain/feedblitz.com"}],
                "paths": [
                    {
                        "edges": [
                            {"_id": "ranked/feedblitz.com:US"},
                            {"_id": "ranked/feedblitz.com:GB"},
                            {"_id": "related/feedblitz.com:abc123"},
                        ],
                        "vertices": []
                    }
                ]
            }
        });
        Mock::given(method("POST"))
            .and(path("/_db/domain_intel/_api/traversal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let store = GraphStore::new(&cfg_for(&server.uri()));
        let result = store.traverse("domain/feedblitz.com", 1).await.unwrap();
        assert_eq!(result.edge_count_by_name("ranked"), 2);
        assert_eq!(result.edge_count_by_name("related"), 1);
    }
}
