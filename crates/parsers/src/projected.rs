//! Common wire shape for a flatten/parse stage's output (§6: "flat-stage
//! messages are JSON objects"). A flatten stage calls one parser's
//! `vertex_payloads()`/`edge_payloads()` and wraps the result in this
//! envelope; the persist worker (§4.F) for that topic just deserializes
//! it and inserts, with no parsing of its own left to do.

use domain_intel_core::model::Record;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectedRecord {
    pub collection: String,
    pub record: Record,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projected {
    pub vertices: Vec<ProjectedRecord>,
    pub edges: Vec<ProjectedRecord>,
}

impl Projected {
    pub fn from_payloads(
        vertices: Vec<(&'static str, Record)>,
        edges: Vec<(&'static str, Record)>,
    ) -> Self {
        Self {
            vertices: vertices
                .into_iter()
                .map(|(collection, record)| ProjectedRecord { collection: collection.to_string(), record })
                .collect(),
            edges: edges
                .into_iter()
                .map(|(collection, record)| ProjectedRecord { collection: collection.to_string(), record })
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn roundtrips_through_bytes() {
        let mut record = Record::new();
        record.insert("_key".into(), Value::String("feedblitz.com".into()));
        let projected = Projected::from_payloads(vec![("domain", record)], vec![]);

        let bytes = projected.to_bytes();
        let decoded = Projected::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.vertices.len(), 1);
        assert_eq!(decoded.vertices[0].collection, "domain");
    }
}
