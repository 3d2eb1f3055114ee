//! Analyst-QAS parser (§4.C): manual analyst questionnaire, shipped as an
//! Excel workbook. Reads the *second* sheet (index 1); each row from row 2
//! onward is one domain's answers. Column 0 is the domain key, columns 1-8
//! are the eight fixed attributes in order. `"Y"`/`"N"` values are kept
//! verbatim here — normalisation to lowercase `"true"`/`"false"` happens at
//! report time (§4.G), not at parse time.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use domain_intel_core::model::{doc_id, edge, normalize_domain, vertex, Record};
use serde_json::Value;

use crate::error::ParseError;

/// The eight fixed attribute names, in the column order the sheet uses.
pub const ATTRIBUTE_NAMES: [&str; 8] = [
    "p2p_magnet_links",
    "links_to_torrents",
    "links_to_osp",
    "search_feature",
    "domain_down_or_parked",
    "has_rss_feed",
    "requires_login",
    "has_forum_or_comments",
];

#[derive(Debug, Clone)]
pub struct AnalystQasRow {
    pub domain: String,
    pub attributes: [String; 8],
}

pub fn parse(bytes: &[u8]) -> Result<Vec<AnalystQasRow>, ParseError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ParseError::Workbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .get(1)
        .ok_or_else(|| ParseError::Workbook("workbook has no second sheet".into()))?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let mut rows = Vec::new();
    for row in range.rows().skip(1) {
        let Some(domain_cell) = row.first() else { continue };
        let domain = cell_to_string(domain_cell);
        if domain.is_empty() {
            continue;
        }

        let mut attributes: [String; 8] = Default::default();
        for (i, attr) in attributes.iter_mut().enumerate() {
            *attr = row.get(i + 1).map(cell_to_string).unwrap_or_default();
        }

        rows.push(AnalystQasRow { domain: normalize_domain(&domain), attributes });
    }

    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        _ => cell.to_string(),
    }
}

impl AnalystQasRow {
    pub fn vertex_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut rec = Record::new();
        rec.insert("_key".into(), Value::String(self.domain.clone()));
        for (name, value) in ATTRIBUTE_NAMES.iter().zip(self.attributes.iter()) {
            rec.insert((*name).to_string(), Value::String(value.clone()));
        }
        vec![(vertex::ANALYST_QAS, rec)]
    }

    pub fn edge_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut rec = Record::new();
        rec.insert("_key".into(), Value::String(self.domain.clone()));
        rec.insert("_from".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
        rec.insert("_to".into(), Value::String(doc_id(vertex::ANALYST_QAS, &self.domain)));
        vec![(edge::MARKED, rec)]
    }
}

#[cfg(test)]
mod tests {
    use super::ATTRIBUTE_NAMES;

    #[test]
    fn attribute_names_match_the_eight_documented_fields() {
        assert_eq!(ATTRIBUTE_NAMES.len(), 8);
        assert_eq!(ATTRIBUTE_NAMES[0], "p2p_magnet_links");
        assert_eq!(ATTRIBUTE_NAMES[7], "has_forum_or_comments");
    }
}
