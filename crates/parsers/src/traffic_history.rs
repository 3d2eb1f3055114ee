//! TrafficHistory parser (§4.C): `HistoricalData/Data` monthly series.
//!
//! Missing numeric fields are emitted as empty strings, not zero — a
//! downstream trend computation (§4.G) distinguishes "no data" from "0".

use domain_intel_core::model::{doc_id, edge, edge_key, normalize_domain, vertex, Record};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ParseError;
use crate::value::OneOrMany;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "HistoricalData")]
    historical_data: HistoricalData,
}

#[derive(Debug, Deserialize)]
struct HistoricalData {
    #[serde(rename = "StartDate")]
    start_date: String,
    #[serde(rename = "Data", default)]
    data: OneOrMany<DataPoint>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DataPoint {
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "Rank")]
    rank: Option<String>,
    #[serde(rename = "PageViews")]
    page_views: Option<PageViews>,
    #[serde(rename = "Reach")]
    reach: Option<Reach>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PageViews {
    #[serde(rename = "PerMillion")]
    per_million: Option<String>,
    #[serde(rename = "PerUser")]
    per_user: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct Reach {
    #[serde(rename = "PerMillion")]
    per_million: Option<String>,
}

/// One daily point in the series; missing fields stay `""` rather than `0`.
#[derive(Debug, Clone, Default)]
pub struct TrafficDay {
    pub date: String,
    pub rank: String,
    pub page_views_per_million: String,
    pub page_views_per_user: String,
    pub reach_per_million: String,
}

#[derive(Debug)]
pub struct TrafficHistory {
    pub domain: String,
    pub start_date: String,
    pub days: Vec<TrafficDay>,
}

pub fn parse(domain: &str, bytes: &[u8]) -> Result<TrafficHistory, ParseError> {
    let domain = normalize_domain(domain);
    let xml = std::str::from_utf8(bytes).map_err(|e| ParseError::Xml(e.to_string()))?;
    let envelope: Envelope =
        quick_xml::de::from_str(xml).map_err(|e| ParseError::Xml(e.to_string()))?;

    let days = envelope
        .historical_data
        .data
        .into_vec()
        .into_iter()
        .map(|d| TrafficDay {
            date: d.date.unwrap_or_default(),
            rank: d.rank.unwrap_or_default(),
            page_views_per_million: d.page_views.as_ref().and_then(|p| p.per_million.clone()).unwrap_or_default(),
            page_views_per_user: d.page_views.and_then(|p| p.per_user).unwrap_or_default(),
            reach_per_million: d.reach.and_then(|r| r.per_million).unwrap_or_default(),
        })
        .collect();

    Ok(TrafficHistory { domain, start_date: envelope.historical_data.start_date, days })
}

impl TrafficHistory {
    fn key(&self) -> String {
        format!("{}:{}", self.domain, self.start_date)
    }

    pub fn vertex_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut rec = Record::new();
        rec.insert("_key".into(), Value::String(self.key()));
        let series: Vec<Value> = self
            .days
            .iter()
            .map(|d| {
                json!({
                    "date": d.date,
                    "rank": d.rank,
                    "page_views_pm": d.page_views_per_million,
                    "page_views_user": d.page_views_per_user,
                    "reach_pm": d.reach_per_million,
                })
            })
            .collect();
        rec.insert("series".into(), Value::Array(series));
        vec![(vertex::TRAFFIC, rec)]
    }

    pub fn edge_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut rec = Record::new();
        let key = self.key();
        rec.insert("_key".into(), Value::String(edge_key(&key, &self.domain)));
        rec.insert("_from".into(), Value::String(doc_id(vertex::TRAFFIC, &key)));
        rec.insert("_to".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
        vec![(edge::VISIT, rec)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <HistoricalData>
          <StartDate>2017-07-04</StartDate>
          <Data>
            <Date>2017-07-04</Date>
            <Rank>53960</Rank>
            <PageViews><PerMillion>12.5</PerMillion><PerUser>1.2</PerUser></PageViews>
            <Reach><PerMillion>8.1</PerMillion></Reach>
          </Data>
          <Data>
            <Date>2017-07-05</Date>
          </Data>
        </HistoricalData>
    "#;

    #[test]
    fn missing_numeric_fields_are_empty_strings_not_zero() {
        let parsed = parse("4shared.com", FIXTURE.as_bytes()).unwrap();
        assert_eq!(parsed.days.len(), 2);
        assert_eq!(parsed.days[1].rank, "");
        assert_eq!(parsed.days[1].page_views_per_million, "");
    }

    #[test]
    fn traffic_key_combines_domain_and_start_date() {
        let parsed = parse("4shared.com", FIXTURE.as_bytes()).unwrap();
        assert_eq!(parsed.key(), "4shared.com:2017-07-04");
    }
}
