//! Geo-DNS parser (§4.C): merges a per-country DNS lookup (A/AAAA record
//! sets) with a per-IP geolocation lookup into a map keyed by country code.
//!
//! The merge must tolerate a missing per-node result, an absent `A`/`AAAA`
//! list on a node, and an explicitly null node result — none of these
//! raise, they just produce an empty list for that slot (with a warning
//! logged for the absent-list case).

use std::collections::HashMap;

use domain_intel_core::model::{doc_id, edge, edge_key, normalize_domain, vertex, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ParseError;

#[derive(Debug, Deserialize)]
struct DnsRawDoc {
    domain: String,
    #[serde(default)]
    nodes: HashMap<String, Option<DnsNode>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct DnsNode {
    #[serde(default, rename = "A")]
    a: Option<Vec<String>>,
    #[serde(default, rename = "AAAA")]
    aaaa: Option<Vec<String>>,
}

/// Geolocation attributes for one resolved address, when known.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoAttrs {
    pub isp: Option<String>,
    pub org: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub continent_code: Option<String>,
    pub continent: Option<String>,
    pub timezone: Option<String>,
    pub postcode_range: Option<String>,
}

#[derive(Debug, Default)]
pub struct GeoResults {
    by_ip: HashMap<String, GeoAttrs>,
}

/// Parse the DNS lookup half of the input. Fatal on structural mismatch.
pub fn parse_dns(bytes: &[u8]) -> Result<DnsRaw, ParseError> {
    let doc: DnsRawDoc = serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(DnsRaw { domain: normalize_domain(&doc.domain), nodes: doc.nodes })
}

#[derive(Serialize)]
pub struct DnsRaw {
    domain: String,
    nodes: HashMap<String, Option<DnsNode>>,
}

impl DnsRaw {
    /// Re-serialize the validated, domain-normalized form for the
    /// `dns-parsed` topic — `parse-dns`'s output (§4.E).
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Parse the per-IP geolocation lookup. `{"Error": "..."}` is not a parse
/// failure — it yields an empty geo-results map (§8 scenario).
pub fn parse_geo(bytes: &[u8]) -> Result<GeoResults, ParseError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))?;
    if value.get("Error").is_some() {
        return Ok(GeoResults::default());
    }
    let by_ip: HashMap<String, GeoAttrs> =
        serde_json::from_value(value).map_err(|e| ParseError::Json(e.to_string()))?;
    Ok(GeoResults { by_ip })
}

#[derive(Debug, Clone)]
pub struct ResolvedAddr {
    pub ip: String,
    pub geo: GeoAttrs,
}

#[derive(Debug, Clone, Default)]
pub struct CountryRecords {
    pub source_domain: String,
    pub a: Vec<ResolvedAddr>,
    pub aaaa: Vec<ResolvedAddr>,
}

#[derive(Debug)]
pub struct GeoDns {
    pub domain: String,
    pub by_country: HashMap<String, CountryRecords>,
}

/// Merge a DNS lookup with a geolocation lookup into the per-country map.
pub fn merge(dns: &DnsRaw, geo: &GeoResults) -> GeoDns {
    let mut by_country = HashMap::new();

    for (country, node) in &dns.nodes {
        let records = match node {
            None => {
                tracing::debug!(country, domain = %dns.domain, "no DNS node result for country");
                CountryRecords { source_domain: dns.domain.clone(), a: Vec::new(), aaaa: Vec::new() }
            }
            Some(node) => {
                let a = resolve_list(node.a.as_deref(), country, "A", geo);
                let aaaa = resolve_list(node.aaaa.as_deref(), country, "AAAA", geo);
                CountryRecords { source_domain: dns.domain.clone(), a, aaaa }
            }
        };
        by_country.insert(country.clone(), records);
    }

    GeoDns { domain: dns.domain.clone(), by_country }
}

fn resolve_list(ips: Option<&[String]>, country: &str, kind: &str, geo: &GeoResults) -> Vec<ResolvedAddr> {
    match ips {
        None => {
            tracing::warn!(country, kind, "record list absent for node, treating as empty");
            Vec::new()
        }
        Some(ips) => ips
            .iter()
            .map(|ip| ResolvedAddr { ip: ip.clone(), geo: geo.by_ip.get(ip).cloned().unwrap_or_default() })
            .collect(),
    }
}

impl GeoDns {
    pub fn vertex_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut out = Vec::new();
        let mut seen_v4 = std::collections::HashSet::new();
        let mut seen_v6 = std::collections::HashSet::new();

        for records in self.by_country.values() {
            for addr in &records.a {
                if seen_v4.insert(addr.ip.clone()) {
                    out.push((vertex::IPV4, addr_record(addr)));
                }
            }
            for addr in &records.aaaa {
                if seen_v6.insert(addr.ip.clone()) {
                    out.push((vertex::IPV6, addr_record(addr)));
                }
            }
        }

        let mut geodns_rec = Record::new();
        geodns_rec.insert("_key".into(), Value::String(self.domain.clone()));
        geodns_rec.insert("country_count".into(), json!(self.by_country.len()));
        out.push((vertex::GEODNS, geodns_rec));

        out
    }

    pub fn edge_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut out = Vec::new();
        let mut seen_v4 = std::collections::HashSet::new();
        let mut seen_v6 = std::collections::HashSet::new();

        for records in self.by_country.values() {
            for addr in &records.a {
                if seen_v4.insert(addr.ip.clone()) {
                    out.push((edge::IPV4_RESOLVES, resolve_edge(&self.domain, &addr.ip, vertex::IPV4)));
                }
            }
            for addr in &records.aaaa {
                if seen_v6.insert(addr.ip.clone()) {
                    out.push((edge::IPV6_RESOLVES, resolve_edge(&self.domain, &addr.ip, vertex::IPV6)));
                }
            }
        }
        out
    }
}

fn addr_record(addr: &ResolvedAddr) -> Record {
    let mut rec = Record::new();
    rec.insert("_key".into(), Value::String(addr.ip.clone()));
    if let Some(v) = &addr.geo.isp {
        rec.insert("isp".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.org {
        rec.insert("org".into(), Value::String(v.clone()));
    }
    if let Some(v) = addr.geo.latitude {
        rec.insert("latitude".into(), json!(v));
    }
    if let Some(v) = addr.geo.longitude {
        rec.insert("longitude".into(), json!(v));
    }
    if let Some(v) = &addr.geo.country_code {
        rec.insert("country_code".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.country {
        rec.insert("country".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.continent_code {
        rec.insert("continent_code".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.continent {
        rec.insert("continent".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.timezone {
        rec.insert("timezone".into(), Value::String(v.clone()));
    }
    if let Some(v) = &addr.geo.postcode_range {
        rec.insert("postcode_range".into(), Value::String(v.clone()));
    }
    rec
}

fn resolve_edge(domain: &str, ip: &str, collection: &str) -> Record {
    let mut rec = Record::new();
    rec.insert("_key".into(), Value::String(edge_key(domain, ip)));
    rec.insert("_from".into(), Value::String(doc_id(vertex::DOMAIN, domain)));
    rec.insert("_to".into(), Value::String(doc_id(collection, ip)));
    rec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_geo_response_yields_empty_map_not_error() {
        let geo = parse_geo(br#"{"Error":"no routes"}"#).unwrap();
        assert!(geo.by_ip.is_empty());
    }

    #[test]
    fn missing_node_result_becomes_empty_lists() {
        let dns = parse_dns(br#"{"domain":"feedblitz.com","nodes":{"US":null}}"#).unwrap();
        let geo = GeoResults::default();
        let merged = merge(&dns, &geo);
        let us = &merged.by_country["US"];
        assert!(us.a.is_empty());
        assert!(us.aaaa.is_empty());
    }

    #[test]
    fn absent_aaaa_list_becomes_empty_with_warning() {
        let dns = parse_dns(br#"{"domain":"feedblitz.com","nodes":{"US":{"A":["1.2.3.4"]}}}"#).unwrap();
        let geo = GeoResults::default();
        let merged = merge(&dns, &geo);
        let us = &merged.by_country["US"];
        assert_eq!(us.a.len(), 1);
        assert!(us.aaaa.is_empty());
    }

    #[test]
    fn resolved_addr_picks_up_geo_attrs_when_present() {
        let dns = parse_dns(br#"{"domain":"feedblitz.com","nodes":{"US":{"A":["1.2.3.4"]}}}"#).unwrap();
        let geo = parse_geo(br#"{"1.2.3.4":{"isp":"ExampleISP","country_code":"US"}}"#).unwrap();
        let merged = merge(&dns, &geo);
        let addr = &merged.by_country["US"].a[0];
        assert_eq!(addr.geo.isp.as_deref(), Some("ExampleISP"));
    }
}
