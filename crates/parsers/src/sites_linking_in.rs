//! SitesLinkingIn parser (§4.C): `SitesLinkingInResult/Alexa/SitesLinkingIn/Site`.
//!
//! The documented exception to "parse errors are fatal" (§7): an empty or
//! null response yields an empty list rather than raising.

use std::collections::HashSet;

use domain_intel_core::model::{self, doc_id, edge, edge_key, normalize_domain, vertex, Record};
use serde::Deserialize;
use serde_json::Value;

use crate::value::OneOrMany;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "SitesLinkingInResult")]
    result: Option<SitesLinkingInResult>,
}

#[derive(Debug, Deserialize)]
struct SitesLinkingInResult {
    #[serde(rename = "Alexa")]
    alexa: Option<AlexaBody>,
}

#[derive(Debug, Deserialize)]
struct AlexaBody {
    #[serde(rename = "SitesLinkingIn")]
    sites_linking_in: Option<SitesLinkingInBody>,
}

#[derive(Debug, Deserialize)]
struct SitesLinkingInBody {
    #[serde(rename = "Site", default)]
    site: OneOrMany<Site>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Url")]
    pub url: String,
}

#[derive(Debug)]
pub struct SitesLinkingIn {
    pub domain: String,
    pub sites: Vec<Site>,
}

/// Parse the response for `domain`. Never fails: an empty/null/malformed
/// body yields an empty site list, per the documented parser exception.
pub fn parse(domain: &str, bytes: &[u8]) -> SitesLinkingIn {
    let domain = normalize_domain(domain);

    let xml = match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(_) => return SitesLinkingIn { domain, sites: Vec::new() },
    };

    let envelope: Envelope = match quick_xml::de::from_str(xml) {
        Ok(e) => e,
        Err(_) => return SitesLinkingIn { domain, sites: Vec::new() },
    };

    let sites = envelope
        .result
        .and_then(|r| r.alexa)
        .and_then(|a| a.sites_linking_in)
        .map(|s| s.site.into_vec())
        .unwrap_or_default();

    SitesLinkingIn { domain, sites }
}

/// Drop entries whose `title` duplicates one already emitted, preserving
/// input order. A *by-title* dedup, not by URL (§8 testable property).
pub fn unique_titles(sites: &[Site]) -> Vec<Site> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for site in sites {
        let key = site.title.clone().unwrap_or_default();
        if seen.insert(key) {
            out.push(site.clone());
        }
    }
    out
}

impl SitesLinkingIn {
    pub fn vertex_payloads(&self) -> Vec<(&'static str, Record)> {
        unique_titles(&self.sites)
            .into_iter()
            .map(|site| {
                let key = model::url_key_full(&site.url);
                let mut rec = Record::new();
                rec.insert("_key".into(), Value::String(key));
                rec.insert("domain_linkingin".into(), Value::String(self.domain.clone()));
                (vertex::URL, rec)
            })
            .collect()
    }

    pub fn edge_payloads(&self) -> Vec<(&'static str, Record)> {
        unique_titles(&self.sites)
            .into_iter()
            .map(|site| {
                let key = model::url_key_full(&site.url);
                let mut rec = Record::new();
                rec.insert("_key".into(), Value::String(edge_key(&key, &self.domain)));
                rec.insert("_from".into(), Value::String(doc_id(vertex::URL, &key)));
                rec.insert("_to".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
                rec.insert("url".into(), Value::String(site.url));
                (edge::LINKS_INTO, rec)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(title: &str, url: &str) -> Site {
        Site { title: Some(title.to_string()), url: url.to_string() }
    }

    #[test]
    fn unique_titles_dedups_by_title_preserving_order() {
        let sites = vec![
            site("Blog A", "a.example.com/1"),
            site("Blog B", "b.example.com/1"),
            site("Blog A", "a.example.com/2"),
        ];
        let deduped = unique_titles(&sites);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "a.example.com/1");
        assert_eq!(deduped[1].url, "b.example.com/1");
    }

    #[test]
    fn empty_response_yields_empty_list_not_error() {
        let parsed = parse("feedblitz.com", b"not xml at all");
        assert!(parsed.sites.is_empty());
    }

    #[test]
    fn single_site_not_wrapped_as_array_is_accepted() {
        let xml = br#"
            <SitesLinkingInResult>
              <Alexa>
                <SitesLinkingIn>
                  <Site><Title>Only One</Title><Url>only.example.com</Url></Site>
                </SitesLinkingIn>
              </Alexa>
            </SitesLinkingInResult>
        "#;
        let parsed = parse("feedblitz.com", xml);
        assert_eq!(parsed.sites.len(), 1);
        assert_eq!(parsed.sites[0].title.as_deref(), Some("Only One"));
    }
}
