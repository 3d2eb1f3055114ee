//! Rank-info parser (§4.C): `UrlInfoResult/Alexa` payload from the ranking
//! resolver, covering site metadata, per-country ranks, outbound related
//! links, and contributing subdomains.

use domain_intel_core::model::{self, doc_id, edge, edge_key, normalize_domain, vertex, Record};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ParseError;
use crate::value::OneOrMany;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "UrlInfoResult")]
    url_info_result: UrlInfoResult,
}

#[derive(Debug, Deserialize)]
struct UrlInfoResult {
    #[serde(rename = "Alexa")]
    alexa: Alexa,
}

#[derive(Debug, Deserialize)]
struct Alexa {
    #[serde(rename = "ContentData")]
    content_data: Option<ContentData>,
    #[serde(rename = "TrafficData")]
    traffic_data: Option<TrafficData>,
}

#[derive(Debug, Deserialize)]
struct ContentData {
    #[serde(rename = "DataUrl")]
    data_url: String,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "OnlineSince")]
    online_since: Option<String>,
    #[serde(rename = "AdultContent")]
    adult_content: Option<String>,
    #[serde(rename = "Speed")]
    speed: Option<Speed>,
    #[serde(rename = "LinksInCount")]
    links_in_count: Option<u64>,
    #[serde(rename = "Lang")]
    lang: Option<Lang>,
    #[serde(rename = "RelatedLinks")]
    related_links: Option<RelatedLinks>,
}

#[derive(Debug, Deserialize)]
struct Speed {
    #[serde(rename = "MedianLoadTime")]
    median_load_time: Option<u64>,
    #[serde(rename = "Percentile")]
    percentile: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Lang {
    #[serde(rename = "Locale")]
    locale: Option<String>,
    #[serde(rename = "Encoding")]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedLinks {
    #[serde(rename = "Link", default)]
    link: OneOrMany<RelatedLink>,
}

#[derive(Debug, Deserialize)]
struct RelatedLink {
    #[serde(rename = "Href")]
    href: String,
    #[serde(rename = "Title")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrafficData {
    #[serde(rename = "Rank")]
    rank: Option<u64>,
    #[serde(rename = "RankByCountry")]
    rank_by_country: Option<RankByCountry>,
    #[serde(rename = "ContributingSubdomains")]
    contributing_subdomains: Option<ContributingSubdomains>,
}

#[derive(Debug, Deserialize)]
struct RankByCountry {
    #[serde(rename = "Country", default)]
    country: OneOrMany<CountryRank>,
}

#[derive(Debug, Deserialize)]
struct CountryRank {
    #[serde(rename = "Rank")]
    rank: u64,
    #[serde(rename = "Code")]
    code: String,
}

#[derive(Debug, Deserialize)]
struct ContributingSubdomains {
    #[serde(rename = "Subdomain", default)]
    subdomain: OneOrMany<Subdomain>,
}

#[derive(Debug, Deserialize)]
struct Subdomain {
    #[serde(rename = "DataUrl")]
    data_url: String,
    #[serde(rename = "MonthCount")]
    month_count: Option<u64>,
    #[serde(rename = "Reach")]
    reach: Option<Percentage>,
    #[serde(rename = "PageViews")]
    page_views: Option<PageViews>,
}

#[derive(Debug, Deserialize)]
struct Percentage {
    #[serde(rename = "PerMillion")]
    per_million: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageViews {
    #[serde(rename = "PerMillion")]
    per_million: Option<String>,
    #[serde(rename = "PerUser")]
    per_user: Option<String>,
}

/// Parsed rank-info document, projected onto graph-insert shapes.
#[derive(Debug)]
pub struct RankInfo {
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub online_since: Option<String>,
    pub adult_content: bool,
    pub links_in_count: Option<u64>,
    pub locale: Option<String>,
    pub encoding: Option<String>,
    pub median_load_time: Option<u64>,
    pub speed_percentile: Option<f64>,
    pub rank: Option<u64>,
    pub country_ranks: Vec<(String, u64)>,
    pub related_links: Vec<(String, Option<String>)>,
    pub subdomains: Vec<(String, Option<u64>, Option<f64>, Option<String>, Option<String>)>,
}

pub fn parse(bytes: &[u8]) -> Result<RankInfo, ParseError> {
    let xml = std::str::from_utf8(bytes).map_err(|e| ParseError::Xml(e.to_string()))?;
    let envelope: Envelope =
        quick_xml::de::from_str(xml).map_err(|e| ParseError::Xml(e.to_string()))?;
    let alexa = envelope.url_info_result.alexa;

    let content = alexa.content_data.ok_or_else(|| ParseError::MissingField("ContentData".into()))?;
    let domain = normalize_domain(&content.data_url);

    let adult_content = content
        .adult_content
        .as_deref()
        .map(|v| v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);

    let (locale, encoding) = content
        .lang
        .map(|l| (l.locale, l.encoding))
        .unwrap_or((None, None));

    let (median_load_time, speed_percentile) = content
        .speed
        .map(|s| (s.median_load_time, s.percentile))
        .unwrap_or((None, None));

    let related_links = content
        .related_links
        .map(|r| r.link.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|l| (l.href, l.title))
        .collect();

    let traffic = alexa.traffic_data;
    let rank = traffic.as_ref().and_then(|t| t.rank);

    let country_ranks = traffic
        .as_ref()
        .and_then(|t| t.rank_by_country.as_ref())
        .map(|r| match &r.country {
            OneOrMany::One(c) => vec![CountryRank { rank: c.rank, code: c.code.clone() }],
            OneOrMany::Many(cs) => cs
                .iter()
                .map(|c| CountryRank { rank: c.rank, code: c.code.clone() })
                .collect(),
            OneOrMany::None => Vec::new(),
        })
        .unwrap_or_default()
        .into_iter()
        .filter(|c| c.code != "O")
        .map(|c| (c.code, c.rank))
        .collect();

    let subdomains = traffic
        .as_ref()
        .and_then(|t| t.contributing_subdomains.as_ref())
        .map(|c| match &c.subdomain {
            OneOrMany::One(s) => vec![clone_subdomain(s)],
            OneOrMany::Many(ss) => ss.iter().map(clone_subdomain).collect(),
            OneOrMany::None => Vec::new(),
        })
        .unwrap_or_default()
        .into_iter()
        .filter(|s| s.data_url != "OTHER")
        .map(|s| {
            let reach_pct = s.reach.and_then(|r| r.per_million).and_then(|v| model::parse_percentage(&v));
            (s.data_url, s.month_count, reach_pct, s.page_views.as_ref().and_then(|p| p.per_million.clone()), s.page_views.and_then(|p| p.per_user))
        })
        .collect();

    Ok(RankInfo {
        domain,
        title: content.title,
        description: content.description,
        online_since: content.online_since,
        adult_content,
        links_in_count: content.links_in_count,
        locale,
        encoding,
        median_load_time,
        speed_percentile,
        rank,
        country_ranks,
        related_links,
        subdomains,
    })
}

fn clone_subdomain(s: &Subdomain) -> SubdomainOwned {
    SubdomainOwned {
        data_url: s.data_url.clone(),
        month_count: s.month_count,
        reach: s.reach.as_ref().and_then(|r| r.per_million.clone()).map(|v| Percentage { per_million: Some(v) }),
        page_views: s.page_views.as_ref().map(|p| PageViewsOwned {
            per_million: p.per_million.clone(),
            per_user: p.per_user.clone(),
        }),
    }
}

struct SubdomainOwned {
    data_url: String,
    month_count: Option<u64>,
    reach: Option<Percentage>,
    page_views: Option<PageViewsOwned>,
}

struct PageViewsOwned {
    per_million: Option<String>,
    per_user: Option<String>,
}

impl RankInfo {
    /// `domain` and `subdomain` vertex documents for this payload.
    pub fn vertex_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut out = Vec::new();

        let mut domain_rec = Record::new();
        domain_rec.insert("_key".into(), Value::String(self.domain.clone()));
        if let Some(t) = &self.title {
            domain_rec.insert("title".into(), Value::String(t.clone()));
        }
        if let Some(d) = &self.description {
            domain_rec.insert("description".into(), Value::String(d.clone()));
        }
        if let Some(o) = &self.online_since {
            domain_rec.insert("online_since".into(), Value::String(o.clone()));
        }
        domain_rec.insert("adult_content".into(), Value::Bool(self.adult_content));
        if let Some(n) = self.links_in_count {
            domain_rec.insert("links_in_count".into(), json!(n));
        }
        if let Some(l) = &self.locale {
            domain_rec.insert("locale".into(), Value::String(l.clone()));
        }
        if let Some(e) = &self.encoding {
            domain_rec.insert("encoding".into(), Value::String(e.clone()));
        }
        if let Some(m) = self.median_load_time {
            domain_rec.insert("median_load_time".into(), json!(m));
        }
        if let Some(p) = self.speed_percentile {
            domain_rec.insert("speed_percentile".into(), json!(p));
        }
        if let Some(r) = self.rank {
            domain_rec.insert("rank".into(), json!(r));
        }
        out.push((vertex::DOMAIN, domain_rec));

        for (key, _href) in &self.related_links {
            let link_key = model::url_key_short(key);
            let mut rec = Record::new();
            rec.insert("_key".into(), Value::String(link_key));
            rec.insert("url".into(), Value::String(key.clone()));
            out.push((vertex::LINK, rec));
        }

        for (host, month_count, reach_pct, pv_million, pv_user) in &self.subdomains {
            let mut rec = Record::new();
            rec.insert("_key".into(), Value::String(host.clone()));
            if let Some(m) = month_count {
                rec.insert("month_count".into(), json!(m));
            }
            if let Some(r) = reach_pct {
                rec.insert("reach_pct".into(), json!(r));
            }
            if let Some(v) = pv_million {
                rec.insert("page_views_pm".into(), Value::String(v.clone()));
            }
            if let Some(v) = pv_user {
                rec.insert("page_views_per_user".into(), Value::String(v.clone()));
            }
            out.push((vertex::SUBDOMAIN, rec));
        }

        out
    }

    /// `ranked`, `related`, and `contribute` edges emitted for this payload.
    pub fn edge_payloads(&self) -> Vec<(&'static str, Record)> {
        let mut out = Vec::new();

        for (code, rank) in &self.country_ranks {
            let mut rec = Record::new();
            rec.insert("_key".into(), Value::String(edge_key(&self.domain, code)));
            rec.insert("_from".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
            rec.insert("_to".into(), Value::String(doc_id(vertex::COUNTRY, code)));
            rec.insert("rank".into(), json!(rank));
            out.push((edge::RANKED, rec));
        }

        for (url, title) in &self.related_links {
            let link_key = model::url_key_short(url);
            let mut rec = Record::new();
            rec.insert("_key".into(), Value::String(edge_key(&self.domain, &link_key)));
            rec.insert("_from".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
            rec.insert("_to".into(), Value::String(doc_id(vertex::LINK, &link_key)));
            rec.insert("url".into(), Value::String(url.clone()));
            if let Some(t) = title {
                rec.insert("title".into(), Value::String(t.clone()));
            }
            out.push((edge::RELATED, rec));
        }

        for (host, ..) in &self.subdomains {
            let mut rec = Record::new();
            rec.insert("_key".into(), Value::String(edge_key(host, &self.domain)));
            rec.insert("_from".into(), Value::String(doc_id(vertex::SUBDOMAIN, host)));
            rec.insert("_to".into(), Value::String(doc_id(vertex::DOMAIN, &self.domain)));
            out.push((edge::CONTRIBUTE, rec));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <UrlInfoResult>
          <Alexa>
            <ContentData>
              <DataUrl>feedblitz.com</DataUrl>
              <Title>FeedBlitz</Title>
              <AdultContent>no</AdultContent>
              <LinksInCount>12</LinksInCount>
              <RelatedLinks>
                <Link><Href>example.com</Href><Title>Example</Title></Link>
              </RelatedLinks>
            </ContentData>
            <TrafficData>
              <Rank>53960</Rank>
              <RankByCountry>
                <Country><Rank>100</Rank><Code>US</Code></Country>
                <Country><Rank>200</Rank><Code>O</Code></Country>
              </RankByCountry>
              <ContributingSubdomains>
                <Subdomain><DataUrl>www.feedblitz.com</DataUrl><MonthCount>3</MonthCount></Subdomain>
                <Subdomain><DataUrl>OTHER</DataUrl></Subdomain>
              </ContributingSubdomains>
            </TrafficData>
          </Alexa>
        </UrlInfoResult>
    "#;

    #[test]
    fn parses_domain_and_rank() {
        let parsed = parse(FIXTURE.as_bytes()).unwrap();
        assert_eq!(parsed.domain, "feedblitz.com");
        assert_eq!(parsed.rank, Some(53960));
        assert!(!parsed.adult_content);
    }

    #[test]
    fn drops_country_code_o() {
        let parsed = parse(FIXTURE.as_bytes()).unwrap();
        assert_eq!(parsed.country_ranks, vec![("US".to_string(), 100)]);
    }

    #[test]
    fn drops_other_subdomain() {
        let parsed = parse(FIXTURE.as_bytes()).unwrap();
        assert_eq!(parsed.subdomains.len(), 1);
        assert_eq!(parsed.subdomains[0].0, "www.feedblitz.com");
    }

    #[test]
    fn related_link_becomes_link_vertex_and_related_edge() {
        let parsed = parse(FIXTURE.as_bytes()).unwrap();
        let vertices = parsed.vertex_payloads();
        assert!(vertices.iter().any(|(c, _)| *c == vertex::LINK));
        let edges = parsed.edge_payloads();
        assert!(edges.iter().any(|(c, _)| *c == edge::RELATED));
    }
}
