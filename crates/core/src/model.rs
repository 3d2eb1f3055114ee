//! The property-graph data model shared by every crate: vertex/edge
//! collection names, the edge-definition table used to build the graph
//! schema, content-derived key helpers, and the frozen wide-CSV column
//! enumeration.

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

/// A graph document: any JSON object carrying at least a `_key`.
pub type Record = Map<String, Value>;

/// Vertex collection names, exactly as listed in the data model.
pub mod vertex {
    pub const DOMAIN: &str = "domain";
    pub const COUNTRY: &str = "country";
    pub const LINK: &str = "link";
    pub const SUBDOMAIN: &str = "subdomain";
    pub const URL: &str = "url";
    pub const IPV4: &str = "ipv4";
    pub const IPV6: &str = "ipv6";
    pub const TRAFFIC: &str = "traffic";
    pub const URL_INFO: &str = "url-info";
    pub const GEODNS: &str = "geodns";
    pub const ANALYST_QAS: &str = "analyst-qas";

    pub const ALL: &[&str] = &[
        DOMAIN, COUNTRY, LINK, SUBDOMAIN, URL, IPV4, IPV6, TRAFFIC, URL_INFO, GEODNS, ANALYST_QAS,
    ];
}

/// Edge collection names, exactly as listed in the data model.
pub mod edge {
    pub const RANKED: &str = "ranked";
    pub const RELATED: &str = "related";
    pub const CONTRIBUTE: &str = "contribute";
    pub const LINKS_INTO: &str = "links_into";
    pub const IPV4_RESOLVES: &str = "ipv4_resolves";
    pub const IPV6_RESOLVES: &str = "ipv6_resolves";
    pub const VISIT: &str = "visit";
    pub const MARKED: &str = "marked";
}

/// One `from -> to` edge definition, used to build the graph schema.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDefinition {
    pub name: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// The full edge-definition table from §3 of the data model.
pub const EDGE_DEFINITIONS: &[EdgeDefinition] = &[
    EdgeDefinition { name: edge::RANKED, from: vertex::DOMAIN, to: vertex::COUNTRY },
    EdgeDefinition { name: edge::RELATED, from: vertex::DOMAIN, to: vertex::LINK },
    EdgeDefinition { name: edge::CONTRIBUTE, from: vertex::SUBDOMAIN, to: vertex::DOMAIN },
    EdgeDefinition { name: edge::LINKS_INTO, from: vertex::URL, to: vertex::DOMAIN },
    EdgeDefinition { name: edge::IPV4_RESOLVES, from: vertex::DOMAIN, to: vertex::IPV4 },
    EdgeDefinition { name: edge::IPV6_RESOLVES, from: vertex::DOMAIN, to: vertex::IPV6 },
    EdgeDefinition { name: edge::VISIT, from: vertex::TRAFFIC, to: vertex::DOMAIN },
    EdgeDefinition { name: edge::MARKED, from: vertex::DOMAIN, to: vertex::ANALYST_QAS },
];

/// Build an edge key from its endpoint keys: `{from-key}:{to-key}`.
pub fn edge_key(from_key: &str, to_key: &str) -> String {
    format!("{from_key}:{to_key}")
}

/// Build a fully-qualified document id for use in `_from`/`_to` fields.
pub fn doc_id(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

/// Normalize a domain name with NFKD compatibility decomposition so that
/// differently-encoded representations of the same domain collapse to one
/// graph key (see Design Notes).
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().nfkd().collect::<String>()
}

/// Full 32-character lowercase MD5 hex digest of a URL. Used as the `url`
/// vertex key.
pub fn url_key_full(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

/// First 16 characters of the MD5 hex digest of a URL. Used as the `link`
/// vertex key.
pub fn url_key_short(url: &str) -> String {
    url_key_full(url)[..16].to_string()
}

/// Percentage string like `"12.5%"` to a float, stripping the trailing
/// percent sign. Returns `None` if the remainder doesn't parse.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    raw.trim().strip_suffix('%').unwrap_or(raw).trim().parse().ok()
}

/// The frozen ordered enumeration of wide-CSV columns (§6). Column order is
/// a breaking-change boundary for downstream ingest: additions must be a
/// suffix, and nothing here may be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WideCsvColumn {
    Domain,
    Title,
    Description,
    OnlineSince,
    MedianLoadTime,
    SpeedPercentile,
    AdultContent,
    LinksInCount,
    Locale,
    Encoding,
    Rank,
    CountryCode,
    CountryName,
    CountryRank,
    UrlLinkingin,
    DomainLinkingin,
    Ipv4Addr,
    Ipv4Org,
    Ipv4Isp,
    Ipv4Latitude,
    Ipv4Longitude,
    Ipv4CountryCode,
    Ipv4Country,
    Ipv4ContinentCode,
    Ipv4Continent,
    TrafficTs,
    TrafficPageViewsPm,
    TrafficPageViewsUser,
    TrafficRank,
    TrafficReach,
    Mnth1VisitsDt,
    Mnth1VisitsUt,
    Mnth3VisitsDt,
    Mnth3VisitsUt,
    Mnth1RankDt,
    Mnth1RankUt,
    Mnth3RankDt,
    Mnth3RankUt,
    P2pMagnetLinks,
    LinksToTorrents,
    LinksToOsp,
    SearchFeature,
    DomainDownOrParked,
    HasRssFeed,
    RequiresLogin,
    HasForumOrComments,
    AnalystQasDate,
}

impl WideCsvColumn {
    /// All columns, in the frozen order baked into the CSV header.
    pub const ALL: &'static [WideCsvColumn] = &[
        Self::Domain,
        Self::Title,
        Self::Description,
        Self::OnlineSince,
        Self::MedianLoadTime,
        Self::SpeedPercentile,
        Self::AdultContent,
        Self::LinksInCount,
        Self::Locale,
        Self::Encoding,
        Self::Rank,
        Self::CountryCode,
        Self::CountryName,
        Self::CountryRank,
        Self::UrlLinkingin,
        Self::DomainLinkingin,
        Self::Ipv4Addr,
        Self::Ipv4Org,
        Self::Ipv4Isp,
        Self::Ipv4Latitude,
        Self::Ipv4Longitude,
        Self::Ipv4CountryCode,
        Self::Ipv4Country,
        Self::Ipv4ContinentCode,
        Self::Ipv4Continent,
        Self::TrafficTs,
        Self::TrafficPageViewsPm,
        Self::TrafficPageViewsUser,
        Self::TrafficRank,
        Self::TrafficReach,
        Self::Mnth1VisitsDt,
        Self::Mnth1VisitsUt,
        Self::Mnth3VisitsDt,
        Self::Mnth3VisitsUt,
        Self::Mnth1RankDt,
        Self::Mnth1RankUt,
        Self::Mnth3RankDt,
        Self::Mnth3RankUt,
        Self::P2pMagnetLinks,
        Self::LinksToTorrents,
        Self::LinksToOsp,
        Self::SearchFeature,
        Self::DomainDownOrParked,
        Self::HasRssFeed,
        Self::RequiresLogin,
        Self::HasForumOrComments,
        Self::AnalystQasDate,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::Domain => "DOMAIN",
            Self::Title => "TITLE",
            Self::Description => "DESCRIPTION",
            Self::OnlineSince => "ONLINE_SINCE",
            Self::MedianLoadTime => "MEDIAN_LOAD_TIME",
            Self::SpeedPercentile => "SPEED_PERCENTILE",
            Self::AdultContent => "ADULT_CONTENT",
            Self::LinksInCount => "LINKS_IN_COUNT",
            Self::Locale => "LOCALE",
            Self::Encoding => "ENCODING",
            Self::Rank => "RANK",
            Self::CountryCode => "COUNTRY_CODE",
            Self::CountryName => "COUNTRY_NAME",
            Self::CountryRank => "COUNTRY_RANK",
            Self::UrlLinkingin => "URL_LINKINGIN",
            Self::DomainLinkingin => "DOMAIN_LINKINGIN",
            Self::Ipv4Addr => "IPV4_ADDR",
            Self::Ipv4Org => "IPV4_ORG",
            Self::Ipv4Isp => "IPV4_ISP",
            Self::Ipv4Latitude => "IPV4_LATITUDE",
            Self::Ipv4Longitude => "IPV4_LONGITUDE",
            Self::Ipv4CountryCode => "IPV4_COUNTRY_CODE",
            Self::Ipv4Country => "IPV4_COUNTRY",
            Self::Ipv4ContinentCode => "IPV4_CONTINENT_CODE",
            Self::Ipv4Continent => "IPV4_CONTINENT",
            Self::TrafficTs => "TRAFFIC_TS",
            Self::TrafficPageViewsPm => "TRAFFIC_PAGE_VIEWS_PM",
            Self::TrafficPageViewsUser => "TRAFFIC_PAGE_VIEWS_USER",
            Self::TrafficRank => "TRAFFIC_RANK",
            Self::TrafficReach => "TRAFFIC_REACH",
            Self::Mnth1VisitsDt => "MNTH_1_VISITS_DT",
            Self::Mnth1VisitsUt => "MNTH_1_VISITS_UT",
            Self::Mnth3VisitsDt => "MNTH_3_VISITS_DT",
            Self::Mnth3VisitsUt => "MNTH_3_VISITS_UT",
            Self::Mnth1RankDt => "MNTH_1_RANK_DT",
            Self::Mnth1RankUt => "MNTH_1_RANK_UT",
            Self::Mnth3RankDt => "MNTH_3_RANK_DT",
            Self::Mnth3RankUt => "MNTH_3_RANK_UT",
            Self::P2pMagnetLinks => "P2P_MAGNET_LINKS",
            Self::LinksToTorrents => "LINKS_TO_TORRENTS",
            Self::LinksToOsp => "LINKS_TO_OSP",
            Self::SearchFeature => "SEARCH_FEATURE",
            Self::DomainDownOrParked => "DOMAIN_DOWN_OR_PARKED",
            Self::HasRssFeed => "HAS_RSS_FEED",
            Self::RequiresLogin => "REQUIRES_LOGIN",
            Self::HasForumOrComments => "HAS_FORUM_OR_COMMENTS",
            Self::AnalystQasDate => "ANALYST_QAS_DATE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_key_full_is_32_hex_chars() {
        let k = url_key_full("http://example.com/page");
        assert_eq!(k.len(), 32);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn url_key_short_is_prefix_of_full() {
        let url = "http://example.com/page";
        assert_eq!(url_key_short(url), url_key_full(url)[..16]);
    }

    #[test]
    fn parse_percentage_strips_percent_sign() {
        assert_eq!(parse_percentage("12.5%"), Some(12.5));
        assert_eq!(parse_percentage("7"), Some(7.0));
        assert_eq!(parse_percentage("not-a-number"), None);
    }

    #[test]
    fn normalize_domain_collapses_nfkd_forms() {
        // "ä" as a single codepoint vs. "a" + combining diaeresis normalize
        // to the same NFKD string.
        let precomposed = "m\u{00fc}nchen.de";
        let decomposed = "mu\u{0308}nchen.de";
        assert_eq!(normalize_domain(precomposed), normalize_domain(decomposed));
    }

    #[test]
    fn edge_definitions_cover_all_eight_edges() {
        assert_eq!(EDGE_DEFINITIONS.len(), 8);
    }

    #[test]
    fn wide_csv_column_count_matches_all_slice() {
        assert_eq!(WideCsvColumn::ALL.len(), 47);
        assert_eq!(WideCsvColumn::ALL[0].header(), "DOMAIN");
        assert_eq!(WideCsvColumn::ALL.last().unwrap().header(), "ANALYST_QAS_DATE");
    }
}
