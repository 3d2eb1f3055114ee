//! Wide CSV assembly (§4.G): turn one seed domain's `TraversalResult`
//! into one or more comma-joined rows in `WideCsvColumn` order.
//!
//! Grounded on `domain_intel/reporter.py::Reporter` — `get_country_ranks`,
//! `get_sites_linking_in`, `get_geodns`, `_parse_traffic_history`,
//! `get_analyst_qas`, and `dump_wide_column_csv`'s cross-join of the four
//! ancillary lists against the base domain row.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use domain_intel_core::model::WideCsvColumn;
use domain_intel_graph::{countries::COUNTRY_CODES, PathStep, TraversalResult};

use crate::trend::{self, Direction, Metric, TrafficPoint};

type Row = HashMap<&'static str, String>;

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn field(record: &domain_intel_core::model::Record, key: &str) -> Option<String> {
    record.get(key).and_then(as_string)
}

fn country_name(code: &str) -> String {
    COUNTRY_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_default()
}

/// `§4.G step 1`: the domain's own fields, quote-doubled for `title`/`description`.
fn base_domain_row(seed: &domain_intel_core::model::Record) -> Row {
    let mut row = Row::new();
    row.insert(WideCsvColumn::Domain.header(), field(seed, "_key").unwrap_or_default());
    if let Some(v) = field(seed, "title") {
        row.insert(WideCsvColumn::Title.header(), quote(&v));
    }
    if let Some(v) = field(seed, "description") {
        row.insert(WideCsvColumn::Description.header(), quote(&v));
    }
    for (key, header) in [
        ("online_since", WideCsvColumn::OnlineSince.header()),
        ("median_load_time", WideCsvColumn::MedianLoadTime.header()),
        ("speed_percentile", WideCsvColumn::SpeedPercentile.header()),
        ("adult_content", WideCsvColumn::AdultContent.header()),
        ("links_in_count", WideCsvColumn::LinksInCount.header()),
        ("locale", WideCsvColumn::Locale.header()),
        ("encoding", WideCsvColumn::Encoding.header()),
        ("rank", WideCsvColumn::Rank.header()),
    ] {
        if let Some(v) = field(seed, key) {
            row.insert(header, v);
        }
    }
    row
}

/// `§4.G step 2`: one row per `ranked` edge reached from the seed.
fn country_ranks(paths: &[PathStep]) -> Vec<Row> {
    let mut out = Vec::new();
    for path in paths {
        for edge in &path.edges {
            let id = edge.get("_id").and_then(Value::as_str).unwrap_or("");
            if !id.starts_with("ranked/") {
                continue;
            }
            let to = edge.get("_to").and_then(Value::as_str).unwrap_or("");
            let code = to.rsplit('/').next().unwrap_or("").to_string();
            let mut row = Row::new();
            row.insert(WideCsvColumn::CountryCode.header(), code.clone());
            row.insert(WideCsvColumn::CountryName.header(), country_name(&code));
            row.insert(WideCsvColumn::CountryRank.header(), field(edge, "rank").unwrap_or_default());
            out.push(row);
        }
    }
    out
}

/// `§4.G step 2`: one row per `links_into` edge, pairing the edge's `url`
/// with the `domain_linkingin` attribute carried on the `url` vertex.
fn sites_linking_in(paths: &[PathStep]) -> Vec<Row> {
    let mut out = Vec::new();
    for path in paths {
        let Some(edge) = path.edges.first() else { continue };
        let id = edge.get("_id").and_then(Value::as_str).unwrap_or("");
        if !id.starts_with("links_into/") {
            continue;
        }
        let url = field(edge, "url").unwrap_or_default();
        for vertex in &path.vertices {
            if let Some(domain_linkingin) = field(vertex, "domain_linkingin") {
                let mut row = Row::new();
                row.insert(WideCsvColumn::UrlLinkingin.header(), quote(&url));
                row.insert(WideCsvColumn::DomainLinkingin.header(), domain_linkingin);
                out.push(row);
                break;
            }
        }
    }
    out
}

/// `§4.G step 2`: one row per `ipv4_resolves` edge, reading geolocation
/// attributes straight off the `ipv4` vertex in the same path.
fn ipv4_geodns(paths: &[PathStep]) -> Vec<Row> {
    let mut out = Vec::new();
    for path in paths {
        let Some(edge) = path.edges.first() else { continue };
        let id = edge.get("_id").and_then(Value::as_str).unwrap_or("");
        if !id.starts_with("ipv4_resolves/") {
            continue;
        }
        for vertex in &path.vertices {
            let vid = vertex.get("_id").and_then(Value::as_str).unwrap_or("");
            if !vid.starts_with("ipv4/") {
                continue;
            }
            let mut row = Row::new();
            row.insert(WideCsvColumn::Ipv4Addr.header(), field(vertex, "_key").unwrap_or_default());
            if let Some(v) = field(vertex, "org") {
                row.insert(WideCsvColumn::Ipv4Org.header(), quote(&v));
            }
            if let Some(v) = field(vertex, "isp") {
                row.insert(WideCsvColumn::Ipv4Isp.header(), quote(&v));
            }
            for (key, header) in [
                ("latitude", WideCsvColumn::Ipv4Latitude.header()),
                ("longitude", WideCsvColumn::Ipv4Longitude.header()),
                ("country_code", WideCsvColumn::Ipv4CountryCode.header()),
                ("country", WideCsvColumn::Ipv4Country.header()),
                ("continent_code", WideCsvColumn::Ipv4ContinentCode.header()),
                ("continent", WideCsvColumn::Ipv4Continent.header()),
            ] {
                if let Some(v) = field(vertex, key) {
                    row.insert(header, v);
                }
            }
            out.push(row);
            break;
        }
    }
    out
}

/// One day of a `traffic` vertex's `series`, with its numeric fields kept
/// as the raw strings the parser produced (empty, not zero, when absent)
/// and separately available as `Option<f64>` for trend computation.
struct SeriesDay {
    date: String,
    page_views_pm: String,
    page_views_user: String,
    rank: String,
    reach_pm: String,
}

fn parse_epoch(date: &str) -> Option<i64> {
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(naive.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

fn parse_f64(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        None
    } else {
        raw.parse().ok()
    }
}

fn traffic_series(paths: &[PathStep]) -> Vec<SeriesDay> {
    let mut out = Vec::new();
    for path in paths {
        let Some(edge) = path.edges.first() else { continue };
        let id = edge.get("_id").and_then(Value::as_str).unwrap_or("");
        if !id.starts_with("visit/") {
            continue;
        }
        for vertex in &path.vertices {
            let vid = vertex.get("_id").and_then(Value::as_str).unwrap_or("");
            if !vid.starts_with("traffic/") {
                continue;
            }
            let Some(Value::Array(series)) = vertex.get("series") else { continue };
            for day in series {
                out.push(SeriesDay {
                    date: day.get("date").and_then(Value::as_str).unwrap_or_default().to_string(),
                    page_views_pm: day.get("page_views_pm").and_then(Value::as_str).unwrap_or_default().to_string(),
                    page_views_user: day.get("page_views_user").and_then(Value::as_str).unwrap_or_default().to_string(),
                    rank: day.get("rank").and_then(Value::as_str).unwrap_or_default().to_string(),
                    reach_pm: day.get("reach_pm").and_then(Value::as_str).unwrap_or_default().to_string(),
                });
            }
        }
    }
    out
}

/// `§4.G step 2`: one ancillary row per traffic-series day.
fn traffic_csv_rows(days: &[SeriesDay]) -> Vec<Row> {
    days.iter()
        .map(|d| {
            let mut row = Row::new();
            if let Some(ts) = parse_epoch(&d.date) {
                row.insert(WideCsvColumn::TrafficTs.header(), ts.to_string());
            }
            row.insert(WideCsvColumn::TrafficPageViewsPm.header(), d.page_views_pm.clone());
            row.insert(WideCsvColumn::TrafficPageViewsUser.header(), d.page_views_user.clone());
            row.insert(WideCsvColumn::TrafficRank.header(), d.rank.clone());
            row.insert(WideCsvColumn::TrafficReach.header(), d.reach_pm.clone());
            row
        })
        .collect()
}

fn traffic_trend_points(days: &[SeriesDay]) -> Vec<TrafficPoint> {
    days.iter()
        .filter_map(|d| {
            let ts = parse_epoch(&d.date)?;
            Some(TrafficPoint {
                ts,
                page_views_per_million: parse_f64(&d.page_views_pm),
                rank: parse_f64(&d.rank),
            })
        })
        .collect()
}

const ANALYST_QAS_FIELDS: [(&str, WideCsvColumn); 8] = [
    ("p2p_magnet_links", WideCsvColumn::P2pMagnetLinks),
    ("links_to_torrents", WideCsvColumn::LinksToTorrents),
    ("links_to_osp", WideCsvColumn::LinksToOsp),
    ("search_feature", WideCsvColumn::SearchFeature),
    ("domain_down_or_parked", WideCsvColumn::DomainDownOrParked),
    ("has_rss_feed", WideCsvColumn::HasRssFeed),
    ("requires_login", WideCsvColumn::RequiresLogin),
    ("has_forum_or_comments", WideCsvColumn::HasForumOrComments),
];

fn normalize_yn(raw: &str) -> String {
    match raw.to_ascii_uppercase().as_str() {
        "Y" => "true".to_string(),
        "N" => "false".to_string(),
        _ => raw.to_string(),
    }
}

/// `§4.G step 2`: the eight analyst-QAS booleans, merged once into every
/// row (not cross-joined — a domain has at most one `analyst-qas` vertex).
fn analyst_qas_fields(paths: &[PathStep]) -> Row {
    let mut row = Row::new();
    'paths: for path in paths {
        let Some(edge) = path.edges.first() else { continue };
        let to = edge.get("_to").and_then(Value::as_str).unwrap_or("");
        if !to.starts_with("analyst-qas/") {
            continue;
        }
        for vertex in &path.vertices {
            let vid = vertex.get("_id").and_then(Value::as_str).unwrap_or("");
            if !vid.starts_with("analyst-qas/") {
                continue;
            }
            for (key, column) in ANALYST_QAS_FIELDS {
                if let Some(v) = field(vertex, key) {
                    row.insert(column.header(), normalize_yn(&v));
                }
            }
            break 'paths;
        }
    }
    row
}

fn render_row(row: &Row) -> String {
    WideCsvColumn::ALL
        .iter()
        .map(|c| row.get(c.header()).cloned().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// The CSV header line, in the frozen column order.
pub fn header() -> String {
    WideCsvColumn::ALL.iter().map(|c| c.header()).collect::<Vec<_>>().join(",")
}

/// `§4.G`: one or more CSV lines for a single seed domain's traversal.
/// `today` anchors the trend windows (§4.G step 4) — pass the actual
/// current date in production, a fixed date in tests.
pub fn build_wide_rows(traversal: &TraversalResult, today: NaiveDate) -> Vec<String> {
    let Some(seed) = traversal.vertices.first() else {
        return Vec::new();
    };

    let mut base = base_domain_row(seed);

    let series = traffic_series(&traversal.paths);
    let trend_points = traffic_trend_points(&series);
    for (column, metric, direction, months_back) in [
        (WideCsvColumn::Mnth1VisitsDt, Metric::PageViewsPerMillion, Direction::Downtrend, 0),
        (WideCsvColumn::Mnth1VisitsUt, Metric::PageViewsPerMillion, Direction::Uptrend, 0),
        (WideCsvColumn::Mnth3VisitsDt, Metric::PageViewsPerMillion, Direction::Downtrend, 2),
        (WideCsvColumn::Mnth3VisitsUt, Metric::PageViewsPerMillion, Direction::Uptrend, 2),
        (WideCsvColumn::Mnth1RankDt, Metric::Rank, Direction::Downtrend, 0),
        (WideCsvColumn::Mnth1RankUt, Metric::Rank, Direction::Uptrend, 0),
        (WideCsvColumn::Mnth3RankDt, Metric::Rank, Direction::Downtrend, 2),
        (WideCsvColumn::Mnth3RankUt, Metric::Rank, Direction::Uptrend, 2),
    ] {
        let delta = trend::compute_delta(&trend_points, metric, direction, months_back, today);
        base.insert(column.header(), delta.to_string());
    }

    for (header, value) in analyst_qas_fields(&traversal.paths) {
        base.insert(header, value);
    }

    let ancillary: Vec<Vec<Row>> = vec![
        country_ranks(&traversal.paths),
        sites_linking_in(&traversal.paths),
        ipv4_geodns(&traversal.paths),
        traffic_csv_rows(&series),
    ];

    let mut rows = Vec::new();
    for list in &ancillary {
        for extra in list {
            let mut row = base.clone();
            row.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
            rows.push(render_row(&row));
        }
    }

    if rows.is_empty() {
        rows.push(render_row(&base));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_intel_core::model::Record;
    use serde_json::json;

    fn rec(pairs: &[(&str, Value)]) -> Record {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.insert((*k).to_string(), v.clone());
        }
        r
    }

    #[test]
    fn domain_only_seed_yields_one_row_with_zeroed_trends() {
        let seed = rec(&[("_key", json!("example.com"))]);
        let traversal = TraversalResult { vertices: vec![seed], paths: Vec::new() };
        let rows = build_wide_rows(&traversal, NaiveDate::from_ymd_opt(2017, 8, 4).unwrap());
        assert_eq!(rows.len(), 1);
        let cols: Vec<&str> = rows[0].split(',').collect();
        assert_eq!(cols[0], "example.com");
        let mnth1_visits_dt_idx =
            WideCsvColumn::ALL.iter().position(|c| *c == WideCsvColumn::Mnth1VisitsDt).unwrap();
        assert_eq!(cols[mnth1_visits_dt_idx], "0");
    }

    #[test]
    fn country_rank_rows_cross_join_against_the_base_domain() {
        let seed = rec(&[("_key", json!("example.com"))]);
        let edge = rec(&[
            ("_id", json!("ranked/example.com:US")),
            ("_to", json!("country/US")),
            ("rank", json!(100)),
        ]);
        let path = PathStep { edges: vec![edge], vertices: vec![seed.clone()] };
        let traversal = TraversalResult { vertices: vec![seed], paths: vec![path] };
        let rows = build_wide_rows(&traversal, NaiveDate::from_ymd_opt(2017, 8, 4).unwrap());
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("US"));
    }

    #[test]
    fn title_and_description_are_quote_doubled() {
        let seed = rec(&[("_key", json!("example.com")), ("title", json!("A \"Great\" Site"))]);
        let traversal = TraversalResult { vertices: vec![seed], paths: Vec::new() };
        let rows = build_wide_rows(&traversal, NaiveDate::from_ymd_opt(2017, 8, 4).unwrap());
        assert!(rows[0].contains("\"A \"\"Great\"\" Site\""));
    }
}
