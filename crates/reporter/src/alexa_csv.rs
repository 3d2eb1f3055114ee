//! A simpler, non-graph CSV export of rank-info fields, independent of
//! the wide-column report's graph traversal (SPEC_FULL.md ambient
//! supplement). Grounded on
//! `domain_intel/awis/actions/urlinfo.py::alexa_csv_dump` /
//! `alexa_flattened_extract`, which reads straight off the flattened
//! ranking topic and writes two streams: one global-rank row per domain,
//! one country-rank row per `(domain, country)` pair. The original reads
//! raw flattened JSON off the topic directly; here the same two row
//! shapes are derived from an already-parsed `RankInfo` instead of
//! re-parsing the wire format a second time.

use domain_intel_parsers::rank_info::RankInfo;

pub const RANK_HEADER: &str = "domain,captured_at,rank";
pub const COUNTRY_RANK_HEADER: &str = "domain,captured_at,country_code,country_rank";

/// One row for the global-rank stream: `domain,captured_at,rank`.
/// `captured_at` is a caller-supplied POSIX timestamp, not re-derived
/// from wall-clock time inside this pure function.
pub fn rank_row(info: &RankInfo, captured_at: i64) -> String {
    format!("{},{},{}", info.domain, captured_at, info.rank.map(|r| r.to_string()).unwrap_or_default())
}

/// One row per country rank for the country-rank stream:
/// `domain,captured_at,country_code,country_rank`.
pub fn country_rows(info: &RankInfo, captured_at: i64) -> Vec<String> {
    info.country_ranks
        .iter()
        .map(|(code, rank)| format!("{},{},{},{}", info.domain, captured_at, code, rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RankInfo {
        RankInfo {
            domain: "feedblitz.com".into(),
            title: None,
            description: None,
            online_since: None,
            adult_content: false,
            links_in_count: None,
            locale: None,
            encoding: None,
            median_load_time: None,
            speed_percentile: None,
            rank: Some(53960),
            country_ranks: vec![("US".to_string(), 100)],
            related_links: Vec::new(),
            subdomains: Vec::new(),
        }
    }

    #[test]
    fn rank_row_has_domain_timestamp_and_rank() {
        assert_eq!(rank_row(&info(), 1490187600), "feedblitz.com,1490187600,53960");
    }

    #[test]
    fn country_rows_have_one_line_per_country() {
        let rows = country_rows(&info(), 1490187600);
        assert_eq!(rows, vec!["feedblitz.com,1490187600,US,100".to_string()]);
    }
}
