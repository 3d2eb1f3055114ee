//! The pipeline catalog (§4.E): a declarative table naming every stage,
//! its topics, its worker, its retry class, and its timeout. This is the
//! only place topic names are hard-coded — components receive topics via
//! configuration, resolved by looking a stage up here by name.
//!
//! Grounded on the module-level pipeline-construction functions in
//! `domain_intel/geodns/stages.py` (e.g. `slurp_domains_dns`,
//! `flatten_dns_raw`, `slurp_and_flatten_geodns`), generalised from one
//! hard-coded chain into a lookup table every stage binary reads from.

use serde::Serialize;

pub mod labels;
pub mod worker;

pub use labels::LabelTracker;
pub use worker::LabelWorker;

/// What a stage's worker resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerKind {
    /// A call out to an external collaborator (ranking API, geolocation
    /// API) — a black box per the data model's scope.
    ExternalResolver(&'static str),
    /// One of the response parsers in `domain_intel_parsers`.
    Parser(&'static str),
    /// A projection stage that transforms already-parsed records without
    /// calling out (labeling, traversal, report formatting).
    Projection(&'static str),
    /// The persist worker (§4.F) — writes to the graph store rather than
    /// a topic.
    Persist,
}

/// How many times, and under what condition, a stage retries a worker
/// failure before halting (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetryClass {
    /// The stage engine default: 10 attempts.
    Default,
    /// No retry — any worker error halts the stage immediately.
    None,
    /// An explicit attempt count for stages that need to diverge from
    /// the default (e.g. a slower external resolver).
    Custom(u32),
}

impl RetryClass {
    pub fn retry_count(&self) -> u32 {
        match self {
            RetryClass::Default => 10,
            RetryClass::None => 0,
            RetryClass::Custom(n) => *n,
        }
    }
}

/// One row of the catalog: a named stage and its full wiring.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageDefinition {
    pub name: &'static str,
    pub input_topics: &'static [&'static str],
    pub output_topics: &'static [&'static str],
    pub worker: WorkerKind,
    pub retry_class: RetryClass,
    pub timeout_secs: u64,
}

pub const PIPELINE: &[StageDefinition] = &[
    StageDefinition {
        name: "resolve-rank",
        input_topics: &["gtr-domains"],
        output_topics: &["alexa-results"],
        worker: WorkerKind::ExternalResolver("awis-url-info"),
        retry_class: RetryClass::Custom(5),
        timeout_secs: 60,
    },
    StageDefinition {
        name: "flatten-rank",
        input_topics: &["alexa-results"],
        output_topics: &["alexa-flattened"],
        worker: WorkerKind::Parser("rank_info"),
        retry_class: RetryClass::None,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "persist-rank",
        input_topics: &["alexa-flattened"],
        output_topics: &[],
        worker: WorkerKind::Persist,
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "resolve-sli",
        input_topics: &["sli-domains"],
        output_topics: &["alexa-sli-results"],
        worker: WorkerKind::ExternalResolver("awis-sites-linking-in"),
        retry_class: RetryClass::Custom(5),
        timeout_secs: 60,
    },
    StageDefinition {
        name: "persist-sli",
        input_topics: &["alexa-sli-results"],
        output_topics: &[],
        worker: WorkerKind::Persist,
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "resolve-traffic",
        input_topics: &["traffic-domains"],
        output_topics: &["alexa-traffic-results"],
        worker: WorkerKind::ExternalResolver("awis-traffic-history"),
        retry_class: RetryClass::Custom(5),
        timeout_secs: 60,
    },
    StageDefinition {
        name: "flatten-traffic",
        input_topics: &["alexa-traffic-results"],
        output_topics: &["alexa-traffic-flattened"],
        worker: WorkerKind::Parser("traffic_history"),
        retry_class: RetryClass::None,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "persist-traffic",
        input_topics: &["alexa-traffic-flattened"],
        output_topics: &[],
        worker: WorkerKind::Persist,
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "resolve-dns",
        input_topics: &["dns-domains"],
        output_topics: &["dns-raw"],
        worker: WorkerKind::ExternalResolver("dns-lookup"),
        retry_class: RetryClass::Custom(5),
        timeout_secs: 60,
    },
    StageDefinition {
        name: "parse-dns",
        input_topics: &["dns-raw"],
        output_topics: &["dns-parsed"],
        worker: WorkerKind::Parser("geodns"),
        retry_class: RetryClass::None,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "geolocate-dns",
        input_topics: &["dns-parsed"],
        output_topics: &["dns-geodns-parsed"],
        worker: WorkerKind::ExternalResolver("compass-geoip"),
        retry_class: RetryClass::Custom(5),
        timeout_secs: 60,
    },
    StageDefinition {
        name: "persist-geodns",
        input_topics: &["dns-geodns-parsed"],
        output_topics: &[],
        worker: WorkerKind::Persist,
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "persist-analyst-qas",
        input_topics: &["analyst-qas"],
        output_topics: &[],
        worker: WorkerKind::Persist,
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "label-domains",
        input_topics: &["gtr-domains", "sli-domains", "traffic-domains", "dns-domains"],
        output_topics: &["domain-labels"],
        worker: WorkerKind::Projection("domain-label"),
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "traverse-domains",
        input_topics: &["domain-labels"],
        output_topics: &["domain-traversals"],
        worker: WorkerKind::Projection("graph-traverse"),
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
    StageDefinition {
        name: "report-wide-csv",
        input_topics: &["domain-traversals"],
        output_topics: &["wide-column-csv"],
        worker: WorkerKind::Projection("wide-csv-report"),
        retry_class: RetryClass::Default,
        timeout_secs: 30,
    },
];

/// Look a stage up by name. Used by a stage binary to resolve its own
/// wiring at startup instead of hard-coding topics in the binary itself.
pub fn find(name: &str) -> Option<&'static StageDefinition> {
    PIPELINE.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_name_is_unique() {
        let mut names: Vec<&str> = PIPELINE.iter().map(|s| s.name).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn find_resolves_a_known_stage() {
        let stage = find("persist-rank").unwrap();
        assert_eq!(stage.worker, WorkerKind::Persist);
    }

    #[test]
    fn find_returns_none_for_unknown_stage() {
        assert!(find("does-not-exist").is_none());
    }

    #[test]
    fn retry_class_default_is_ten_attempts() {
        assert_eq!(RetryClass::Default.retry_count(), 10);
    }

    #[test]
    fn pipeline_inputs_cover_every_documented_topic() {
        let all_inputs: Vec<&str> =
            PIPELINE.iter().flat_map(|s| s.input_topics.iter().copied()).collect();
        for topic in ["gtr-domains", "sli-domains", "traffic-domains", "dns-domains", "analyst-qas"] {
            assert!(all_inputs.contains(&topic), "missing input topic {topic}");
        }
    }
}
