use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Load a `.env` file if present (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{profile}_{key}");
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Search, in order, `$DIS_CONF`, `/etc/domainintel/config.json`, and
/// `config/dev.json` relative to the working directory. Mirrors
/// `domain_intel.common.CONFIG_LOCATIONS` from the original implementation.
fn discover_config_file() -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = vec![
        env::var("DIS_CONF").ok().map(PathBuf::from),
        Some(PathBuf::from("/etc/domainintel/config.json")),
        Some(PathBuf::from("config/dev.json")),
    ]
    .into_iter()
    .flatten()
    .collect();

    candidates.into_iter().find(|p| p.is_file())
}

fn load_config_file() -> Value {
    match discover_config_file() {
        Some(path) => match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config file, ignoring");
                Value::Null
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file, ignoring");
                Value::Null
            }
        },
        None => Value::Null,
    }
}

fn file_str(file: &Value, key: &str) -> Option<String> {
    file.get(key).and_then(Value::as_str).map(str::to_string)
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub broker: BrokerConfig,
    pub graph: GraphConfig,
    pub upstream: UpstreamConfig,
    pub report: ReportConfig,
}

const PROFILE_MARKER_KEYS: &[&str] = &["BOOTSTRAP_SERVERS", "ARANGO_HOST", "AWIS_ACCESS_KEY_ID"];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DIS_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DIS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let file = load_config_file();
        Self {
            profile: p.to_string(),
            broker: BrokerConfig::from_env_profiled(p, &file),
            graph: GraphConfig::from_env_profiled(p, &file),
            upstream: UpstreamConfig::from_env_profiled(p, &file),
            report: ReportConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{marker}")) {
                    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  broker:   bootstrap_servers={}", self.broker.bootstrap_servers);
        tracing::info!("  graph:    host={}:{}", self.graph.host, self.graph.port);
        tracing::info!("  upstream: awis_configured={}, compass_configured={}",
            self.upstream.is_awis_configured(), self.upstream.is_compass_configured());
        tracing::info!("  report:   output_dir={}", self.report.output_dir.display());
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "broker": {
                "bootstrap_servers": self.broker.bootstrap_servers,
                "timeout_ms": self.broker.timeout_ms,
                "threads": self.broker.threads,
            },
            "graph": {
                "host": self.graph.host,
                "port": self.graph.port,
                "database": self.graph.database,
                "configured": self.graph.is_configured(),
            },
            "upstream": {
                "awis_configured": self.upstream.is_awis_configured(),
                "compass_configured": self.upstream.is_compass_configured(),
            },
            "report": { "output_dir": self.report.output_dir },
        })
    }
}

// ── Broker ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub bootstrap_servers: String,
    /// Consumer poll timeout in milliseconds.
    pub timeout_ms: u64,
    /// Per-stage worker count.
    pub threads: u32,
    /// `name:partitions:replication` entries, used only for bootstrap readiness checks.
    pub topics: Vec<String>,
}

impl BrokerConfig {
    fn from_env_profiled(p: &str, file: &Value) -> Self {
        let topics = profiled_env_opt(p, "TOPICS")
            .or_else(|| file_str(file, "topics"))
            .unwrap_or_default();
        Self {
            bootstrap_servers: profiled_env_opt(p, "BOOTSTRAP_SERVERS")
                .or_else(|| file_str(file, "bootstrap_servers"))
                .unwrap_or_else(|| "localhost:9092".to_string()),
            timeout_ms: profiled_env_u64(p, "TIMEOUT", 10_000),
            threads: profiled_env_u32(p, "THREADS", 1),
            topics: topics.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
        }
    }
}

// ── Graph store ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub dry: bool,
}

impl GraphConfig {
    fn from_env_profiled(p: &str, file: &Value) -> Self {
        Self {
            host: profiled_env_opt(p, "ARANGO_HOST")
                .or_else(|| file_str(file, "arango_host"))
                .unwrap_or_else(|| "localhost".to_string()),
            port: profiled_env_u16(p, "ARANGO_PORT", 8529),
            username: profiled_env_opt(p, "ARANGO_USERNAME"),
            password: profiled_env_opt(p, "ARANGO_PASSWORD"),
            database: profiled_env_or(p, "ARANGO_DATABASE", "domain_intel"),
            dry: profiled_env_or(p, "DRY", "false") == "true",
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── Upstream resolver credentials ─────────────────────────────────

/// Out of scope per spec.md §1 — the resolvers themselves are black boxes —
/// but the stage engine still needs these to construct worker closures, so
/// the credentials live in config even though no resolver ships here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub awis_access_key_id: Option<String>,
    pub awis_secret_access_key: Option<String>,
    pub compass_username: Option<String>,
    pub compass_password: Option<String>,
}

impl UpstreamConfig {
    fn from_env_profiled(p: &str, file: &Value) -> Self {
        Self {
            awis_access_key_id: profiled_env_opt(p, "AWIS_ACCESS_KEY_ID")
                .or_else(|| file_str(file, "awis.access_key_id")),
            awis_secret_access_key: profiled_env_opt(p, "AWIS_SECRET_ACCESS_KEY")
                .or_else(|| file_str(file, "awis.secret_access_key")),
            compass_username: profiled_env_opt(p, "GEODNS_COMPASS_USERNAME")
                .or_else(|| file_str(file, "geodns.compass.username")),
            compass_password: profiled_env_opt(p, "GEODNS_COMPASS_PASSWORD")
                .or_else(|| file_str(file, "geodns.compass.password")),
        }
    }

    pub fn is_awis_configured(&self) -> bool {
        self.awis_access_key_id.is_some() && self.awis_secret_access_key.is_some()
    }

    pub fn is_compass_configured(&self) -> bool {
        self.compass_username.is_some() && self.compass_password.is_some()
    }
}

// ── Reporter ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub filename_pattern: String,
}

impl ReportConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            output_dir: PathBuf::from(profiled_env_or(p, "REPORT_OUTPUT_DIR", "reports")),
            filename_pattern: profiled_env_or(p, "REPORT_FILENAME_PATTERN", "wide-column-{date}.csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        // SAFETY: test runs single-threaded for env mutation purposes via serial execution
        // of the default test harness; no other test in this module touches these keys.
        let cfg = Config::for_profile("");
        assert_eq!(cfg.broker.bootstrap_servers, "localhost:9092");
        assert_eq!(cfg.broker.timeout_ms, 10_000);
        assert_eq!(cfg.graph.port, 8529);
        assert!(!cfg.graph.is_configured());
    }

    #[test]
    fn profile_label_falls_back_to_default() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
    }

    #[test]
    fn topics_list_parses_comma_separated_entries() {
        std::env::set_var("TEST_PROFILE_TOPICS", "a:1:1,b:2:1");
        let v = profiled_env_opt("TEST_PROFILE", "TOPICS").unwrap();
        let parsed: Vec<&str> = v.split(',').collect();
        assert_eq!(parsed, vec!["a:1:1", "b:2:1"]);
        std::env::remove_var("TEST_PROFILE_TOPICS");
    }
}
