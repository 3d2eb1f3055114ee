//! Process-level `tracing` subscriber setup, shared by every binary.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a global `tracing` subscriber reading its filter from `RUST_LOG`,
/// defaulting to `info` when unset. Safe to call once per process; a second
/// call is a no-op (the underlying `set_global_default` error is swallowed).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
