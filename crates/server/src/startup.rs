//! Server startup: wait for the broker's configured topics to exist, then
//! hand back a ready-to-serve `AppState`. Grounded on `build_app_state`'s
//! role in the teacher, trimmed to what a health/status-only process
//! needs — no background scheduler, no segment loader.

use std::sync::Arc;

use tracing::info;

use domain_intel_broker::wait_until_ready;
use domain_intel_core::config::Config;

use crate::state::AppState;

pub async fn build_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    if !config.broker.topics.is_empty() {
        let expected = domain_intel_broker::topic_names(&config.broker.topics);
        info!(bootstrap = %config.broker.bootstrap_servers, topics = ?expected, "waiting for broker readiness");
        wait_until_ready(&config.broker.bootstrap_servers, &expected, 10).await?;
    }

    Ok(AppState::new(config))
}
