mod api;
mod router;
mod startup;
mod state;

use tracing::info;

fn load_config() -> domain_intel_core::Config {
    domain_intel_core::config::load_dotenv();
    domain_intel_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    domain_intel_core::logging::init();

    let config = load_config();
    config.log_summary();

    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state);

    let addr = std::env::var("DIS_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "domain-intel server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
