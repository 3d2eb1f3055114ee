//! HTTP router construction: process wiring for the pipeline's
//! operational surface (health, readiness, catalog introspection). The
//! pipeline stages themselves run as `domain_intel_cli run-stage`
//! processes, not as routes on this server.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/ready", get(api::ready))
        .route("/pipeline", get(api::pipeline))
        .route("/config", get(api::config))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_route_returns_200() {
        let state = AppState::new(domain_intel_core::config::Config::for_profile(""));
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
