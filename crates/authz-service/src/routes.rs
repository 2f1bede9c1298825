use crate::handlers::{authorize, metrics};
use crate::middleware::http_metrics::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use crate::handlers::authorize::AppState;

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Authorization check endpoint
        .route("/v1/authorize", post(authorize::authorize))
        // Prometheus scrape endpoint
        .route("/metrics", get(metrics::metrics))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        // Tracing, then metrics outermost so framework errors count
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

async fn health_check() -> &'static str {
    "OK"
}
