//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape
//! metrics. No PII or secrets are exposed; only operational data with
//! bounded cardinality labels.

use crate::handlers::authorize::AppState;
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping. Operational
/// endpoint, not versioned under /v1.
#[tracing::instrument(skip_all, name = "authz.metrics.scrape")]
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.render()
}
