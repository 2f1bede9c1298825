//! Authorization check endpoint.
//!
//! # Security
//!
//! The response contract is strictly binary: a decision document on
//! success, `401 {"message":"Unauthorized"}` on any failure. The body
//! never says which check rejected the token.

use crate::errors::AuthzError;
use crate::observability::metrics::record_denial;
use crate::pipeline::{AuthorizationPipeline, AuthzOutcome, CheckRequest};
use crate::policy::AuthorizationDecision;
use axum::extract::State;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub pipeline: AuthorizationPipeline,
    pub metrics: PrometheusHandle,
}

/// Wire shape of an authorization check request.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// Compact signed token, exactly as presented by the caller.
    pub token: String,
    /// Target resource identifier; absent for diagnostic callers.
    #[serde(default)]
    pub method_arn: Option<String>,
    /// Refresh-path invocations accept an expired token.
    #[serde(default)]
    pub is_refresh: bool,
}

/// Handler for POST /v1/authorize
///
/// # Response
///
/// - `200 OK` with the decision document when authorized
/// - `401 Unauthorized` with an opaque body otherwise
#[tracing::instrument(skip_all, name = "authz.check")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthorizeRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<AuthorizationDecision>, AuthzError> {
    // A body that does not parse is treated the same as any other bad
    // input, not surfaced as a 400 with framework detail.
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(target: "authz.http", error = %e, "Rejected unparseable request body");
        record_denial(AuthzError::Unauthorized.category());
        AuthzError::Unauthorized
    })?;

    let outcome = state
        .pipeline
        .check(CheckRequest {
            token: &request.token,
            resource: request.method_arn.as_deref(),
            is_refresh: request.is_refresh,
        })
        .await;

    match outcome {
        AuthzOutcome::Authorized(decision) => Ok(Json(decision)),
        AuthzOutcome::Denied => Err(AuthzError::Unauthorized),
    }
}
