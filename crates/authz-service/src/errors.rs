use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Internal authorization error taxonomy.
///
/// These kinds exist for logging and metrics only. The caller-visible
/// contract is strictly binary: every variant renders as the same
/// generic 401 response so an untrusted caller cannot learn which
/// verification step failed (oracle prevention).
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The key-set discovery endpoint could not be reached or returned
    /// a document that is not well-formed JWKS.
    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// The token is structurally invalid (wrong segment count, bad
    /// base64url, unparseable header, missing kid).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// No key with the requested identifier exists in the key set,
    /// even after one forced refresh.
    #[error("No key matches kid {0:?}")]
    KeyNotFound(String),

    /// Cryptographic verification failed: signature mismatch, wrong or
    /// non-allowlisted algorithm, or malformed signature bytes.
    #[error("Signature verification failed: {0}")]
    InvalidSignature(String),

    /// The token's expiry is in the past and this is not a
    /// refresh-path invocation.
    #[error("Token is expired")]
    TokenExpired,

    /// A config-gated claim check (issuer, audience) did not match.
    #[error("Claim validation failed: {0}")]
    InvalidClaim(&'static str),

    /// Catch-all denial.
    #[error("Unauthorized")]
    Unauthorized,
}

impl AuthzError {
    /// Bounded label for the `authz_denials_total` metric.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            AuthzError::KeySetUnavailable(_) => "keyset_unavailable",
            AuthzError::MalformedToken(_) => "malformed_token",
            AuthzError::KeyNotFound(_) => "key_not_found",
            AuthzError::InvalidSignature(_) => "invalid_signature",
            AuthzError::TokenExpired => "token_expired",
            AuthzError::InvalidClaim(_) => "invalid_claim",
            AuthzError::Unauthorized => "unauthorized",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: &'static str,
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        // Every internal kind collapses to the same opaque response.
        // Distinguishing causes here would let an attacker probe which
        // verification step rejected the token.
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                message: "Unauthorized",
            }),
        )
            .into_response()
    }
}
