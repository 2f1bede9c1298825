//! Verified-payload claims and temporal/contextual validation.
//!
//! A [`Claims`] value only ever comes out of the signature verifier,
//! and a [`ValidatedClaims`] only out of [`validate`]. The decision
//! builder accepts nothing else, so claim extraction, validation, and
//! decision building cannot be reordered by a call-site mistake.

use crate::errors::AuthzError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded token payload, trusted only after signature verification.
///
/// Beyond the claims this service consumes (`sub`, `exp`, and the
/// config-gated `iss`/`aud`), everything else in the payload is passed
/// through opaquely.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier; becomes the decision's principal.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issuer, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience, when present. A string or an array of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// Remaining claims, carried opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `sub` field identifies a caller and stays out of logs.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .finish()
    }
}

/// Context for one validation pass.
///
/// `is_refresh` is an explicit flag supplied by the caller, never
/// inferred from resource names: the refresh path intentionally
/// accepts an expired token solely so a new one can be minted.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub is_refresh: bool,
    /// When set, `iss` must equal this value.
    pub expected_issuer: Option<String>,
    /// When set, `aud` must contain this value.
    pub expected_audience: Option<String>,
}

/// Claims that have passed temporal and contextual validation.
///
/// Only obtainable through [`validate`]; consumed by the decision
/// builder.
#[derive(Debug, Clone)]
pub struct ValidatedClaims(Claims);

impl ValidatedClaims {
    /// The principal the decision will be issued for.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.0.sub
    }

    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

/// Validate claims against the current time and the supplied context.
///
/// # Errors
///
/// - `TokenExpired` when `exp` is in the past and the context is not a
///   refresh-path invocation
/// - `InvalidClaim` when a config-gated issuer/audience check fails
pub fn validate(claims: Claims, ctx: &ValidationContext) -> Result<ValidatedClaims, AuthzError> {
    validate_at(claims, ctx, chrono::Utc::now().timestamp())
}

/// Deterministic validation against an explicit `now` timestamp.
///
/// Prefer [`validate`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock
/// dependence.
pub(crate) fn validate_at(
    claims: Claims,
    ctx: &ValidationContext,
    now: i64,
) -> Result<ValidatedClaims, AuthzError> {
    if now > claims.exp && !ctx.is_refresh {
        tracing::debug!(
            target: "authz.claims",
            exp = claims.exp,
            now = now,
            "Token rejected: expired"
        );
        return Err(AuthzError::TokenExpired);
    }

    if let Some(expected) = &ctx.expected_issuer {
        if claims.iss.as_deref() != Some(expected.as_str()) {
            tracing::debug!(target: "authz.claims", "Token rejected: issuer mismatch");
            return Err(AuthzError::InvalidClaim("iss"));
        }
    }

    if let Some(expected) = &ctx.expected_audience {
        if !audience_matches(claims.aud.as_ref(), expected) {
            tracing::debug!(target: "authz.claims", "Token rejected: audience mismatch");
            return Err(AuthzError::InvalidClaim("aud"));
        }
    }

    Ok(ValidatedClaims(claims))
}

/// Audience is a string or an array of strings per the token format.
fn audience_matches(aud: Option<&serde_json::Value>, expected: &str) -> bool {
    match aud {
        Some(serde_json::Value::String(s)) => s == expected,
        Some(serde_json::Value::Array(values)) => values
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s == expected)),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn claims_expiring_at(exp: i64) -> Claims {
        Claims {
            sub: "u1".to_string(),
            exp,
            iss: None,
            aud: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_valid_expiry_accepted() {
        let claims = claims_expiring_at(NOW + 3600);
        let validated = validate_at(claims, &ValidationContext::default(), NOW).unwrap();
        assert_eq!(validated.principal(), "u1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = claims_expiring_at(NOW - 1);
        let result = validate_at(claims, &ValidationContext::default(), NOW);
        assert!(matches!(result, Err(AuthzError::TokenExpired)));
    }

    #[test]
    fn test_exp_equal_to_now_accepted() {
        // Strict comparison: the token is expired only once `now`
        // passes `exp`.
        let claims = claims_expiring_at(NOW);
        assert!(validate_at(claims, &ValidationContext::default(), NOW).is_ok());
    }

    #[test]
    fn test_refresh_context_accepts_expired_token() {
        let claims = claims_expiring_at(NOW - 3600);
        let ctx = ValidationContext {
            is_refresh: true,
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_ok());
    }

    #[test]
    fn test_refresh_context_accepts_valid_token_too() {
        let claims = claims_expiring_at(NOW + 3600);
        let ctx = ValidationContext {
            is_refresh: true,
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_ok());
    }

    #[test]
    fn test_issuer_check_disabled_by_default() {
        let claims = claims_expiring_at(NOW + 60);
        assert!(validate_at(claims, &ValidationContext::default(), NOW).is_ok());
    }

    #[test]
    fn test_issuer_mismatch_rejected_when_enforced() {
        let mut claims = claims_expiring_at(NOW + 60);
        claims.iss = Some("https://other.example.com".to_string());
        let ctx = ValidationContext {
            expected_issuer: Some("https://issuer.example.com".to_string()),
            ..ValidationContext::default()
        };
        let result = validate_at(claims, &ctx, NOW);
        assert!(matches!(result, Err(AuthzError::InvalidClaim("iss"))));
    }

    #[test]
    fn test_issuer_match_accepted_when_enforced() {
        let mut claims = claims_expiring_at(NOW + 60);
        claims.iss = Some("https://issuer.example.com".to_string());
        let ctx = ValidationContext {
            expected_issuer: Some("https://issuer.example.com".to_string()),
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_ok());
    }

    #[test]
    fn test_missing_issuer_rejected_when_enforced() {
        let claims = claims_expiring_at(NOW + 60);
        let ctx = ValidationContext {
            expected_issuer: Some("https://issuer.example.com".to_string()),
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_err());
    }

    #[test]
    fn test_audience_string_match() {
        let mut claims = claims_expiring_at(NOW + 60);
        claims.aud = Some(serde_json::json!("client-1"));
        let ctx = ValidationContext {
            expected_audience: Some("client-1".to_string()),
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_ok());
    }

    #[test]
    fn test_audience_array_match() {
        let mut claims = claims_expiring_at(NOW + 60);
        claims.aud = Some(serde_json::json!(["other", "client-1"]));
        let ctx = ValidationContext {
            expected_audience: Some("client-1".to_string()),
            ..ValidationContext::default()
        };
        assert!(validate_at(claims, &ctx, NOW).is_ok());
    }

    #[test]
    fn test_audience_mismatch_rejected() {
        let mut claims = claims_expiring_at(NOW + 60);
        claims.aud = Some(serde_json::json!(["other"]));
        let ctx = ValidationContext {
            expected_audience: Some("client-1".to_string()),
            ..ValidationContext::default()
        };
        let result = validate_at(claims, &ctx, NOW);
        assert!(matches!(result, Err(AuthzError::InvalidClaim("aud"))));
    }

    #[test]
    fn test_expiry_checked_before_hardening() {
        // An expired token with a bad issuer reports the expiry.
        let mut claims = claims_expiring_at(NOW - 1);
        claims.iss = Some("https://other.example.com".to_string());
        let ctx = ValidationContext {
            expected_issuer: Some("https://issuer.example.com".to_string()),
            ..ValidationContext::default()
        };
        let result = validate_at(claims, &ctx, NOW);
        assert!(matches!(result, Err(AuthzError::TokenExpired)));
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims = claims_expiring_at(NOW);
        let debug_str = format!("{claims:?}");
        assert!(!debug_str.contains("u1"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_extra_claims_pass_through() {
        let json = serde_json::json!({
            "sub": "u1",
            "exp": NOW + 60,
            "token_use": "access",
            "custom:tier": "gold"
        });
        let claims: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(
            claims.extra.get("token_use").and_then(|v| v.as_str()),
            Some("access")
        );
        assert_eq!(
            claims.extra.get("custom:tier").and_then(|v| v.as_str()),
            Some("gold")
        );
    }
}
