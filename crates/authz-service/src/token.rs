//! Compact signed-token parsing.
//!
//! Splits a three-segment `header.payload.signature` token and decodes
//! ONLY the header. The payload segment is kept raw until signature
//! verification succeeds, so no claim content is ever acted on before
//! the signature has been checked.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (denial-of-service
//!   prevention; oversized input is rejected with no base64 work done)
//! - The decoded header is trusted for exactly one purpose: selecting
//!   the verification key by `kid`. The declared algorithm is only a
//!   cross-check input for the verifier, never an authority.

use crate::errors::AuthzError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// Maximum allowed token size in bytes (8KB).
///
/// Typical signed tokens are 200-500 bytes; 8KB allows for generous
/// claim growth while rejecting resource-exhaustion payloads before
/// any decode or cryptographic work.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Decoded first segment of a compact token.
///
/// Never trusted for authorization decisions beyond key selection.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    /// Algorithm name declared by the token. Cross-checked against the
    /// matched key record by the verifier.
    pub alg: String,
    /// Identifier of the signing key within the issuer's key set.
    pub kid: String,
}

/// A structurally valid token, split into its segments.
///
/// `payload_segment` and `signature_segment` remain base64url text;
/// only the verifier turns the payload into claims, and only after the
/// signature checks out.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    pub raw: &'a str,
    pub header: TokenHeader,
    pub payload_segment: &'a str,
    pub signature_segment: &'a str,
}

/// Split a compact token and decode its header.
///
/// # Errors
///
/// Returns `AuthzError::MalformedToken` if the token is oversized,
/// does not have exactly three dot-separated segments, or the first
/// segment does not decode to a header carrying `alg` and `kid`.
pub fn parse(token: &str) -> Result<ParsedToken<'_>, AuthzError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "authz.token",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(AuthzError::MalformedToken("token too large".to_string()));
    }

    let mut segments = token.split('.');
    let (header_segment, payload_segment, signature_segment) =
        match (segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s)) if segments.next().is_none() => (h, p, s),
            _ => {
                tracing::debug!(target: "authz.token", "Token rejected: not three segments");
                return Err(AuthzError::MalformedToken(
                    "expected three dot-separated segments".to_string(),
                ));
            }
        };

    if payload_segment.is_empty() || signature_segment.is_empty() {
        return Err(AuthzError::MalformedToken("empty segment".to_string()));
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(header_segment).map_err(|e| {
        tracing::debug!(target: "authz.token", error = %e, "Failed to decode token header base64");
        AuthzError::MalformedToken("header is not valid base64url".to_string())
    })?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "authz.token", error = %e, "Failed to parse token header JSON");
        AuthzError::MalformedToken("header is not a valid structure".to_string())
    })?;

    if header.kid.is_empty() {
        return Err(AuthzError::MalformedToken("empty kid".to_string()));
    }

    Ok(ParsedToken {
        raw: token,
        header,
        payload_segment,
        signature_segment,
    })
}
