//! Signature verification against an issuer's key set.
//!
//! The verification algorithm is anchored on the MATCHED KEY RECORD,
//! never on the token header alone: the header's declared algorithm is
//! only cross-checked against what the key record expects, and both
//! must be on a fixed allowlist. This closes algorithm-confusion
//! attacks (`none`, RSA-key-as-HMAC-secret, and friends) — a token
//! cannot talk its way into a weaker scheme than the key was published
//! for.
//!
//! Claims come out of this module and nowhere else: the payload
//! segment is decoded only after the signature over the canonical
//! header+payload bytes checks out.

use crate::claims::Claims;
use crate::errors::AuthzError;
use crate::keyset::{KeyRecord, KeySet};
use crate::token::ParsedToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use tracing::instrument;

/// Resolve the algorithm a key record was published for.
///
/// Prefers the record's explicit `alg`; falls back to the key type.
/// Anything outside the allowlist is rejected.
fn expected_algorithm(key: &KeyRecord) -> Result<Algorithm, AuthzError> {
    let name = match key.alg.as_deref() {
        Some(alg) => alg,
        None => match key.kty.as_str() {
            "RSA" => "RS256",
            "OKP" => "EdDSA",
            other => {
                return Err(AuthzError::InvalidSignature(format!(
                    "unsupported key type {other:?}"
                )))
            }
        },
    };

    match name {
        "RS256" => Ok(Algorithm::RS256),
        "EdDSA" => Ok(Algorithm::EdDSA),
        other => Err(AuthzError::InvalidSignature(format!(
            "algorithm {other:?} is not allowlisted"
        ))),
    }
}

/// Build a verification key from the record's material.
fn decoding_key(key: &KeyRecord, algorithm: Algorithm) -> Result<DecodingKey, AuthzError> {
    match algorithm {
        Algorithm::RS256 => {
            let (n, e) = match (key.n.as_deref(), key.e.as_deref()) {
                (Some(n), Some(e)) => (n, e),
                _ => {
                    return Err(AuthzError::InvalidSignature(
                        "RSA key record is missing modulus or exponent".to_string(),
                    ))
                }
            };
            DecodingKey::from_rsa_components(n, e).map_err(|e| {
                AuthzError::InvalidSignature(format!("invalid RSA key material: {e}"))
            })
        }
        Algorithm::EdDSA => {
            if key.crv.as_deref() != Some("Ed25519") {
                return Err(AuthzError::InvalidSignature(
                    "OKP key record is not Ed25519".to_string(),
                ));
            }
            let x = key.x.as_deref().ok_or_else(|| {
                AuthzError::InvalidSignature("OKP key record is missing public key".to_string())
            })?;
            let bytes = URL_SAFE_NO_PAD.decode(x).map_err(|e| {
                AuthzError::InvalidSignature(format!("invalid OKP key material: {e}"))
            })?;
            Ok(DecodingKey::from_ed_der(&bytes))
        }
        _ => Err(AuthzError::InvalidSignature(
            "algorithm is not allowlisted".to_string(),
        )),
    }
}

/// Verify a parsed token against the key set and return its claims.
///
/// Looks up the key whose identifier equals the header's `kid`,
/// cross-checks the declared algorithm against the key record, then
/// verifies the signature. Only on success is the payload segment
/// decoded into [`Claims`].
///
/// Expiry is intentionally NOT enforced here; temporal rules belong to
/// the claims validator, which knows about the refresh exception.
///
/// # Errors
///
/// - `KeyNotFound` when no key matches the header's `kid`
/// - `InvalidSignature` on signature mismatch, algorithm mismatch,
///   non-allowlisted algorithm, unusable key material, or malformed
///   signature bytes
/// - `MalformedToken` when a verified payload does not decode to the
///   expected claims structure
#[instrument(skip_all, fields(kid = %parsed.header.kid))]
pub fn verify(parsed: &ParsedToken<'_>, key_set: &KeySet) -> Result<Claims, AuthzError> {
    let key = key_set
        .find(&parsed.header.kid)
        .ok_or_else(|| AuthzError::KeyNotFound(parsed.header.kid.clone()))?;

    if let Some(use_) = key.use_.as_deref() {
        if use_ != "sig" {
            return Err(AuthzError::InvalidSignature(format!(
                "key is published for {use_:?}, not signature verification"
            )));
        }
    }

    let algorithm = expected_algorithm(key)?;

    // The header's algorithm must agree with the key record's; the
    // header never gets to pick on its own.
    let header_algorithm = match parsed.header.alg.as_str() {
        "RS256" => Some(Algorithm::RS256),
        "EdDSA" => Some(Algorithm::EdDSA),
        _ => None,
    };
    if header_algorithm != Some(algorithm) {
        tracing::debug!(
            target: "authz.verify",
            header_alg = %parsed.header.alg,
            "Token rejected: header algorithm does not match key record"
        );
        return Err(AuthzError::InvalidSignature(
            "header algorithm does not match key record".to_string(),
        ));
    }

    let decoding_key = decoding_key(key, algorithm)?;

    let mut validation = Validation::new(algorithm);
    // Temporal rules are owned by the claims validator (the refresh
    // path accepts an expired token); only the signature is checked
    // here.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::new();

    let token_data = decode::<Claims>(parsed.raw, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "authz.verify", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::Json(_) => {
                AuthzError::MalformedToken("payload is not a valid claims structure".to_string())
            }
            _ => AuthzError::InvalidSignature(e.to_string()),
        }
    })?;

    Ok(token_data.claims)
}
