//! Builder patterns for test token construction
//!
//! Provides a fluent API for minting signed test tokens against a
//! fixture key, plus helpers for producing deliberately broken tokens.

use crate::crypto_fixtures::{TestRsaKey, TestSigningKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

/// Builder for creating signed test tokens
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1).unwrap();
/// let token = TestTokenBuilder::new("k1")
///     .for_subject("alice")
///     .expires_in(3600)
///     .sign(&key);
/// ```
pub struct TestTokenBuilder {
    kid: String,
    sub: String,
    exp: i64,
    claims: serde_json::Map<String, serde_json::Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder for the given key identifier.
    pub fn new(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            sub: "test-subject".to_string(),
            exp: (Utc::now() + Duration::seconds(3600)).timestamp(),
            claims: serde_json::Map::new(),
        }
    }

    /// Set the subject.
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set an absolute expiration timestamp.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Add an arbitrary extra claim.
    pub fn with_claim(mut self, name: &str, value: serde_json::Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Sign the claims with an EdDSA fixture key.
    pub fn sign(self, key: &TestSigningKey) -> String {
        let encoding_key = EncodingKey::from_ed_der(&key.private_key_pkcs8);
        self.sign_with(Algorithm::EdDSA, &encoding_key)
    }

    /// Sign the claims with the RSA fixture key (RS256).
    pub fn sign_rs256(self, key: &TestRsaKey) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key_pem.as_bytes())
            .expect("RSA fixture PEM should parse");
        self.sign_with(Algorithm::RS256, &encoding_key)
    }

    fn sign_with(self, algorithm: Algorithm, encoding_key: &EncodingKey) -> String {
        let mut header = Header::new(algorithm);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid);

        let mut claims = self.claims;
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("exp".to_string(), json!(self.exp));

        jsonwebtoken::encode(&header, &claims, encoding_key).expect("test token signing failed")
    }
}

/// Flip one bit in a token's signature segment.
///
/// The result still parses (three segments, valid base64url) but must
/// fail cryptographic verification.
pub fn tamper_signature(token: &str) -> String {
    let mut parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "expected a three-segment token");

    let mut sig = URL_SAFE_NO_PAD
        .decode(parts[2])
        .expect("signature segment should be base64url");
    sig[0] ^= 0x01;
    let tampered = URL_SAFE_NO_PAD.encode(&sig);

    parts[2] = &tampered;
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::test_signing_key;

    #[test]
    fn test_builder_produces_three_segments() {
        let key = test_signing_key(1).unwrap();
        let token = TestTokenBuilder::new("k1").for_subject("alice").sign(&key);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_builder_embeds_kid_and_claims() {
        let key = test_signing_key(1).unwrap();
        let token = TestTokenBuilder::new("k1")
            .for_subject("alice")
            .with_claim("scope", serde_json::json!("items:read"))
            .sign(&key);

        let parts: Vec<&str> = token.split('.').collect();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();

        assert_eq!(header["kid"], "k1");
        assert_eq!(header["alg"], "EdDSA");
        assert_eq!(payload["sub"], "alice");
        assert_eq!(payload["scope"], "items:read");
        assert!(payload["exp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_rs256_builder_declares_rs256() {
        let key = crate::crypto_fixtures::test_rsa_key();
        let token = TestTokenBuilder::new("rsa-1")
            .for_subject("alice")
            .sign_rs256(&key);

        let parts: Vec<&str> = token.split('.').collect();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["kid"], "rsa-1");
    }

    #[test]
    fn test_tamper_changes_signature_only() {
        let key = test_signing_key(1).unwrap();
        let token = TestTokenBuilder::new("k1").sign(&key);
        let tampered = tamper_signature(&token);

        assert_ne!(token, tampered);
        let original: Vec<&str> = token.split('.').collect();
        let flipped: Vec<&str> = tampered.split('.').collect();
        assert_eq!(original[0], flipped[0]);
        assert_eq!(original[1], flipped[1]);
        assert_ne!(original[2], flipped[2]);
    }
}
