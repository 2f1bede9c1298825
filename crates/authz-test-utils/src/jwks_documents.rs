//! Key-set document builders
//!
//! Produces JWKS JSON bodies for mock discovery endpoints: well-formed
//! records matching a fixture key, and deliberately broken documents
//! for fail-closed tests.

use crate::crypto_fixtures::{TestRsaKey, TestSigningKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::json;

/// An OKP (Ed25519) key record for a fixture signing key.
pub fn okp_key_record(kid: &str, key: &TestSigningKey) -> serde_json::Value {
    json!({
        "kid": kid,
        "kty": "OKP",
        "crv": "Ed25519",
        "x": URL_SAFE_NO_PAD.encode(&key.public_key),
        "use": "sig",
        "alg": "EdDSA"
    })
}

/// An RSA key record for the fixture RSA signing key.
pub fn rsa_key_record(kid: &str, key: &TestRsaKey) -> serde_json::Value {
    json!({
        "kid": kid,
        "kty": "RSA",
        "alg": "RS256",
        "use": "sig",
        "n": key.modulus_b64,
        "e": key.exponent_b64
    })
}

/// A complete key-set document from individual records.
pub fn keyset_document(records: &[serde_json::Value]) -> serde_json::Value {
    json!({ "keys": records })
}

/// A document that is valid JSON but not a key-set shape.
pub fn malformed_keyset_document() -> serde_json::Value {
    json!({ "keys": "not-an-array" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::{test_rsa_key, test_signing_key};

    #[test]
    fn test_okp_record_shape() {
        let key = test_signing_key(1).unwrap();
        let record = okp_key_record("k1", &key);

        assert_eq!(record["kid"], "k1");
        assert_eq!(record["kty"], "OKP");
        assert_eq!(record["alg"], "EdDSA");
        let x = record["x"].as_str().unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(x).unwrap().len(), 32);
    }

    #[test]
    fn test_rsa_record_shape() {
        let record = rsa_key_record("rsa-1", &test_rsa_key());

        assert_eq!(record["kid"], "rsa-1");
        assert_eq!(record["kty"], "RSA");
        assert_eq!(record["alg"], "RS256");
        assert_eq!(record["e"], "AQAB");
        let n = record["n"].as_str().unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(n).unwrap().len(), 256);
    }

    #[test]
    fn test_keyset_document_wraps_records() {
        let key = test_signing_key(1).unwrap();
        let doc = keyset_document(&[
            okp_key_record("k1", &key),
            rsa_key_record("k2", &test_rsa_key()),
        ]);
        assert_eq!(doc["keys"].as_array().unwrap().len(), 2);
    }
}
