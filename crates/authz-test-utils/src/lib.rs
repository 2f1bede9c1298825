//! # Authz Test Utilities
//!
//! Shared test utilities for the authorization service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 keys for reproducible tests)
//! - Test token builders (`TestTokenBuilder`)
//! - Key-set document builders (JWKS JSON for mock discovery endpoints)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authz_test_utils::*;
//!
//! let key = test_signing_key(1).unwrap();
//! let token = TestTokenBuilder::new("k1")
//!     .for_subject("alice")
//!     .expires_in(3600)
//!     .sign(&key);
//! let jwks = keyset_document(&[okp_key_record("k1", &key)]);
//! ```

pub mod crypto_fixtures;
pub mod jwks_documents;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_documents::*;
pub use token_builders::*;
