//! # Authorization Service Library
//!
//! Bearer-token authorization for a protected API surface: given a
//! signed compact token and the resource being invoked, decide whether
//! the caller may proceed, and if so issue a resource-scoped decision
//! for the enforcement point.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `token` - Compact-token parsing
//! - `keyset` - Key-set discovery and caching
//! - `verify` - Signature verification
//! - `claims` - Claims validation
//! - `policy` - Decision documents
//! - `pipeline` - End-to-end orchestration
//! - `handlers` - HTTP request handlers
//! - `errors` - Error types

pub mod claims;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod keyset;
pub mod middleware;
pub mod observability;
pub mod pipeline;
pub mod policy;
pub mod routes;
pub mod token;
pub mod verify;
