//! End-to-end authorization pipeline.
//!
//! Orchestrates parse, key resolution, signature verification, claims
//! validation, and decision building in strict sequence. No stage is
//! skipped and none is retried automatically; the one sanctioned retry
//! is a single forced key-set refresh when a key identifier misses the
//! cached set (key rotation).
//!
//! Every internal failure collapses into [`AuthzOutcome::Denied`]
//! before it reaches a caller. Error kinds feed logs and metrics only;
//! a caller can never learn which stage rejected a token, so the
//! service cannot be used as an oracle.

use crate::claims::{self, ValidationContext};
use crate::config::Config;
use crate::errors::AuthzError;
use crate::keyset::KeySetCache;
use crate::observability::metrics::{record_authorization, record_denial};
use crate::policy::{self, AuthorizationDecision};
use crate::token;
use crate::verify;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// The caller-visible result of an authorization check.
///
/// A tagged outcome rather than an error: every call site must handle
/// both arms explicitly, and `Denied` carries no detail by contract.
#[derive(Debug)]
pub enum AuthzOutcome {
    Authorized(AuthorizationDecision),
    Denied,
}

/// One authorization check request.
#[derive(Debug, Clone)]
pub struct CheckRequest<'a> {
    /// Compact signed token, exactly as presented by the caller.
    pub token: &'a str,
    /// Target resource identifier; absent for diagnostic callers.
    pub resource: Option<&'a str>,
    /// Whether this is a refresh-path invocation, which accepts an
    /// expired token solely to mint a new one.
    pub is_refresh: bool,
}

/// Shared pipeline instance, created at startup and used by every
/// concurrent check. The injected cache is the only shared mutable
/// state.
pub struct AuthorizationPipeline {
    cache: Arc<KeySetCache>,
    issuer: String,
    expected_issuer: Option<String>,
    expected_audience: Option<String>,
}

impl AuthorizationPipeline {
    #[must_use]
    pub fn new(cache: Arc<KeySetCache>, config: &Config) -> Self {
        Self {
            cache,
            issuer: config.issuer.clone(),
            expected_issuer: config.expected_issuer.clone(),
            expected_audience: config.expected_audience.clone(),
        }
    }

    /// Run one authorization check end to end.
    ///
    /// Never fails: every internal error becomes `Denied`.
    #[instrument(skip_all, fields(is_refresh = request.is_refresh))]
    pub async fn check(&self, request: CheckRequest<'_>) -> AuthzOutcome {
        let started = Instant::now();

        match self.run(&request).await {
            Ok(decision) => {
                info!(
                    target: "authz.pipeline",
                    resource_scoped = request.resource.is_some(),
                    "Authorization granted"
                );
                record_authorization("authorized", started.elapsed());
                AuthzOutcome::Authorized(decision)
            }
            Err(error) => {
                // Internal detail stops here; the caller sees only a
                // uniform denial.
                info!(
                    target: "authz.pipeline",
                    reason = error.category(),
                    "Authorization denied"
                );
                record_denial(error.category());
                record_authorization("denied", started.elapsed());
                AuthzOutcome::Denied
            }
        }
    }

    async fn run(&self, request: &CheckRequest<'_>) -> Result<AuthorizationDecision, AuthzError> {
        let parsed = token::parse(request.token)?;

        let mut key_set = self.cache.get(&self.issuer).await?;

        // A missing kid gets exactly one forced refresh, on the
        // assumption that the issuer rotated keys since the last fetch.
        if key_set.find(&parsed.header.kid).is_none() {
            debug!(
                target: "authz.pipeline",
                kid = %parsed.header.kid,
                "Key identifier not in cached set, forcing one refresh"
            );
            key_set = self.cache.refresh(&self.issuer).await?;
        }

        let claims = verify::verify(&parsed, &key_set)?;

        let ctx = ValidationContext {
            is_refresh: request.is_refresh,
            expected_issuer: self.expected_issuer.clone(),
            expected_audience: self.expected_audience.clone(),
        };
        let validated = claims::validate(claims, &ctx)?;

        Ok(policy::build(&validated, request.resource))
    }
}
