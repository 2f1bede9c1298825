//! Key-set discovery, caching, and refresh.
//!
//! The cache holds one entry per issuer and is shared across all
//! concurrent authorization checks for the lifetime of the process.
//! Reads are cheap once populated; a refresh (cold start or kid miss)
//! is collapsed so concurrent misses for the same issuer produce one
//! outbound fetch, not N.
//!
//! Lifecycle: an entry is created on first lookup for an issuer and
//! never proactively expired (stale-while-valid). An optional TTL can
//! opt an entry into refresh-on-read once it ages past the tolerance.
//! A forced refresh happens at most once per check, when a requested
//! key identifier is absent from the cached set (key rotation).
//!
//! # Security
//!
//! The discovery response is untrusted transport input: anything that
//! is not a well-formed key-set document fails closed as
//! `KeySetUnavailable`, and the fetch carries a network timeout so no
//! check blocks unboundedly.

use crate::errors::AuthzError;
use crate::observability::metrics::{record_keyset_cache, record_keyset_fetch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Connection timeout for the discovery fetch.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One public key from an issuer's key set, in the standard JWKS
/// interchange shape. Immutable once fetched.
///
/// RSA keys carry `n`/`e`; Octet Key Pair (Ed25519) keys carry
/// `crv`/`x`. Unknown key types are kept in the set but rejected by
/// the verifier when matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key identifier matched against the token header's `kid`.
    pub kid: String,
    /// Key type: `RSA` or `OKP`.
    pub kty: String,
    /// Algorithm bound to this key by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Usage marker; signature keys carry `sig`.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// OKP curve name (`Ed25519`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// OKP public key bytes (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

/// Wire shape of the discovery document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySetDocument {
    pub keys: Vec<KeyRecord>,
}

/// A fetched key set for one issuer.
#[derive(Debug)]
pub struct KeySet {
    pub issuer: String,
    pub fetched_at: Instant,
    pub keys: Vec<KeyRecord>,
}

impl KeySet {
    /// Find a key by identifier. Returns the record whole; filtering
    /// by usage or algorithm is the verifier's concern.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&KeyRecord> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// Per-issuer cache slot.
///
/// `refresh` serializes outbound fetches for the issuer; `current` is
/// read lock-free-ish (RwLock read) by every check once populated.
#[derive(Default)]
struct IssuerEntry {
    current: RwLock<Option<Arc<KeySet>>>,
    refresh: Mutex<()>,
}

/// Process-wide key-set cache, injected into the pipeline at startup
/// and torn down with the process.
pub struct KeySetCache {
    entries: RwLock<HashMap<String, Arc<IssuerEntry>>>,
    http: reqwest::Client,
    ttl: Option<Duration>,
}

impl KeySetCache {
    /// Create a cache with the given fetch timeout and staleness
    /// tolerance. `ttl: None` means stale-while-valid.
    ///
    /// # Errors
    ///
    /// Returns `KeySetUnavailable` if the HTTP client cannot be built.
    pub fn new(fetch_timeout: Duration, ttl: Option<Duration>) -> Result<Self, AuthzError> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                AuthzError::KeySetUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            http,
            ttl,
        })
    }

    /// Get the key set for an issuer, fetching it if absent or aged
    /// past the configured TTL. Returns the full set, never filtered.
    ///
    /// # Errors
    ///
    /// Returns `KeySetUnavailable` if the discovery endpoint cannot be
    /// reached, times out, or returns a malformed document.
    pub async fn get(&self, issuer: &str) -> Result<Arc<KeySet>, AuthzError> {
        let entry = self.entry(issuer).await;

        if let Some(current) = entry.current.read().await.clone() {
            if self.is_fresh(&current) {
                record_keyset_cache("hit");
                debug!(target: "authz.keyset", issuer = %issuer, "Using cached key set");
                return Ok(current);
            }
        }

        record_keyset_cache("miss");
        self.refresh_entry(issuer, &entry).await
    }

    /// Force a refetch for an issuer, bypassing freshness.
    ///
    /// Used exactly once per authorization check, when a requested key
    /// identifier is absent from the cached set. Concurrent forced
    /// refreshes for the same issuer collapse into one fetch.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`KeySetCache::get`].
    pub async fn refresh(&self, issuer: &str) -> Result<Arc<KeySet>, AuthzError> {
        let entry = self.entry(issuer).await;
        record_keyset_cache("refresh");
        self.refresh_entry(issuer, &entry).await
    }

    async fn entry(&self, issuer: &str) -> Arc<IssuerEntry> {
        if let Some(entry) = self.entries.read().await.get(issuer) {
            return Arc::clone(entry);
        }

        let mut entries = self.entries.write().await;
        Arc::clone(
            entries
                .entry(issuer.to_string())
                .or_insert_with(|| Arc::new(IssuerEntry::default())),
        )
    }

    fn is_fresh(&self, set: &KeySet) -> bool {
        match self.ttl {
            Some(ttl) => set.fetched_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Fetch-and-store under the entry's refresh lock.
    ///
    /// Callers that were queued behind an in-flight fetch adopt its
    /// result instead of issuing their own: any set stored after we
    /// started waiting satisfies the request that made us wait.
    async fn refresh_entry(
        &self,
        issuer: &str,
        entry: &IssuerEntry,
    ) -> Result<Arc<KeySet>, AuthzError> {
        let entered_at = Instant::now();
        let _guard = entry.refresh.lock().await;

        if let Some(current) = entry.current.read().await.clone() {
            if current.fetched_at >= entered_at {
                debug!(
                    target: "authz.keyset",
                    issuer = %issuer,
                    "Adopting key set fetched by a concurrent caller"
                );
                return Ok(current);
            }
        }

        let set = Arc::new(self.fetch(issuer).await?);
        *entry.current.write().await = Some(Arc::clone(&set));
        Ok(set)
    }

    #[instrument(skip_all, fields(issuer = %issuer))]
    async fn fetch(&self, issuer: &str) -> Result<KeySet, AuthzError> {
        let url = format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'));
        let started = Instant::now();

        info!(target: "authz.keyset", url = %url, "Fetching key set from discovery endpoint");

        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(target: "authz.keyset", url = %url, error = %e, "Key set fetch failed");
            record_keyset_fetch("error", started.elapsed());
            AuthzError::KeySetUnavailable(format!("fetch failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "authz.keyset",
                url = %url,
                status = %status,
                "Discovery endpoint returned error status"
            );
            record_keyset_fetch("error", started.elapsed());
            return Err(AuthzError::KeySetUnavailable(format!(
                "discovery endpoint returned status {status}"
            )));
        }

        let document: KeySetDocument = response.json().await.map_err(|e| {
            warn!(target: "authz.keyset", url = %url, error = %e, "Malformed key-set document");
            record_keyset_fetch("error", started.elapsed());
            AuthzError::KeySetUnavailable(format!("malformed key-set document: {e}"))
        })?;

        info!(
            target: "authz.keyset",
            url = %url,
            key_count = document.keys.len(),
            "Key set fetched"
        );
        record_keyset_fetch("success", started.elapsed());

        Ok(KeySet {
            issuer: issuer.to_string(),
            fetched_at: Instant::now(),
            keys: document.keys,
        })
    }
}
