use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP timeout for key-set discovery fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Service configuration.
///
/// The discovery URL for the signer's public-key set is derived from
/// either a full issuer URL or a region + user-pool pair, mirroring
/// the identity provider's well-known layout.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Issuer base URL; the JWKS document lives at
    /// `{issuer}/.well-known/jwks.json`.
    pub issuer: String,
    /// Optional staleness tolerance for cached key sets. `None` means
    /// stale-while-valid: entries are refreshed only on a kid miss.
    pub keyset_ttl: Option<Duration>,
    /// Network timeout for key-set fetches.
    pub fetch_timeout: Duration,
    /// When set, verified tokens must carry this `iss` claim.
    pub expected_issuer: Option<String>,
    /// When set, verified tokens must carry this `aud` claim.
    pub expected_audience: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8084".to_string());

        // Either a direct issuer URL, or region + pool id from which
        // the provider's issuer URL is constructed.
        let issuer = match vars.get("AUTHZ_ISSUER_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let region = vars
                    .get("AUTHZ_REGION")
                    .ok_or_else(|| ConfigError::MissingEnvVar("AUTHZ_ISSUER_URL".to_string()))?;
                let pool_id = vars
                    .get("AUTHZ_USER_POOL_ID")
                    .ok_or_else(|| ConfigError::MissingEnvVar("AUTHZ_USER_POOL_ID".to_string()))?;
                format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}")
            }
        };

        if !issuer.starts_with("https://")
            && !issuer.starts_with("http://localhost")
            && !issuer.starts_with("http://127.0.0.1")
        {
            return Err(ConfigError::InvalidValue {
                name: "AUTHZ_ISSUER_URL".to_string(),
                reason: "issuer must use HTTPS (HTTP only allowed for localhost)".to_string(),
            });
        }

        let keyset_ttl = match vars.get("AUTHZ_KEYSET_TTL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "AUTHZ_KEYSET_TTL_SECS".to_string(),
                    reason: format!("expected integer seconds, got {raw:?}"),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let fetch_timeout = match vars.get("AUTHZ_FETCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "AUTHZ_FETCH_TIMEOUT_SECS".to_string(),
                    reason: format!("expected integer seconds, got {raw:?}"),
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_FETCH_TIMEOUT,
        };

        Ok(Config {
            bind_address,
            issuer,
            keyset_ttl,
            fetch_timeout,
            expected_issuer: vars.get("AUTHZ_EXPECTED_ISSUER").cloned(),
            expected_audience: vars.get("AUTHZ_EXPECTED_AUDIENCE").cloned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "AUTHZ_ISSUER_URL".to_string(),
            "https://issuer.example.com".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("AUTHZ_KEYSET_TTL_SECS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.issuer, "https://issuer.example.com");
        assert_eq!(config.keyset_ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8084");
        assert_eq!(config.keyset_ttl, None);
        assert_eq!(config.expected_issuer, None);
        assert_eq!(config.expected_audience, None);
    }

    #[test]
    fn test_from_vars_region_and_pool() {
        let vars = HashMap::from([
            ("AUTHZ_REGION".to_string(), "eu-west-1".to_string()),
            ("AUTHZ_USER_POOL_ID".to_string(), "eu-west-1_AbC123".to_string()),
        ]);

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.issuer,
            "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbC123"
        );
    }

    #[test]
    fn test_from_vars_missing_issuer() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTHZ_ISSUER_URL"));
    }

    #[test]
    fn test_from_vars_region_without_pool() {
        let vars = HashMap::from([("AUTHZ_REGION".to_string(), "eu-west-1".to_string())]);
        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTHZ_USER_POOL_ID")
        );
    }

    #[test]
    fn test_from_vars_rejects_plain_http_issuer() {
        let vars = HashMap::from([(
            "AUTHZ_ISSUER_URL".to_string(),
            "http://issuer.example.com".to_string(),
        )]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_from_vars_allows_localhost_http() {
        let vars = HashMap::from([(
            "AUTHZ_ISSUER_URL".to_string(),
            "http://localhost:8080".to_string(),
        )]);
        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_from_vars_trims_trailing_slash() {
        let vars = HashMap::from([(
            "AUTHZ_ISSUER_URL".to_string(),
            "https://issuer.example.com/".to_string(),
        )]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.issuer, "https://issuer.example.com");
    }

    #[test]
    fn test_from_vars_invalid_ttl() {
        let mut vars = base_vars();
        vars.insert("AUTHZ_KEYSET_TTL_SECS".to_string(), "soon".to_string());
        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "AUTHZ_KEYSET_TTL_SECS")
        );
    }

    #[test]
    fn test_from_vars_hardening_options() {
        let mut vars = base_vars();
        vars.insert(
            "AUTHZ_EXPECTED_ISSUER".to_string(),
            "https://issuer.example.com".to_string(),
        );
        vars.insert("AUTHZ_EXPECTED_AUDIENCE".to_string(), "client-1".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.expected_issuer.as_deref(),
            Some("https://issuer.example.com")
        );
        assert_eq!(config.expected_audience.as_deref(), Some("client-1"));
    }
}
