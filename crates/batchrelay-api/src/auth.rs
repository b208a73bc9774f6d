//! Bearer credential verification.
//!
//! The trigger endpoint requires an `Authorization: Bearer <jwt>` header.
//! Verification checks the signature (HS256 shared secret or JWKS) and the
//! standard claims, and always pins the `aud` claim to the audience this
//! service is configured as. The audience check is deliberate and separate
//! from signature validity: services sharing an issuer must not accept each
//! other's tokens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::AppConfig;

/// Verification failures, mapped to distinct response codes by the HTTP
/// layer: `Missing` → 401, `Invalid` → 403.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential, or a header that is not `Bearer <token>`.
    #[error("missing or malformed bearer credential")]
    Missing,

    /// Signature, expiry, issuer, or audience rejected.
    #[error("credential rejected: {reason}")]
    Invalid { reason: String },
}

impl AuthError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AuthError::Invalid {
            reason: reason.into(),
        }
    }
}

/// The verified caller. Opaque to the core; carried for logging only.
#[derive(Debug, Clone)]
pub struct Identity {
    /// The token's `sub` claim, when present.
    pub subject: Option<String>,
}

/// Credential verification seam.
///
/// The HTTP layer depends on this trait rather than a concrete verifier so
/// tests can substitute fakes, mirroring the record-store and queue ports.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Verifies one bearer token string.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Key-source and claim settings for [`JwtVerifier`].
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Mandatory audience; tokens addressed elsewhere are rejected.
    pub expected_audience: String,
    /// HS256 shared secret, preferred when set.
    pub hs256_secret: Option<String>,
    /// JWKS endpoint for asymmetric keys.
    pub jwks_url: Option<String>,
    /// Optional issuer pin.
    pub issuer: Option<String>,
    /// Clock-skew leeway for `exp`/`nbf`, in seconds.
    pub leeway_seconds: u64,
    /// How long a fetched JWKS stays fresh.
    pub jwks_cache_ttl: Duration,
}

impl VerifierConfig {
    /// Builds verifier settings from the service configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            expected_audience: config.expected_audience.clone(),
            hs256_secret: config.jwt_hs256_secret.clone(),
            jwks_url: config.jwt_jwks_url.clone(),
            issuer: config.jwt_issuer.clone(),
            leeway_seconds: 60,
            jwks_cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedJwks {
    set: Arc<JwkSet>,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// JWT implementation of [`CredentialVerifier`].
#[derive(Debug)]
pub struct JwtVerifier {
    config: VerifierConfig,
    jwks_cache: RwLock<Option<CachedJwks>>,
    http: reqwest::Client,
}

impl JwtVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        let http = match reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "failed to configure http client, using defaults");
                reqwest::Client::new()
            }
        };

        Self {
            config,
            jwks_cache: RwLock::new(None),
            http,
        }
    }

    fn decode_hs256(&self, token: &str, secret: &str) -> Result<Value, AuthError> {
        let validation = self.validation_for(&[Algorithm::HS256]);
        decode::<Value>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|t| t.claims)
        .map_err(|e| AuthError::invalid(e.to_string()))
    }

    async fn decode_with_jwks(&self, token: &str) -> Result<Value, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::invalid(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::invalid("token header has no key id"))?;

        let jwk = self
            .get_jwk(&kid)
            .await?
            .ok_or_else(|| AuthError::invalid("no key matches the token's key id"))?;
        let decoding_key =
            DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::invalid(e.to_string()))?;

        // Restrict to common JWKS algorithms to prevent alg confusion
        // across token types.
        let validation = self.validation_for(&[Algorithm::RS256, Algorithm::ES256]);
        decode::<Value>(token, &decoding_key, &validation)
            .map(|t| t.claims)
            .map_err(|e| AuthError::invalid(e.to_string()))
    }

    fn validation_for(&self, algorithms: &[Algorithm]) -> Validation {
        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms.to_vec();
        validation.leeway = self.config.leeway_seconds;

        // The audience check is unconditional: a validly signed token for
        // another service must be rejected.
        validation.set_audience(&[self.config.expected_audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        if let Some(iss) = self.config.issuer.as_deref() {
            validation.set_issuer(&[iss]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        validation
    }

    async fn get_jwk(&self, kid: &str) -> Result<Option<jsonwebtoken::jwk::Jwk>, AuthError> {
        let ttl = self.config.jwks_cache_ttl;
        if let Some(jwk) = self.cached_jwk(kid, ttl).await {
            return Ok(Some(jwk));
        }
        self.refresh_jwks().await?;
        Ok(self.cached_jwk(kid, ttl).await)
    }

    async fn cached_jwk(&self, kid: &str, ttl: Duration) -> Option<jsonwebtoken::jwk::Jwk> {
        let cache = self.jwks_cache.read().await;
        let set = match cache.as_ref() {
            Some(cached) if cached.is_fresh(ttl) => Arc::clone(&cached.set),
            _ => return None,
        };
        drop(cache);

        set.keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .cloned()
    }

    async fn refresh_jwks(&self) -> Result<(), AuthError> {
        let Some(url) = self.config.jwks_url.as_deref() else {
            return Ok(());
        };

        let set = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::invalid(format!("jwks fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AuthError::invalid(format!("jwks fetch failed: {e}")))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::invalid(format!("jwks parse failed: {e}")))?;

        *self.jwks_cache.write().await = Some(CachedJwks {
            set: Arc::new(set),
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let claims = if let Some(secret) = self.config.hs256_secret.as_deref() {
            self.decode_hs256(token, secret)?
        } else if self.config.jwks_url.is_some() {
            self.decode_with_jwks(token).await?
        } else {
            tracing::error!("auth is enabled but no signing key source is configured");
            return Err(AuthError::invalid("no signing key source configured"));
        };

        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Identity { subject })
    }
}
