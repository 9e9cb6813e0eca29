//! RS256 verification against an identity provider's published signing keys

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;

use super::{AuthError, Claims, TokenVerifier, VerifiedIdentity};

/// Public signing keys of Firebase-issued ID tokens
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const KNOWN_KIDS: &str = "jwks";
const KEYS_UNAVAILABLE: &str = "signing keys unavailable";

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    pub n: String,
    pub e: String,
}

/// Verifier backed by a remote JWKS document.
///
/// Keys are cached for `cache_ttl`. While the list of known key ids is
/// cached, a token naming any other `kid` is rejected without refetching,
/// and concurrent cache misses share a single fetch.
pub struct JwksVerifier {
    jwks_url: String,
    validation: Validation,
    http_client: reqwest::Client,
    /// kid -> decoding key
    key_cache: Cache<String, Arc<DecodingKey>>,
    /// Single entry: the kids published by the last fetch
    kids_cache: Cache<String, Arc<Vec<String>>>,
}

impl JwksVerifier {
    pub fn new(
        jwks_url: String,
        issuer: String,
        audience: String,
        cache_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| AuthError::Misconfigured(format!("JWKS http client: {}", e)))?;

        Ok(Self::with_client(jwks_url, issuer, audience, cache_ttl, http_client))
    }

    /// Create a verifier that fetches keys through `http_client`
    pub fn with_client(
        jwks_url: String,
        issuer: String,
        audience: String,
        cache_ttl: Duration,
        http_client: reqwest::Client,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self {
            jwks_url,
            validation,
            http_client,
            key_cache: Cache::builder().time_to_live(cache_ttl).max_capacity(100).build(),
            kids_cache: Cache::builder().time_to_live(cache_ttl).max_capacity(1).build(),
        }
    }

    /// Drop every cached key so the next verification refetches
    pub fn invalidate_cache(&self) {
        self.key_cache.invalidate_all();
        self.kids_cache.invalidate_all();
    }

    async fn decoding_key(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if let Some(key) = self.key_cache.get(kid).await {
            return Ok(key);
        }

        // A key can expire a moment before the kid list that names it
        for _ in 0..2 {
            let known = self.known_kids().await?;
            if !known.iter().any(|k| k == kid) {
                tracing::debug!("Unknown key id '{}' (known: {:?})", kid, known.as_ref());
                return Err(AuthError::InvalidToken(format!("unknown key id '{}'", kid)));
            }
            if let Some(key) = self.key_cache.get(kid).await {
                return Ok(key);
            }
            self.kids_cache.invalidate(KNOWN_KIDS).await;
        }

        Err(AuthError::InvalidToken(format!("unknown key id '{}'", kid)))
    }

    /// Kids of the current key set, loading it once for all concurrent callers
    async fn known_kids(&self) -> Result<Arc<Vec<String>>, AuthError> {
        self.kids_cache
            .try_get_with(KNOWN_KIDS.to_string(), self.load_keys())
            .await
            .map_err(|_| AuthError::InvalidToken(KEYS_UNAVAILABLE.to_string()))
    }

    async fn load_keys(&self) -> Result<Arc<Vec<String>>, AuthError> {
        let jwks = self.fetch_jwks().await?;

        let mut kids = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys.iter().filter(|k| k.kty == "RSA") {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    self.key_cache.insert(jwk.kid.clone(), Arc::new(key)).await;
                    kids.push(jwk.kid.clone());
                }
                Err(e) => tracing::warn!("Skipping malformed JWK '{}': {}", jwk.kid, e),
            }
        }

        Ok(Arc::new(kids))
    }

    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        tracing::debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch JWKS: {}", e);
                AuthError::InvalidToken(KEYS_UNAVAILABLE.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!("JWKS fetch returned status: {}", response.status());
            return Err(AuthError::InvalidToken(KEYS_UNAVAILABLE.to_string()));
        }

        response.json::<Jwks>().await.map_err(|e| {
            tracing::error!("Failed to parse JWKS: {}", e);
            AuthError::InvalidToken(KEYS_UNAVAILABLE.to_string())
        })
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token missing kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let token_data = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        VerifiedIdentity::try_from(token_data.claims)
    }
}
