use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Claims, TokenVerifier, VerifiedIdentity};

impl Claims {
    pub fn new(sub: impl Into<String>, email: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            email,
            name: None,
            iss: None,
            aud: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// HS256 shared-secret verifier. Also issues tokens for local development.
pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: Option<String>, audience: Option<String>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Misconfigured("JWT secret not configured".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        match &issuer {
            Some(iss) => validation.set_issuer(&[iss]),
            None => validation.iss = None,
        }
        match &audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            audience,
        })
    }

    /// Sign claims with the shared secret, stamping the configured issuer/audience
    pub fn issue(&self, mut claims: Claims) -> Result<String, AuthError> {
        if claims.iss.is_none() {
            claims.iss = self.issuer.clone();
        }
        if claims.aud.is_none() {
            claims.aud = self.audience.clone();
        }
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Misconfigured(format!("JWT generation error: {}", e)))
    }

    pub fn issue_token(&self, sub: &str, email: Option<String>, ttl: Duration) -> Result<String, AuthError> {
        self.issue(Claims::new(sub, email, ttl))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        VerifiedIdentity::try_from(token_data.claims)
    }
}
