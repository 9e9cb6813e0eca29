pub mod jwks;
pub mod jwt;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, AuthMode};

pub use jwks::JwksVerifier;
pub use jwt::JwtVerifier;

/// Claims carried by an identity-provider token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity key
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Identity resolved from a verified bearer token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub claims: Claims,
}

impl TryFrom<Claims> for VerifiedIdentity {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("token has an empty subject".to_string()));
        }
        Ok(Self {
            uid: claims.sub.clone(),
            email: claims.email.clone(),
            claims,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingToken(String),
    /// Reason is for logs only; clients always see a uniform message
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Verifier misconfigured: {0}")]
    Misconfigured(String),
}

/// Verifies an opaque bearer token against the identity service
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::MissingToken("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MissingToken("Invalid Authorization header format".to_string()))?;

    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::MissingToken("Authorization header must use Bearer token format".to_string())
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken("Please provide an authenticated token".to_string()));
    }
    Ok(token)
}

/// Build the verifier selected by configuration
pub fn build_verifier(config: &AuthConfig) -> Result<Arc<dyn TokenVerifier>, AuthError> {
    match config.mode {
        AuthMode::Jwt => {
            let verifier = JwtVerifier::new(
                &config.jwt_secret,
                config.issuer.clone(),
                config.audience.clone(),
            )?;
            Ok(Arc::new(verifier))
        }
        AuthMode::Jwks => {
            let issuer = config.issuer.clone().or_else(|| {
                config
                    .project_id
                    .as_ref()
                    .map(|project| format!("https://securetoken.google.com/{}", project))
            });
            let audience = config.audience.clone().or_else(|| config.project_id.clone());
            let (issuer, audience) = match (issuer, audience) {
                (Some(issuer), Some(audience)) => (issuer, audience),
                _ => {
                    return Err(AuthError::Misconfigured(
                        "JWKS mode requires AUTH_PROJECT_ID or both AUTH_ISSUER and AUTH_AUDIENCE".to_string(),
                    ))
                }
            };
            let verifier = JwksVerifier::new(
                config.jwks_url.clone(),
                issuer,
                audience,
                std::time::Duration::from_secs(config.jwks_cache_secs),
            )?;
            Ok(Arc::new(verifier))
        }
    }
}
