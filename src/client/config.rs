use std::env;

use serde::{Deserialize, Serialize};

use super::error::ClientError;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the profile API
    pub api_base_url: String,
    pub identity: IdentityConfig,
}

/// Where and how to reach the identity provider's REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub api_key: String,
    pub identity_base_url: String,
    pub secure_token_base_url: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        let config = Self {
            api_base_url: env::var("PROFILE_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            identity: IdentityConfig {
                api_key: env::var("IDENTITY_API_KEY").unwrap_or_default(),
                identity_base_url: env::var("IDENTITY_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_IDENTITY_BASE_URL.to_string()),
                secure_token_base_url: env::var("SECURE_TOKEN_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_SECURE_TOKEN_BASE_URL.to_string()),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        for (name, value) in [
            ("PROFILE_API_URL", &self.api_base_url),
            ("IDENTITY_BASE_URL", &self.identity.identity_base_url),
            ("SECURE_TOKEN_BASE_URL", &self.identity.secure_token_base_url),
        ] {
            url::Url::parse(value).map_err(|e| ClientError::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }
        Ok(())
    }
}

impl IdentityConfig {
    pub fn new(api_key: impl Into<String>, identity_base_url: impl Into<String>, secure_token_base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_base_url: identity_base_url.into(),
            secure_token_base_url: secure_token_base_url.into(),
        }
    }
}
