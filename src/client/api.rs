use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use super::error::ClientError;
use super::identity::IdentityProvider;
use crate::routes::{CREATE_USER, FETCH_USER, UPDATE_USER};
use crate::types::{NewProfile, ProfileFields, ProfilePatch};

/// Thin HTTP client for the profile API that attaches the caller's
/// bearer token to every request.
#[derive(Clone)]
pub struct ProfileApiClient {
    http: reqwest::Client,
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl ProfileApiClient {
    pub fn new(base_url: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }

    pub async fn fetch_profile(&self) -> Result<ProfileFields, ClientError> {
        let value = self.request(Method::GET, FETCH_USER, None).await?;
        into_fields(value)
    }

    /// Sends only the fields carried by `patch`
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<ProfileFields, ClientError> {
        let body = Value::Object(patch.fields());
        let value = self.request(Method::PUT, UPDATE_USER, Some(&body)).await?;
        into_fields(value)
    }

    pub async fn create_profile(&self, initial: &NewProfile) -> Result<ProfileFields, ClientError> {
        let body = serde_json::to_value(initial).map_err(|e| ClientError::Malformed(e.to_string()))?;
        let value = self.request(Method::POST, CREATE_USER, Some(&body)).await?;
        into_fields(value)
    }

    async fn request(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let token = self.identity.id_token().await.map_err(|e| {
            error!("Error getting ID token: {}", e);
            ClientError::NotAuthenticated("Failed to authenticate request.".to_string())
        })?;

        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, url).header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(body.as_ref(), status),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        Ok(response.json().await?)
    }
}

/// Server text from `error`, then `message`, then a generic status line
fn error_message(body: Option<&Value>, status: StatusCode) -> String {
    body.and_then(|body| {
        body.get("error")
            .and_then(Value::as_str)
            .or_else(|| body.get("message").and_then(Value::as_str))
    })
    .map(str::to_string)
    .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()))
}

fn into_fields(value: Value) -> Result<ProfileFields, ClientError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(ClientError::Malformed(format!("expected a JSON object, got {}", other))),
    }
}
