//! Identity provider seam for the client side, plus a REST implementation
//! speaking the Identity Toolkit / Secure Token wire format.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::config::IdentityConfig;
use super::error::IdentityError;
use crate::types::Profile;

/// Tokens this close to expiry are refreshed before use
const REFRESH_WINDOW_SECS: i64 = 60;

/// The signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<&SignedInUser> for Profile {
    fn from(user: &SignedInUser) -> Self {
        Profile {
            id: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            ..Default::default()
        }
    }
}

/// Everything needed to resume a session without re-entering a password
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub user: SignedInUser,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn needs_refresh(&self) -> bool {
        self.expires_at - Utc::now() < Duration::seconds(REFRESH_WINDOW_SECS)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Current bearer token, refreshed if needed. `None` when signed out.
    async fn id_token(&self) -> Result<Option<String>, IdentityError>;

    fn current_user(&self) -> Option<SignedInUser>;

    /// Receives the current user immediately and again on every change
    fn subscribe(&self) -> watch::Receiver<Option<SignedInUser>>;
}

/// Map provider error codes to messages fit for an end user
pub fn friendly_message(code: &str) -> String {
    match code {
        "EMAIL_EXISTS" => "This email address is already in use.",
        "INVALID_EMAIL" => "The email address is not valid.",
        "OPERATION_NOT_ALLOWED" => "Email/password accounts are not enabled.",
        "WEAK_PASSWORD" => "The password is too weak.",
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password.",
        "USER_DISABLED" => "This account has been disabled.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => "Your session has expired. Please sign in again.",
        other => return other.to_string(),
    }
    .to_string()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// The secure-token endpoint answers in snake_case
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}

/// Decode a non-2xx provider response into a `Rejected` error
async fn rejection(response: reqwest::Response) -> IdentityError {
    let status = response.status();
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => {
            // Messages look like "WEAK_PASSWORD : Password should be at least 6 characters"
            let code = envelope
                .error
                .message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            IdentityError::Rejected {
                message: friendly_message(&code),
                code,
            }
        }
        Err(_) => IdentityError::Malformed(format!("HTTP error! status: {}", status.as_u16())),
    }
}

pub struct RestIdentityProvider {
    http: reqwest::Client,
    config: IdentityConfig,
    credential: Mutex<Option<Credential>>,
    auth_state: watch::Sender<Option<SignedInUser>>,
}

impl RestIdentityProvider {
    pub fn new(config: IdentityConfig) -> Self {
        let (auth_state, _) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            config,
            credential: Mutex::new(None),
            auth_state,
        }
    }

    /// Resume a previously persisted session
    pub fn with_credential(config: IdentityConfig, credential: Credential) -> Self {
        let mut provider = Self::new(config);
        provider.auth_state.send_replace(Some(credential.user.clone()));
        provider.credential = Mutex::new(Some(credential));
        provider
    }

    /// Snapshot of the held credential, for persistence
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.lock().await.clone()
    }

    fn account_url(&self, action: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.config.identity_base_url.trim_end_matches('/'),
            action,
            self.config.api_key
        )
    }

    async fn authenticate(&self, action: &str, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        let response = self
            .http
            .post(self.account_url(action))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;

        let user = SignedInUser {
            uid: account.local_id,
            email: account.email.or_else(|| Some(email.to_string())),
            display_name: account.display_name.filter(|name| !name.is_empty()),
        };
        let credential = Credential {
            user: user.clone(),
            id_token: account.id_token,
            refresh_token: account.refresh_token,
            expires_at: expiry_from(&account.expires_in),
        };

        *self.credential.lock().await = Some(credential);
        self.auth_state.send_replace(Some(user.clone()));
        info!("Signed in as {}", user.uid);
        Ok(user)
    }

    async fn refresh(&self, credential: &mut Credential) -> Result<(), IdentityError> {
        let url = format!(
            "{}/token?key={}",
            self.config.secure_token_base_url.trim_end_matches('/'),
            self.config.api_key
        );
        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credential.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;

        credential.id_token = refreshed.id_token;
        credential.refresh_token = refreshed.refresh_token;
        credential.expires_at = expiry_from(&refreshed.expires_in);
        debug!("Refreshed ID token for {}", credential.user.uid);
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        self.authenticate("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        self.authenticate("signUp", email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.credential.lock().await.take();
        self.auth_state.send_replace(None);
        Ok(())
    }

    async fn id_token(&self) -> Result<Option<String>, IdentityError> {
        let mut guard = self.credential.lock().await;
        let outcome = match guard.as_mut() {
            None => return Ok(None),
            Some(credential) if credential.needs_refresh() => self.refresh(credential).await,
            Some(_) => Ok(()),
        };

        if let Err(e) = outcome {
            if let IdentityError::Rejected { code, .. } = &e {
                warn!("Token refresh rejected ({}), signing out", code);
                guard.take();
                self.auth_state.send_replace(None);
            }
            return Err(e);
        }

        Ok(guard.as_ref().map(|credential| credential.id_token.clone()))
    }

    fn current_user(&self) -> Option<SignedInUser> {
        self.auth_state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<SignedInUser>> {
        self.auth_state.subscribe()
    }
}
