use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::api::ProfileApiClient;
use super::error::ClientError;
use super::identity::{IdentityProvider, SignedInUser};
use super::session::{SessionEvent, SessionState, SessionStore};
use crate::types::{NewProfile, Profile, ProfilePatch};

pub const FETCH_GUARD_MESSAGE: &str = "User not authenticated to fetch details.";
pub const UPDATE_GUARD_MESSAGE: &str = "User not authenticated to update details.";

/// Sign-up form contents
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Profile),
    /// Nothing differed from the current profile; no request was sent
    NoChanges,
}

impl UpdateOutcome {
    pub fn notice(&self) -> &'static str {
        match self {
            UpdateOutcome::Updated(_) => "Details updated successfully!",
            UpdateOutcome::NoChanges => "No changes to update.",
        }
    }
}

/// Drives the session store: each action marks the store pending, performs
/// its remote calls, then records the outcome. Concurrent actions are not
/// serialized; whichever resolves last wins.
#[derive(Clone)]
pub struct SessionClient {
    store: SessionStore,
    identity: Arc<dyn IdentityProvider>,
    api: ProfileApiClient,
    sequence: Arc<AtomicU64>,
}

impl SessionClient {
    pub fn new(identity: Arc<dyn IdentityProvider>, api_base_url: impl Into<String>) -> Self {
        let api = ProfileApiClient::new(api_base_url, identity.clone());
        Self {
            store: SessionStore::new(),
            identity,
            api,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, ClientError> {
        let seq = self.begin("login");
        match self.identity.sign_in(email, password).await {
            Ok(user) => {
                let profile = Profile::from(&user);
                self.finish(seq, "login", SessionEvent::Authenticated(profile.clone()));
                Ok(profile)
            }
            Err(e) => {
                let e = ClientError::from(e);
                self.finish(seq, "login", SessionEvent::AuthRejected(message_or(&e, "Login failed")));
                Err(e)
            }
        }
    }

    /// Create the account, then write the initial profile document
    pub async fn register(&self, registration: &Registration) -> Result<Profile, ClientError> {
        let seq = self.begin("register");
        match self.create_account(registration).await {
            Ok(profile) => {
                self.finish(seq, "register", SessionEvent::Authenticated(profile.clone()));
                Ok(profile)
            }
            Err(e) => {
                self.finish(seq, "register", SessionEvent::AuthRejected(message_or(&e, "Register failed")));
                Err(e)
            }
        }
    }

    async fn create_account(&self, registration: &Registration) -> Result<Profile, ClientError> {
        let user = self.identity.sign_up(&registration.email, &registration.password).await?;
        let initial = initial_profile(&user, registration);
        let stored = self.api.create_profile(&initial).await?;

        Profile::from(&user)
            .merged_with(&stored)
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }

    /// Local state is cleared even when the provider call fails
    pub async fn logout(&self) -> Result<(), ClientError> {
        let seq = self.begin("logout");
        let result = self.identity.sign_out().await;
        if let Err(e) = &result {
            warn!("Sign-out failed, clearing local session anyway: {}", e);
        }
        self.finish(seq, "logout", SessionEvent::SignedOut);
        result.map_err(ClientError::from)
    }

    pub async fn fetch_details(&self) -> Result<Profile, ClientError> {
        let seq = self.begin("fetch_details");
        let current = match self.authenticated_user() {
            Some(user) => user,
            None => return Err(self.reject(seq, "fetch_details", ClientError::NotAuthenticated(FETCH_GUARD_MESSAGE.into()))),
        };

        let fields = match self.api.fetch_profile().await {
            Ok(fields) => fields,
            Err(e) => return Err(self.reject_with_default(seq, "fetch_details", e, "Failed to fetch details")),
        };

        match current.merged_with(&fields) {
            Ok(profile) => {
                self.finish(seq, "fetch_details", SessionEvent::ProfileMerged(fields));
                Ok(profile)
            }
            Err(e) => Err(self.reject(seq, "fetch_details", ClientError::Malformed(e.to_string()))),
        }
    }

    /// Sends only the fields of `desired` that differ from the current user
    pub async fn update_details(&self, desired: ProfilePatch) -> Result<UpdateOutcome, ClientError> {
        let Some(current) = self.authenticated_user() else {
            let seq = self.begin("update_details");
            return Err(self.reject(seq, "update_details", ClientError::NotAuthenticated(UPDATE_GUARD_MESSAGE.into())));
        };

        let diff = desired.without_id().changed_from(&current);
        if diff.is_empty() {
            debug!("update_details: no changes for {}", current.id);
            return Ok(UpdateOutcome::NoChanges);
        }

        let seq = self.begin("update_details");
        let fields = match self.api.update_profile(&diff).await {
            Ok(fields) => fields,
            Err(e) => return Err(self.reject_with_default(seq, "update_details", e, "Failed to update details")),
        };

        match current.merged_with(&fields) {
            Ok(profile) => {
                self.finish(seq, "update_details", SessionEvent::ProfileMerged(fields));
                Ok(UpdateOutcome::Updated(profile))
            }
            Err(e) => Err(self.reject(seq, "update_details", ClientError::Malformed(e.to_string()))),
        }
    }

    /// Mirror the identity provider's auth state into the store until the
    /// provider goes away. The current state is applied immediately.
    pub fn watch_auth_state(&self) -> JoinHandle<()> {
        let mut changes = self.identity.subscribe();
        let store = self.store.clone();
        tokio::spawn(async move {
            loop {
                let user = changes.borrow_and_update().clone();
                store.dispatch(SessionEvent::AuthStateChanged(user.as_ref().map(Profile::from)));
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Apply the provider's current user once, without a listener
    pub fn sync_auth_state(&self) {
        let user = self.identity.current_user();
        self.store
            .dispatch(SessionEvent::AuthStateChanged(user.as_ref().map(Profile::from)));
    }

    fn authenticated_user(&self) -> Option<Profile> {
        self.store.snapshot().user.filter(|user| !user.id.is_empty())
    }

    fn begin(&self, action: &'static str) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, action, "pending");
        self.store.dispatch(SessionEvent::Pending);
        seq
    }

    fn finish(&self, seq: u64, action: &'static str, event: SessionEvent) {
        let superseded = seq < self.sequence.load(Ordering::SeqCst);
        debug!(seq, action, superseded, "settled");
        self.store.dispatch(event);
    }

    fn reject(&self, seq: u64, action: &'static str, error: ClientError) -> ClientError {
        self.finish(seq, action, SessionEvent::Rejected(error.to_string()));
        error
    }

    fn reject_with_default(&self, seq: u64, action: &'static str, error: ClientError, fallback: &str) -> ClientError {
        self.finish(seq, action, SessionEvent::Rejected(message_or(&error, fallback)));
        error
    }
}

fn message_or(error: &ClientError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Initial document for a new account. Display name falls back to
/// "first last" when the provider has none.
pub fn initial_profile(user: &SignedInUser, registration: &Registration) -> NewProfile {
    let first = registration.first_name.clone().unwrap_or_default();
    let last = registration.last_name.clone().unwrap_or_default();
    let display_name = user
        .display_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{} {}", first, last).trim().to_string());

    NewProfile {
        display_name: Some(display_name),
        first_name: Some(first),
        last_name: Some(last),
        age: registration.age,
        occupation: Some(registration.occupation.clone().unwrap_or_default()),
    }
}
