use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::types::{Profile, ProfileFields};

/// Client-side view of the session. `is_authenticated` is only ever true
/// while `user` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<Profile>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An action started
    Pending,
    Authenticated(Profile),
    AuthRejected(String),
    SignedOut,
    /// Fields returned by the server, shallow-merged onto the current user
    ProfileMerged(ProfileFields),
    /// A profile action failed; the user is kept
    Rejected(String),
    Settled,
    /// Pushed by the identity provider's auth-state listener
    AuthStateChanged(Option<Profile>),
}

impl SessionState {
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Pending => {
                self.loading = true;
                self.error = None;
            }
            SessionEvent::Authenticated(profile) => {
                self.user = Some(profile);
                self.is_authenticated = true;
                self.loading = false;
                self.error = None;
            }
            SessionEvent::AuthRejected(message) => {
                self.user = None;
                self.is_authenticated = false;
                self.loading = false;
                self.error = Some(message);
            }
            SessionEvent::SignedOut => *self = SessionState::default(),
            SessionEvent::ProfileMerged(fields) => {
                self.loading = false;
                let merged = match &self.user {
                    Some(user) => user.merged_with(&fields),
                    None => serde_json::from_value(Value::Object(fields)),
                };
                match merged {
                    Ok(profile) => {
                        self.user = Some(profile);
                        self.error = None;
                    }
                    Err(e) => self.error = Some(format!("Malformed profile response: {}", e)),
                }
            }
            SessionEvent::Rejected(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            SessionEvent::Settled => self.loading = false,
            SessionEvent::AuthStateChanged(None) => {
                self.user = None;
                self.is_authenticated = false;
            }
            SessionEvent::AuthStateChanged(Some(profile)) => {
                // Same identity: refresh auth-derived fields, keep loaded details
                let user = match self.user.take() {
                    Some(mut current) if current.id == profile.id => {
                        current.email = profile.email;
                        if profile.display_name.is_some() {
                            current.display_name = profile.display_name;
                        }
                        current
                    }
                    _ => profile,
                };
                self.user = Some(user);
                self.is_authenticated = true;
            }
        }
    }
}

/// Shared session state with change notification
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state: Arc::new(state) }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn dispatch(&self, event: SessionEvent) {
        self.state.send_modify(|state| state.apply(event));
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
