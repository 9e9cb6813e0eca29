pub mod auth;
pub mod profile;

use std::sync::Arc;

use crate::cli::config;
use crate::client::{ClientConfig, RestIdentityProvider, SessionClient};

/// A session client wired to the persisted credential, if any
pub struct CliSession {
    pub identity: Arc<RestIdentityProvider>,
    pub session: SessionClient,
}

impl CliSession {
    pub fn open() -> anyhow::Result<Self> {
        let client_config = ClientConfig::from_env()?;
        let identity = match config::load_session()? {
            Some(credential) => RestIdentityProvider::with_credential(client_config.identity.clone(), credential),
            None => RestIdentityProvider::new(client_config.identity.clone()),
        };
        let identity = Arc::new(identity);
        let session = SessionClient::new(identity.clone(), client_config.api_base_url);
        session.sync_auth_state();

        Ok(Self { identity, session })
    }

    /// Write back whatever credential the provider now holds
    pub async fn persist(&self) -> anyhow::Result<()> {
        match self.identity.credential().await {
            Some(credential) => config::save_session(&credential),
            None => config::clear_session(),
        }
    }
}
