use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{self, TokenVerifier};
use crate::config::AppConfig;
use crate::database::{MemoryProfileStore, PgProfileStore, ProfileStore};
use crate::services::ProfileService;

/// Dependencies shared by every request, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileService,
    pub verifier: Arc<dyn TokenVerifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(profiles: ProfileService, verifier: Arc<dyn TokenVerifier>, config: AppConfig) -> Self {
        Self {
            profiles,
            verifier,
            config: Arc::new(config),
        }
    }

    /// Wire the store and verifier selected by configuration
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ProfileStore> = match config.database.url.as_deref() {
            Some(url) => Arc::new(PgProfileStore::connect(url, &config.database).await?),
            None => {
                warn!("DATABASE_URL not set; profiles are kept in memory and lost on restart");
                Arc::new(MemoryProfileStore::new())
            }
        };

        let verifier = auth::build_verifier(&config.auth)?;
        info!("Token verification mode: {:?}", config.auth.mode);

        Ok(Self::new(ProfileService::new(store), verifier, config))
    }
}
