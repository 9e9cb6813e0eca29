#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use profile_sync::auth::{JwtVerifier, TokenVerifier};
use profile_sync::config::AppConfig;
use profile_sync::database::{MemoryProfileStore, ProfileStore};
use profile_sync::routes;
use profile_sync::services::ProfileService;
use profile_sync::state::AppState;
use profile_sync::types::Profile;

pub const TEST_SECRET: &str = "integration-test-secret";

/// API server running inside the test's runtime, backed by an in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub verifier: Arc<JwtVerifier>,
    pub store: Arc<MemoryProfileStore>,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_verifier(None).await
    }

    /// Serve with `verifier` guarding the protected routes instead of the
    /// shared-secret one
    pub async fn spawn_with_verifier(verifier: Option<Arc<dyn TokenVerifier>>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryProfileStore::new());
        let jwt = Arc::new(JwtVerifier::new(TEST_SECRET, None, None)?);
        let guard: Arc<dyn TokenVerifier> = verifier.unwrap_or_else(|| jwt.clone() as Arc<dyn TokenVerifier>);
        let state = AppState::new(ProfileService::new(store.clone()), guard, AppConfig::development());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test server")?;
        let app = routes::app(state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let server = Self {
            port,
            base_url,
            verifier: jwt,
            store,
            handle,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A bearer token the server accepts for `uid`
    pub fn token_for(&self, uid: &str, email: Option<&str>) -> String {
        self.verifier
            .issue_token(uid, email.map(str::to_string), chrono::Duration::hours(1))
            .expect("failed to issue test token")
    }

    pub async fn seed(&self, profile: Profile) -> Result<()> {
        let id = profile.id.clone();
        self.store.create(&id, profile).await?;
        Ok(())
    }

    pub async fn stored(&self, uid: &str) -> Result<Option<Profile>> {
        Ok(self.store.get(uid).await?)
    }
}

pub fn jane(uid: &str) -> Profile {
    Profile {
        id: uid.to_string(),
        email: Some("jane@example.com".to_string()),
        display_name: Some("Jane Doe".to_string()),
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        age: Some(34),
        occupation: Some("Engineer".to_string()),
    }
}

pub fn unique_uid() -> String {
    format!("user-{}", uuid::Uuid::new_v4())
}
