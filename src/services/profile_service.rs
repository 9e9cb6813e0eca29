use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::database::{ProfileStore, StoreError};
use crate::types::{NewProfile, Profile, ProfilePatch};

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("User ID in body does not match authenticated user ID")]
    IdentityMismatch,
    #[error("No valid data provided")]
    EmptyUpdate,
    #[error("User not found")]
    NotFound,
    #[error("Profile disappeared between write and re-read")]
    VanishedAfterWrite,
    #[error("Failed to {operation} user data: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

fn store_error(operation: &'static str) -> impl FnOnce(StoreError) -> ProfileServiceError {
    move |source| ProfileServiceError::Store { operation, source }
}

/// Fetch, partial-update, and registration-time create of the caller's own
/// profile. `uid` is always the verified identity, never a body value.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, uid: &str) -> Result<Profile, ProfileServiceError> {
        self.store
            .get(uid)
            .await
            .map_err(store_error("fetch"))?
            .ok_or(ProfileServiceError::NotFound)
    }

    /// Validate, merge-write, then re-read the full document
    pub async fn update(&self, uid: &str, patch: ProfilePatch) -> Result<Profile, ProfileServiceError> {
        if let Some(body_id) = patch.id.as_deref() {
            if body_id != uid {
                warn!("Rejected update for '{}': body id '{}' does not match", uid, body_id);
                return Err(ProfileServiceError::IdentityMismatch);
            }
        }

        let patch = patch.without_id();
        if patch.is_empty() {
            return Err(ProfileServiceError::EmptyUpdate);
        }

        debug!("Updating profile '{}' fields {:?}", uid, patch.field_names());
        self.store
            .merge_update(uid, &patch)
            .await
            .map_err(store_error("update"))?;

        match self.store.get(uid).await.map_err(store_error("update"))? {
            Some(profile) => Ok(profile),
            None => {
                warn!("Profile '{}' missing on re-read after a successful write", uid);
                Err(ProfileServiceError::VanishedAfterWrite)
            }
        }
    }

    /// Write the initial document at registration. Email comes from the
    /// verified credential.
    pub async fn create(
        &self,
        uid: &str,
        email: Option<String>,
        initial: NewProfile,
    ) -> Result<Profile, ProfileServiceError> {
        let profile = initial.into_profile(uid, email);
        self.store
            .create(uid, profile.clone())
            .await
            .map_err(store_error("create"))?;

        info!("Profile '{}' created", uid);
        Ok(profile)
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
