use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Profile, ProfilePatch};

/// Errors from a profile store backend. Surfaced to callers unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt profile document '{id}': {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            e @ (sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Sqlx(other),
        }
    }
}

/// One document per identity key
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Idempotent upsert of the full document. The stored `id` is always `id`.
    async fn create(&self, id: &str, profile: Profile) -> Result<(), StoreError>;

    /// Merge the present fields of `patch` into the document, creating it when
    /// absent. `patch.id` is never written.
    async fn merge_update(&self, id: &str, patch: &ProfilePatch) -> Result<(), StoreError>;

    /// Connectivity probe for the health endpoint
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
