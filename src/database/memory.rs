use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{ProfileStore, StoreError};
use crate::types::{Profile, ProfilePatch};

/// In-process profile store, used when no database is configured
#[derive(Default)]
pub struct MemoryProfileStore {
    documents: RwLock<HashMap<String, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn create(&self, id: &str, mut profile: Profile) -> Result<(), StoreError> {
        profile.id = id.to_string();
        self.documents.write().await.insert(id.to_string(), profile);
        Ok(())
    }

    async fn merge_update(&self, id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .entry(id.to_string())
            .or_insert_with(|| Profile::new(id, None));
        patch.apply_to(document);
        Ok(())
    }
}
