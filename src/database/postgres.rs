use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::info;

use super::store::{ProfileStore, StoreError};
use crate::config::DatabaseConfig;
use crate::types::{Profile, ProfilePatch};

/// PostgreSQL-backed document store: one JSONB document per identity key
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        info!("Connected profile store to PostgreSQL");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool; later calls fail with `StoreError::Unavailable`
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL DEFAULT '{}'::jsonb,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as("SELECT doc FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some((Json(mut doc),)) = row else {
            return Ok(None);
        };

        // The addressing key is authoritative for the id
        if let Value::Object(map) = &mut doc {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }

        let profile = serde_json::from_value(doc).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })?;
        Ok(Some(profile))
    }

    async fn create(&self, id: &str, mut profile: Profile) -> Result<(), StoreError> {
        profile.id = id.to_string();

        sqlx::query(
            r#"
            INSERT INTO profiles (id, doc) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = now()
            "#,
        )
        .bind(id)
        .bind(Json(&profile))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn merge_update(&self, id: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        let mut fields = patch.fields();
        fields.insert("id".to_string(), Value::String(id.to_string()));

        sqlx::query(
            r#"
            INSERT INTO profiles (id, doc) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = profiles.doc || EXCLUDED.doc, updated_at = now()
            "#,
        )
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
