use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// The (query, region) pair stored under an identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SavedQuery {
    pub query: String,
    pub region: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Identifier → (query, region) store shared by all request handlers.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Stores the pair under a freshly generated identifier and returns it.
    async fn add(&self, query: &str, region: &str) -> Result<String, RegistryError>;

    async fn get(&self, uuid: &str) -> Result<Option<SavedQuery>, RegistryError>;

    /// Releases backend resources. Called once at shutdown.
    async fn close(&self) {}
}

/// Time-ordered, 32 hex chars.
pub fn new_identifier() -> String {
    Uuid::now_v7().simple().to_string()
}

// -------------------------
// In-memory
// -------------------------

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: RwLock<HashMap<String, SavedQuery>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn add(&self, query: &str, region: &str) -> Result<String, RegistryError> {
        let uuid = new_identifier();
        let saved = SavedQuery {
            query: query.to_string(),
            region: region.to_string(),
        };
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uuid.clone(), saved);
        Ok(uuid)
    }

    async fn get(&self, uuid: &str) -> Result<Option<SavedQuery>, RegistryError> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(uuid).cloned())
    }
}

// -------------------------
// SQLite
// -------------------------

const CREATE_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS queries (
        uuid TEXT PRIMARY KEY,
        query TEXT NOT NULL,
        region TEXT NOT NULL
    )
";

pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Opens (creating if needed) the database at `url` and ensures the table exists.
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // every connection to `:memory:` is its own database
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        info!(%url, "sqlite registry ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Registry for SqliteRegistry {
    async fn add(&self, query: &str, region: &str) -> Result<String, RegistryError> {
        let uuid = new_identifier();
        sqlx::query("INSERT INTO queries (uuid, query, region) VALUES (?, ?, ?)")
            .bind(&uuid)
            .bind(query)
            .bind(region)
            .execute(&self.pool)
            .await?;
        Ok(uuid)
    }

    async fn get(&self, uuid: &str) -> Result<Option<SavedQuery>, RegistryError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT query, region FROM queries WHERE uuid = ? LIMIT 1")
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(query, region)| SavedQuery { query, region }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
