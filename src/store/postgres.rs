//! PostgreSQL document store for production use.
//!
//! Documents of every collection live in one JSONB table keyed by
//! `(collection, key)`. Conflict detection on create relies on the primary
//! key, so concurrent creators of the same edge see exactly one `Created`.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 1)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;

use super::query::SqlParam;
use super::{document_key, stamp_identity, CreateOutcome, DocumentStore, Query, RemoveOutcome, UpdateOutcome};

/// SQL schema for the document table, one statement per entry.
pub const DOCUMENT_TABLE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS lsgraph_documents (
        collection TEXT NOT NULL,
        key TEXT NOT NULL,
        body JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, key)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_lsgraph_documents_body
        ON lsgraph_documents USING GIN (body jsonb_path_ops)
    "#,
];

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 1).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300).
    pub idle_timeout_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/jalapeno".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 1),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Document has no `_key`.
    #[error("Document has no _key")]
    MissingKey,
    /// Document is not a JSON object.
    #[error("Document is not a JSON object")]
    NotAnObject,
}

/// PostgreSQL document store.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Create the document table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in DOCUMENT_TABLE_SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    type Error = PostgresError;

    async fn read_document(&self, collection: &str, key: &str) -> Result<Option<Value>, Self::Error> {
        let row = sqlx::query("SELECT body FROM lsgraph_documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let Json(body): Json<Value> = r.try_get("body")?;
                Ok(Some(body))
            }
            None => Ok(None),
        }
    }

    async fn create_document(&self, collection: &str, document: Value) -> Result<CreateOutcome, Self::Error> {
        let key = document_key(&document).ok_or(PostgresError::MissingKey)?.to_string();
        let document = stamp_identity(collection, &key, document).ok_or(PostgresError::NotAnObject)?;

        let result = sqlx::query(
            r#"
            INSERT INTO lsgraph_documents (collection, key, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(&key)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            CreateOutcome::Conflict
        } else {
            CreateOutcome::Created
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<UpdateOutcome, Self::Error> {
        let document = stamp_identity(collection, key, document).ok_or(PostgresError::NotAnObject)?;

        let result = sqlx::query(
            r#"
            UPDATE lsgraph_documents
            SET body = $3, updated_at = NOW()
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            UpdateOutcome::NotFound
        } else {
            UpdateOutcome::Updated
        })
    }

    async fn remove_document(&self, collection: &str, key: &str) -> Result<RemoveOutcome, Self::Error> {
        let row = sqlx::query(
            "DELETE FROM lsgraph_documents WHERE collection = $1 AND key = $2 RETURNING body",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let Json(body): Json<Value> = r.try_get("body")?;
                Ok(RemoveOutcome::Removed(body))
            }
            None => Ok(RemoveOutcome::NotFound),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Value>, Self::Error> {
        let (predicate, params) = query.to_sql_predicate("body", 2);
        let sql = format!(
            "SELECT body FROM lsgraph_documents WHERE collection = $1 AND {} ORDER BY key",
            predicate
        );

        let mut statement = sqlx::query(&sql).bind(query.collection().to_string());
        for param in params {
            statement = match param {
                SqlParam::Text(text) => statement.bind(text),
                SqlParam::Json(value) => statement.bind(Json(value)),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get::<Json<Value>, _>("body").map(|Json(body)| body))
            .collect::<Result<Vec<_>, _>>()
            .map_err(PostgresError::from)
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
