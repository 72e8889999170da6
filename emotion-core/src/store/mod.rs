//! Persistence adapter for emotion records.
//!
//! [`RecordStore`] is the seam between the HTTP layer and the document store.
//! Handlers hold an `Arc<dyn RecordStore>`; production wires a
//! [`PgRecordStore`] behind a [`RetryingStore`], local runs and tests can use
//! [`MemoryRecordStore`].

mod memory;
mod postgres;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{EmotionConfig, StorageBackend};
use crate::db;
use crate::error::EmotionError;
use crate::models::{EmotionRecord, EmotionScore};

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use retry::{RetryPolicy, RetryingStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store rejected operation: {0}")]
    Rejected(String),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether another attempt could succeed without any change to the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(e.to_string())
            }
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `emotions` under a caller-chosen id. Writing the same id twice
    /// must return the first stored record rather than a duplicate.
    async fn insert_with_id(
        &self,
        id: Uuid,
        emotions: &[EmotionScore],
    ) -> Result<EmotionRecord, StoreError>;

    /// All records, most recent first. Records sharing a timestamp come back
    /// in reverse insertion order.
    async fn list_records_descending(&self) -> Result<Vec<EmotionRecord>, StoreError>;

    /// Backend identification string, used for health reporting.
    async fn ping(&self) -> Result<String, StoreError>;

    /// Assigns a fresh id and timestamp and stores the record.
    async fn insert_record(
        &self,
        emotions: Vec<EmotionScore>,
    ) -> Result<EmotionRecord, StoreError> {
        self.insert_with_id(Uuid::new_v4(), &emotions).await
    }

    async fn close(&self) {}
}

/// Build the configured backend, applying the startup connection policy.
pub async fn build_store(config: &EmotionConfig) -> Result<Arc<dyn RecordStore>, EmotionError> {
    let policy = RetryPolicy::from(&config.storage);

    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory record store (records are lost on exit)");
            Ok(Arc::new(RetryingStore::new(MemoryRecordStore::new(), policy)))
        }
        StorageBackend::Postgres => {
            let store = match db::create_pool(&config.database).await {
                Ok(pool) => {
                    tracing::info!("Connected to database");
                    let store = PgRecordStore::new(pool);
                    store.ensure_schema().await?;
                    store
                }
                Err(e) if !config.database.exit_on_connect_failure => {
                    tracing::error!(
                        "Database connection failed, continuing with a lazy pool: {}",
                        e
                    );
                    PgRecordStore::new(db::create_lazy_pool(&config.database)?)
                }
                Err(e) => return Err(e.into()),
            };
            Ok(Arc::new(RetryingStore::new(store, policy)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::Timeout(Duration::from_millis(5)).is_transient());
        assert!(!StoreError::Rejected("constraint".into()).is_transient());
        assert!(!StoreError::Corrupt("bad json".into()).is_transient());
    }

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = EmotionConfig::from_toml_str("[storage]\nbackend = \"memory\"\n").unwrap();
        let store = build_store(&config).await.unwrap();

        let saved = store
            .insert_record(vec![EmotionScore {
                emotion: "happy".to_string(),
                confidence: 0.9,
            }])
            .await
            .unwrap();

        let all = store.list_records_descending().await.unwrap();
        assert_eq!(all, vec![saved]);
        assert_eq!(store.ping().await.unwrap(), "memory");
    }
}
