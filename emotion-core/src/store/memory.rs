use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::{EmotionRecord, EmotionScore};

/// Process-local store. Keeps records in insertion order.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<EmotionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Stores with `now` as the creation time, clamped so timestamps never
    /// go backwards relative to insertion order.
    async fn insert_at(
        &self,
        id: Uuid,
        emotions: &[EmotionScore],
        now: DateTime<Utc>,
    ) -> EmotionRecord {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter().find(|r| r.id == id) {
            return existing.clone();
        }

        let timestamp = records.last().map_or(now, |last| last.timestamp.max(now));
        let record = EmotionRecord {
            id,
            emotions: emotions.to_vec(),
            timestamp,
        };
        records.push(record.clone());
        record
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_with_id(
        &self,
        id: Uuid,
        emotions: &[EmotionScore],
    ) -> Result<EmotionRecord, StoreError> {
        Ok(self.insert_at(id, emotions, Utc::now()).await)
    }

    async fn list_records_descending(&self) -> Result<Vec<EmotionRecord>, StoreError> {
        // Timestamps are non-decreasing in insertion order.
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }

    async fn ping(&self) -> Result<String, StoreError> {
        Ok("memory".to_string())
    }
}
