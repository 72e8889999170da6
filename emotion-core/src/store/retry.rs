use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::config::{StorageConfig, MAX_RETRY_DELAY};
use crate::models::{EmotionRecord, EmotionScore};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Upper bound for a single attempt.
    pub operation_timeout: Duration,
    /// Extra attempts after the first one fails transiently.
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl From<&StorageConfig> for RetryPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Wraps a store with a per-attempt timeout and bounded retry of transient
/// failures. Rejections and corrupt documents fail immediately.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: RecordStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, A, Fut>(&self, operation: &'static str, mut action: A) -> Result<T, StoreError>
    where
        A: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(self.policy.retry_delay_ms.max(1))
            .max_delay(MAX_RETRY_DELAY)
            .map(jitter)
            .take(self.policy.max_retries);
        let timeout = self.policy.operation_timeout;

        let result = RetryIf::spawn(
            strategy,
            || {
                let attempt = action();
                async move {
                    match tokio::time::timeout(timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(StoreError::Timeout(timeout)),
                    }
                }
            },
            |e: &StoreError| {
                let transient = e.is_transient();
                if transient {
                    tracing::warn!(operation, error = %e, "Transient storage failure");
                }
                transient
            },
        )
        .await;

        if let Err(e) = &result {
            tracing::error!(operation, error = %e, "Storage operation failed");
        }
        result
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for RetryingStore<S> {
    async fn insert_with_id(
        &self,
        id: Uuid,
        emotions: &[EmotionScore],
    ) -> Result<EmotionRecord, StoreError> {
        self.run("insert_record", || self.inner.insert_with_id(id, emotions))
            .await
    }

    async fn list_records_descending(&self) -> Result<Vec<EmotionRecord>, StoreError> {
        self.run("list_records", || self.inner.list_records_descending())
            .await
    }

    async fn ping(&self) -> Result<String, StoreError> {
        // Health probes report the current state; no retry.
        match tokio::time::timeout(self.policy.operation_timeout, self.inner.ping()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.policy.operation_timeout)),
        }
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
