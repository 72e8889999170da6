pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod validation;

pub use config::EmotionConfig;
pub use error::EmotionError;
pub use models::{EmotionRecord, EmotionScore};
pub use store::{
    build_store, MemoryRecordStore, PgRecordStore, RecordStore, RetryingStore, StoreError,
};
pub use validation::{validate, validate_bytes, ValidatedEmotions, ValidationError};
