use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// A single ranked detection: a label and the detector's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub id: Uuid,
    pub emotions: Vec<EmotionScore>,
    pub timestamp: DateTime<Utc>,
}

/// Row shape of `emotion_records`; `emotions` is stored as a JSONB document.
#[derive(Debug, sqlx::FromRow)]
pub struct EmotionRow {
    pub id: Uuid,
    pub emotions: Json<Vec<EmotionScore>>,
    pub timestamp: DateTime<Utc>,
}

impl From<EmotionRow> for EmotionRecord {
    fn from(row: EmotionRow) -> Self {
        Self {
            id: row.id,
            emotions: row.emotions.0,
            timestamp: row.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_serializes_with_string_id_and_iso_timestamp() {
        let record = EmotionRecord {
            id: Uuid::nil(),
            emotions: vec![EmotionScore {
                emotion: "happy".to_string(),
                confidence: 0.92,
            }],
            timestamp: Utc.with_ymd_and_hms(2025, 2, 14, 9, 30, 0).unwrap(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["timestamp"], "2025-02-14T09:30:00Z");
        assert_eq!(value["emotions"][0]["emotion"], "happy");
        assert_eq!(value["emotions"][0]["confidence"], 0.92);
    }

    #[test]
    fn test_row_converts_into_record() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let row = EmotionRow {
            id,
            emotions: Json(vec![EmotionScore {
                emotion: "sad".to_string(),
                confidence: 0.4,
            }]),
            timestamp: now,
        };

        let record = EmotionRecord::from(row);
        assert_eq!(record.id, id);
        assert_eq!(record.emotions.len(), 1);
        assert_eq!(record.timestamp, now);
    }
}
