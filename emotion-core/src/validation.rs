//! Shape checks for inbound emotion payloads.
//!
//! Expected body: `{"emotions": [{"emotion": "<label>", "confidence": <number>}, ...]}`.
//! Unknown fields are ignored. The result is a typed list that the storage
//! layer can persist without further inspection.

use serde_json::Value;
use thiserror::Error;

use crate::config::ValidationConfig;
use crate::models::EmotionScore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Request body is not valid JSON")]
    MalformedJson,

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing 'emotions' field")]
    MissingEmotions,

    #[error("'emotions' must be an array")]
    EmotionsNotAnArray,

    #[error("'emotions' must not be empty")]
    EmptyEmotions,

    #[error("'emotions' may contain at most {max} entries")]
    TooManyEntries { max: usize },

    #[error("emotions[{index}] must be an object")]
    EntryNotAnObject { index: usize },

    #[error("emotions[{index}].emotion must be a string without NUL characters")]
    InvalidLabel { index: usize },

    #[error("emotions[{index}].confidence must be a number")]
    InvalidConfidence { index: usize },

    #[error("emotions[{index}].confidence {value} is out of range")]
    ConfidenceOutOfRange { index: usize, value: f64 },
}

/// Emotions that passed validation, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEmotions(pub Vec<EmotionScore>);

impl ValidatedEmotions {
    pub fn into_inner(self) -> Vec<EmotionScore> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a raw request body and validate it.
pub fn validate_bytes(
    body: &[u8],
    rules: &ValidationConfig,
) -> Result<ValidatedEmotions, ValidationError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::MalformedJson)?;
    validate(&payload, rules)
}

pub fn validate(
    payload: &Value,
    rules: &ValidationConfig,
) -> Result<ValidatedEmotions, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

    let entries = match object.get("emotions") {
        None | Some(Value::Null) => return Err(ValidationError::MissingEmotions),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(ValidationError::EmotionsNotAnArray),
    };

    if entries.is_empty() && !rules.allow_empty {
        return Err(ValidationError::EmptyEmotions);
    }

    if let Some(max) = rules.max_entries {
        if entries.len() > max {
            return Err(ValidationError::TooManyEntries { max });
        }
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_entry(index, entry, rules))
        .collect::<Result<Vec<_>, _>>()
        .map(ValidatedEmotions)
}

fn validate_entry(
    index: usize,
    entry: &Value,
    rules: &ValidationConfig,
) -> Result<EmotionScore, ValidationError> {
    let entry = entry
        .as_object()
        .ok_or(ValidationError::EntryNotAnObject { index })?;

    let emotion = entry
        .get("emotion")
        .and_then(Value::as_str)
        // JSONB cannot store U+0000, so it is a client error here rather
        // than a failed write later.
        .filter(|label| !label.contains('\0'))
        .ok_or(ValidationError::InvalidLabel { index })?;

    // serde_json never yields NaN or infinity from parsed input, but values
    // built in code can carry them.
    let confidence = entry
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .ok_or(ValidationError::InvalidConfidence { index })?;

    let below = rules.min_confidence.is_some_and(|min| confidence < min);
    let above = rules.max_confidence.is_some_and(|max| confidence > max);
    if below || above {
        return Err(ValidationError::ConfidenceOutOfRange {
            index,
            value: confidence,
        });
    }

    Ok(EmotionScore {
        emotion: emotion.to_string(),
        confidence,
    })
}
