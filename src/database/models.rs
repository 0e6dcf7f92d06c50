/*!
 * Database entity models.
 *
 * These structures map directly to the `translations` table and to the
 * change events the store emits.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cache::CacheKey;

/// A persisted, finalized translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Row id
    pub id: i64,
    /// Owning user
    pub owner: i64,
    /// Trimmed input text
    pub input_text: String,
    /// Merged translation
    pub output_text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// CEFR level tag, empty when not applicable
    pub level: String,
    /// Creation time (RFC 3339, UTC)
    pub created_at: String,
}

impl TranslationRecord {
    /// Full-text cache key this record's output is cached under
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::translation(&self.input_text, &self.source_lang, &self.target_lang, &self.level)
    }
}

/// Fields of a record that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslation {
    pub owner: i64,
    pub input_text: String,
    pub output_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub level: String,
}

impl NewTranslation {
    /// Attach the id and timestamp assigned on insert
    pub fn into_record(self, id: i64, created_at: String) -> TranslationRecord {
        TranslationRecord {
            id,
            owner: self.owner,
            input_text: self.input_text,
            output_text: self.output_text,
            source_lang: self.source_lang,
            target_lang: self.target_lang,
            level: self.level,
            created_at,
        }
    }
}

/// Current time in the format stored in `created_at`
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Change notification for a translation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    Created(TranslationRecord),
    Deleted(TranslationRecord),
}

impl RecordEvent {
    pub fn record(&self) -> &TranslationRecord {
        match self {
            Self::Created(record) | Self::Deleted(record) => record,
        }
    }
}

impl fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(record) => write!(f, "created #{}", record.id),
            Self::Deleted(record) => write!(f, "deleted #{}", record.id),
        }
    }
}
