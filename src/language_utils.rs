//! Language utilities for the translation pipeline
//!
//! Requests may only name languages from a fixed supported set. German is
//! the one target language whose output is shaped by a CEFR proficiency level.

use anyhow::{Result, anyhow};
use isolang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language codes accepted as source or target (ISO 639-1)
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "de", "fr", "es", "it", "pt", "nl", "pl"];

/// Target language for which a proficiency level is mandatory
pub const LEVELED_LANGUAGE: &str = "de";

/// CEFR proficiency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
}

impl Level {
    /// All levels accepted by the pipeline
    pub const ALL: [Level; 4] = [Level::A1, Level::A2, Level::B1, Level::B2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A1" => Ok(Self::A1),
            "A2" => Ok(Self::A2),
            "B1" => Ok(Self::B1),
            "B2" => Ok(Self::B2),
            _ => Err(anyhow!("Invalid CEFR level: {}", s)),
        }
    }
}

/// Check whether a code belongs to the supported set (exact, lowercase match)
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// Whether translating into `target` requires a proficiency level
pub fn requires_level(target: &str) -> bool {
    target == LEVELED_LANGUAGE
}

/// Level string used in cache keys and persisted records ("" when absent)
pub fn level_tag(level: Option<Level>) -> &'static str {
    level.map(|l| l.as_str()).unwrap_or("")
}

/// Get the English language name for a supported code
pub fn get_language_name(code: &str) -> Result<String> {
    if !is_supported(code) {
        return Err(anyhow!("Unsupported language code: {}", code));
    }

    let lang = Language::from_639_1(code)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}
