/*!
 * Prompt templates for chunk translation.
 *
 * One system prompt is shared by every request. The user prompt names the
 * source and target languages and, for the leveled target language, the
 * CEFR level the output should be written at.
 */

use crate::language_utils::{self, Level};

/// User prompt template with placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: &'static str,
}

impl PromptTemplate {
    /// System prompt sent with every chunk.
    pub const SYSTEM: &'static str =
        "You are a professional translator. Reply ONLY with the translated text.";

    /// Instruction for the leveled target language.
    pub const LEVELED: &'static str =
        "Translate the following text from {source_language} to {target_language} ({level}).\n\n{text}";

    /// Plain cross-language instruction.
    pub const PLAIN: &'static str = "Translate from {source_language} to {target_language}:\n\n{text}";

    pub fn leveled() -> Self {
        Self {
            template: Self::LEVELED,
        }
    }

    pub fn plain() -> Self {
        Self {
            template: Self::PLAIN,
        }
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str, level: &str, text: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
            .replace("{level}", level)
            .replace("{text}", text)
    }
}

/// Builder for the system and user prompt of one chunk.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    target_code: String,
    level: Option<Level>,
}

impl TranslationPromptBuilder {
    /// Create a builder for a language pair given as ISO 639-1 codes.
    ///
    /// Codes without a known name are used as-is.
    pub fn new(source_code: &str, target_code: &str) -> Self {
        Self {
            source_language: language_utils::get_language_name(source_code)
                .unwrap_or_else(|_| source_code.to_string()),
            target_language: language_utils::get_language_name(target_code)
                .unwrap_or_else(|_| target_code.to_string()),
            target_code: target_code.to_string(),
            level: None,
        }
    }

    /// Set the proficiency level. Only honoured for the leveled target language.
    pub fn with_level(mut self, level: Option<Level>) -> Self {
        self.level = level;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        PromptTemplate::SYSTEM.to_string()
    }

    pub fn build_user_prompt(&self, text: &str) -> String {
        match self.level {
            Some(level) if language_utils::requires_level(&self.target_code) => PromptTemplate::leveled()
                .render(&self.source_language, &self.target_language, level.as_str(), text),
            _ => PromptTemplate::plain().render(&self.source_language, &self.target_language, "", text),
        }
    }

    /// Build both system and user prompts.
    pub fn build(&self, text: &str) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt(text))
    }
}

/// Token budget for a chunk: four per word, never below 60.
pub fn max_tokens_for(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.saturating_mul(4).max(60)
}
