/*!
 * Prompt construction for chunk translation.
 *
 * This module provides:
 * - The shared system prompt
 * - Leveled and plain user prompt templates
 * - Token budgeting per chunk
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, TranslationPromptBuilder, max_tokens_for};
