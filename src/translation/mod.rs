/*!
 * Chunked text translation.
 *
 * This module contains the translation path shared by synchronous requests
 * and background jobs. It is split into several submodules:
 *
 * - `chunker`: Sentence-aware splitting into size-bounded chunks
 * - `prompts`: Prompt templates and token budgeting
 * - `core`: Cache-aware, bounded-concurrency chunk translation
 */

// Re-export main types for easier usage
pub use self::chunker::Chunk;
pub use self::core::{CHUNK_SEPARATOR, TranslationOptions, TranslationService};

// Submodules
pub mod chunker;
pub mod core;
pub mod prompts;
