/*!
 * Provider implementations for the upstream text-generation service.
 *
 * This module contains client implementations behind a common trait:
 * - OpenRouter: OpenAI-compatible chat completions API
 * - Mock: scripted provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::language_utils::Level;

/// Common trait for all chunk translation providers
///
/// Implementations translate exactly one chunk per call, so the pipeline can
/// cache, retry and parallelise at chunk granularity.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate a single chunk
    ///
    /// # Arguments
    /// * `chunk` - Text to translate
    /// * `source_lang` - ISO 639-1 source code
    /// * `target_lang` - ISO 639-1 target code
    /// * `level` - CEFR level, only meaningful for the leveled target language
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(
        &self,
        chunk: &str,
        source_lang: &str,
        target_lang: &str,
        level: Option<Level>,
    ) -> Result<String, ProviderError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

pub mod mock;
pub mod openrouter;
