/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which chunks input
 * text, serves chunks from the chunk cache where possible, and sends the
 * rest to a provider with a bounded number of calls in flight.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::cache::{CacheKey, TwoTierCache};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils::{Level, level_tag};
use crate::providers::Provider;

use super::chunker::{self, Chunk};

/// Separator between translated chunks in the merged output
pub const CHUNK_SEPARATOR: &str = "\n";

/// Translation options for customizing the translation process
#[derive(Debug, Clone, Copy)]
pub struct TranslationOptions {
    /// Maximum characters per chunk
    pub max_chars_per_chunk: usize,

    /// Maximum number of chunk translations in flight for one text
    pub max_concurrent_requests: usize,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            max_chars_per_chunk: chunker::DEFAULT_MAX_CHARS,
            max_concurrent_requests: 5,
        }
    }
}

/// Chunked, cache-aware translation over a provider
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Shared two-tier cache; chunk entries live here
    cache: Arc<TwoTierCache>,

    /// Translation options
    pub options: TranslationOptions,
}

impl TranslationService {
    /// Create a new translation service
    pub fn new(provider: Arc<dyn Provider>, cache: Arc<TwoTierCache>, options: TranslationOptions) -> Self {
        Self {
            provider,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<TwoTierCache> {
        &self.cache
    }

    /// Split text using the configured chunk size
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        chunker::split(text, self.options.max_chars_per_chunk)
    }

    /// Translate one chunk, consulting and filling the chunk cache
    pub async fn translate_chunk(
        &self,
        chunk: &str,
        source_language: &str,
        target_language: &str,
        level: Option<Level>,
    ) -> Result<String, ProviderError> {
        let key = CacheKey::chunk(chunk, source_language, target_language, level_tag(level));

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Chunk cache hit ({} -> {})", source_language, target_language);
            return Ok(cached);
        }

        debug!("Chunk cache miss, asking {}", self.provider.name());
        let translated = self
            .provider
            .translate(chunk, source_language, target_language, level)
            .await?;

        self.cache.set(&key, &translated, None).await;
        Ok(translated)
    }

    /// Translate a whole text with at most `concurrency` chunks in flight.
    ///
    /// Chunk outputs are joined with [`CHUNK_SEPARATOR`] in input order. The
    /// first failing chunk aborts the whole text.
    pub async fn translate_text(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        level: Option<Level>,
        concurrency: usize,
    ) -> Result<String, TranslationError> {
        let chunks = self.chunk(text);
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let start_time = Instant::now();
        let total = chunks.len();
        let concurrency = concurrency.max(1);

        // Create a semaphore to limit concurrent requests
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let mut results = stream::iter(chunks)
            .map(|chunk| {
                let semaphore = semaphore.clone();

                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| TranslationError::Queue(e.to_string()))?;

                    let translated = self
                        .translate_chunk(&chunk.text, source_language, target_language, level)
                        .await?;

                    debug!("Chunk {}/{} translated", chunk.index + 1, total);
                    Ok::<_, TranslationError>((chunk.index, translated))
                }
            })
            .buffer_unordered(concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        // Completion order is arbitrary; restore input order
        results.sort_by_key(|(index, _)| *index);

        info!(
            "Translated {} chunk(s) {} -> {} in {:?}",
            total,
            source_language,
            target_language,
            start_time.elapsed()
        );

        Ok(results
            .into_iter()
            .map(|(_, translated)| translated)
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR))
    }
}
