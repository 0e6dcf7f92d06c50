/*!
 * Background translation of long texts.
 */

use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::CacheKey;
use crate::database::{NewTranslation, TranslationStore};
use crate::errors::{TranslationError, ValidationError};
use crate::jobs::{JobHandler, JobSpec};
use crate::language_utils::Level;
use crate::translation::TranslationService;

/// Translates a queued text with bounded chunk parallelism, then persists and caches it.
///
/// The number of chunks in flight per job is the service's
/// `max_concurrent_requests`.
pub struct BackgroundWorker {
    service: TranslationService,
    store: Arc<dyn TranslationStore>,
}

impl BackgroundWorker {
    pub fn new(service: TranslationService, store: Arc<dyn TranslationStore>) -> Self {
        Self { service, store }
    }

    fn cache_key(spec: &JobSpec) -> CacheKey {
        spec.cache_key.parse().unwrap_or_else(|e| {
            warn!("Job carried an unusable cache key ({}), recomputing", e);
            CacheKey::translation(&spec.text, &spec.source_lang, &spec.target_lang, &spec.level)
        })
    }
}

#[async_trait]
impl JobHandler for BackgroundWorker {
    async fn run(&self, spec: &JobSpec) -> Result<String, TranslationError> {
        let level = if spec.level.is_empty() {
            None
        } else {
            Some(spec.level.parse::<Level>().map_err(|_| ValidationError::InvalidLevel)?)
        };

        let start_time = Instant::now();
        let translation = self
            .service
            .translate_text(
                &spec.text,
                &spec.source_lang,
                &spec.target_lang,
                level,
                self.service.options.max_concurrent_requests,
            )
            .await?;

        self.store
            .create(NewTranslation {
                owner: spec.user_id,
                input_text: spec.text.clone(),
                output_text: translation.clone(),
                source_lang: spec.source_lang.clone(),
                target_lang: spec.target_lang.clone(),
                level: spec.level.clone(),
            })
            .await
            .map_err(|e| TranslationError::Store(e.to_string()))?;

        self.service
            .cache()
            .set(&Self::cache_key(spec), &translation, None)
            .await;

        info!(
            "Background translation of {} chars finished in {:?}",
            spec.text.chars().count(),
            start_time.elapsed()
        );
        Ok(translation)
    }
}
