/*!
 * Request dispatch.
 *
 * A request moves through `validate -> full-text cache -> record reuse ->
 * (synchronous translation | background job) -> persist + cache -> respond`.
 * Cache and record hits answer 200, a fresh synchronous translation answers
 * 201 and an enqueued job answers 202 with its id.
 */

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::cache::CacheKey;
use crate::database::{NewTranslation, TranslationStore};
use crate::errors::{TranslationError, ValidationError};
use crate::jobs::{JobQueue, JobSpec, JobStatus, short_id};
use crate::language_utils::{self, Level, level_tag};
use crate::translation::TranslationService;

pub const DEFAULT_SOURCE_LANG: &str = "en";
pub const DEFAULT_TARGET_LANG: &str = "de";

/// An incoming translation request; absent fields take their defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub input_text: String,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    /// Send to a background job regardless of length
    #[serde(default, rename = "async")]
    pub force_async: bool,
}

impl TranslateRequest {
    pub fn new(user_id: i64, input_text: impl Into<String>) -> Self {
        Self {
            user_id,
            input_text: input_text.into(),
            ..Default::default()
        }
    }

    pub fn languages(mut self, source: &str, target: &str) -> Self {
        self.source_lang = Some(source.to_string());
        self.target_lang = Some(target.to_string());
        self
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = Some(level.to_string());
        self
    }

    pub fn force_async(mut self) -> Self {
        self.force_async = true;
        self
    }
}

/// A request that passed validation, with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub user_id: i64,
    /// Trimmed input
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Only set for targets that take a level
    pub level: Option<Level>,
    pub force_async: bool,
}

impl ValidatedRequest {
    pub fn level_tag(&self) -> &'static str {
        level_tag(self.level)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::translation(&self.text, &self.source_lang, &self.target_lang, self.level_tag())
    }
}

/// Apply defaults, trim the text and check languages and level
pub fn validate(request: &TranslateRequest) -> Result<ValidatedRequest, ValidationError> {
    let source_lang = request
        .source_lang
        .as_deref()
        .unwrap_or(DEFAULT_SOURCE_LANG)
        .to_string();
    let target_lang = request
        .target_lang
        .as_deref()
        .unwrap_or(DEFAULT_TARGET_LANG)
        .to_string();

    for lang in [&source_lang, &target_lang] {
        if !language_utils::is_supported(lang) {
            return Err(ValidationError::InvalidLanguage(lang.clone()));
        }
    }

    let level = if language_utils::requires_level(&target_lang) {
        let raw = request.level.as_deref().unwrap_or_default().trim();
        Some(raw.parse::<Level>().map_err(|_| ValidationError::InvalidLevel)?)
    } else {
        None
    };

    let text = request.input_text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }

    Ok(ValidatedRequest {
        user_id: request.user_id,
        text: text.to_string(),
        source_lang,
        target_lang,
        level,
        force_async: request.force_async,
    })
}

/// How a request was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Served from the full-text cache
    Cached(String),
    /// Served from a persisted record
    Reused(String),
    /// Translated synchronously and persisted
    Created(String),
    /// Handed to a background job
    Queued(String),
}

impl DispatchOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Cached(_) | Self::Reused(_) => 200,
            Self::Created(_) => 201,
            Self::Queued(_) => 202,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Cached(text) | Self::Reused(text) | Self::Created(text) => {
                json!({ "translation": text })
            }
            Self::Queued(job_id) => json!({ "task_id": job_id, "status": "queued" }),
        }
    }
}

/// Status code and JSON body handed back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateResponse {
    pub status: u16,
    pub body: Value,
}

impl From<DispatchOutcome> for TranslateResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            status: outcome.status_code(),
            body: outcome.body(),
        }
    }
}

impl From<TranslationError> for TranslateResponse {
    fn from(error: TranslationError) -> Self {
        Self {
            status: error.status_code(),
            body: json!({ "error": error.client_message() }),
        }
    }
}

/// Routes requests between caches, stored records, the upstream and the job queue
#[derive(Clone)]
pub struct Dispatcher {
    service: TranslationService,
    store: Arc<dyn TranslationStore>,
    queue: Arc<dyn JobQueue>,
    async_threshold: usize,
}

impl Dispatcher {
    pub fn new(
        service: TranslationService,
        store: Arc<dyn TranslationStore>,
        queue: Arc<dyn JobQueue>,
        async_threshold: usize,
    ) -> Self {
        Self {
            service,
            store,
            queue,
            async_threshold,
        }
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Serve a request end to end and render the response
    pub async fn handle(&self, request: TranslateRequest) -> TranslateResponse {
        match self.dispatch(request).await {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                if e.status_code() >= 500 {
                    error!("Translation request failed: {}", e);
                } else {
                    debug!("Translation request rejected: {}", e);
                }
                e.into()
            }
        }
    }

    /// Serve a request end to end
    pub async fn dispatch(&self, request: TranslateRequest) -> Result<DispatchOutcome, TranslationError> {
        let request = validate(&request)?;
        let key = request.cache_key();
        let cache = self.service.cache();

        if let Some(cached) = cache.get(&key).await {
            debug!("Full-text cache hit for {}", key);
            return Ok(DispatchOutcome::Cached(cached));
        }

        let existing = self
            .store
            .find_latest(&request.text, &request.source_lang, &request.target_lang, request.level_tag())
            .await
            .map_err(|e| TranslationError::Store(e.to_string()))?;

        if let Some(record) = existing {
            debug!("Reusing stored translation {}", record.id);
            cache.set(&key, &record.output_text, None).await;
            return Ok(DispatchOutcome::Reused(record.output_text));
        }

        let char_count = request.text.chars().count();
        if request.force_async || char_count > self.async_threshold {
            let job_id = self
                .queue
                .submit(JobSpec {
                    user_id: request.user_id,
                    text: request.text.clone(),
                    source_lang: request.source_lang.clone(),
                    target_lang: request.target_lang.clone(),
                    level: request.level_tag().to_string(),
                    cache_key: key.to_string(),
                })
                .await?;
            info!("Queued {} chars as job {}", char_count, short_id(&job_id));
            return Ok(DispatchOutcome::Queued(job_id));
        }

        let translation = self
            .service
            .translate_text(&request.text, &request.source_lang, &request.target_lang, request.level, 1)
            .await?;

        self.store
            .create(NewTranslation {
                owner: request.user_id,
                input_text: request.text.clone(),
                output_text: translation.clone(),
                source_lang: request.source_lang.clone(),
                target_lang: request.target_lang.clone(),
                level: request.level_tag().to_string(),
            })
            .await
            .map_err(|e| TranslationError::Store(e.to_string()))?;

        cache.set(&key, &translation, None).await;
        Ok(DispatchOutcome::Created(translation))
    }

    /// Current state of a background job
    pub async fn job_status(&self, job_id: &str) -> Option<JobStatus> {
        self.queue.poll(job_id).await
    }
}
