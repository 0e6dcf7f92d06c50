/*!
 * # Chunkwise - chunked, cache-layered text translation
 *
 * A Rust library that serves translation requests through an LLM
 * chat-completion API while keeping upstream traffic low.
 *
 * ## Features
 *
 * - Sentence-aware chunking of long inputs
 * - Two-tier cache: per-process L1 in front of a shared, compressed L2
 *   with insert-if-absent writes
 * - Reuse of previously persisted translations
 * - Upstream client with bounded connections and 429 retry/backoff
 * - Background jobs with bounded chunk parallelism for long texts
 * - Cache invalidation driven by record changes
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration from flags, environment and JSON files
 * - `cache`: Cache keys and the L1/L2 tiers:
 *   - `cache::tiered`: The two-tier read-through cache
 *   - `cache::redis_tier`: Redis-backed shared tier
 * - `translation`: Chunking, prompts and chunk-level translation
 * - `providers`: Upstream clients:
 *   - `providers::openrouter`: OpenRouter chat completions client
 *   - `providers::mock`: Scripted provider for tests
 * - `database`: SQLite persistence of finalized translations
 * - `jobs`: Background job queue
 * - `pipeline`: Request dispatch, background worker and cache invalidation
 * - `language_utils`: Supported languages and CEFR levels
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cache;
pub mod database;
pub mod errors;
pub mod jobs;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cache::{CacheKey, TwoTierCache};
pub use errors::{CacheError, ProviderError, TranslationError, ValidationError};
pub use language_utils::{Level, get_language_name};
pub use pipeline::{Dispatcher, Pipeline, TranslateRequest, TranslateResponse};
pub use translation::TranslationService;
