/*!
 * End-to-end tests of synchronous request dispatch
 */

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use chunkwise::cache::{CacheKey, RemoteTier};
use chunkwise::database::{NewTranslation, TranslationStore};
use chunkwise::pipeline::TranslateRequest;
use chunkwise::providers::mock::MockProvider;
use chunkwise::providers::openrouter::{OpenRouter, OpenRouterConfig, RetryPolicy};

use crate::common::fake_upstream::{FakeUpstream, Reply};
use crate::common::{self, harness, harness_with, test_config};

fn hello_a1() -> TranslateRequest {
    TranslateRequest::new(1, "Hello. How are you?")
        .languages("en", "de")
        .with_level("A1")
}

#[tokio::test]
async fn test_freshRequest_shouldTranslatePersistAndCache() {
    let h = harness(MockProvider::working());

    let response = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({"translation": "[de A1] Hello. How are you?"}));
    assert_eq!(h.provider.request_count(), 1);

    let records = h.pipeline.store().list_for_owner(1).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, "A1");
    assert_eq!(records[0].output_text, "[de A1] Hello. How are you?");

    let key = CacheKey::translation("Hello. How are you?", "en", "de", "A1");
    assert!(h.remote.get(&key.to_string()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_repeatedRequest_shouldHitCacheWithoutUpstream() {
    let h = harness(MockProvider::working());
    let first = h.pipeline.dispatcher().handle(hello_a1()).await;

    let second = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(second.status, 200);
    assert_eq!(second.body, first.body);
    assert_eq!(h.provider.request_count(), 1);
}

#[tokio::test]
async fn test_missingLevel_forGerman_shouldRejectWithoutSideEffects() {
    let h = harness(MockProvider::working());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "de").with_level("");

    let response = h.pipeline.dispatcher().handle(request).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body, json!({"error": "Invalid or missing CEFR level"}));
    assert_eq!(h.provider.request_count(), 0);
    assert_eq!(h.pipeline.store().connection().record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknownLanguage_shouldReject() {
    let h = harness(MockProvider::working());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "xx");

    let response = h.pipeline.dispatcher().handle(request).await;

    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"], "Invalid language code");
}

#[tokio::test]
async fn test_levelOnNonGermanTarget_shouldBeIgnored() {
    let h = harness(MockProvider::working());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "fr").with_level("B2");

    let response = h.pipeline.dispatcher().handle(request).await;

    assert_eq!(response.status, 201);
    assert_eq!(response.body["translation"], "[fr] Hello.");
    let records = h.pipeline.store().list_for_owner(1).await.unwrap();
    assert_eq!(records[0].level, "");
}

#[tokio::test]
async fn test_surroundingWhitespace_shouldShareCacheEntry() {
    let h = harness(MockProvider::working());
    h.pipeline.dispatcher().handle(hello_a1()).await;

    let padded = TranslateRequest::new(2, "  Hello. How are you?\n")
        .languages("en", "de")
        .with_level("A1");
    let response = h.pipeline.dispatcher().handle(padded).await;

    assert_eq!(response.status, 200);
    assert_eq!(h.provider.request_count(), 1);
}

#[tokio::test]
async fn test_storedRecord_shouldBeReusedAndBackfilled() {
    let h = harness(MockProvider::working());
    h.pipeline
        .store()
        .create(NewTranslation {
            owner: 9,
            input_text: "Hello.".to_string(),
            output_text: "Salut.".to_string(),
            source_lang: "en".to_string(),
            target_lang: "fr".to_string(),
            level: String::new(),
        })
        .await
        .unwrap();

    let request = TranslateRequest::new(1, "Hello.").languages("en", "fr");
    let response = h.pipeline.dispatcher().handle(request.clone()).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["translation"], "Salut.");
    assert_eq!(h.provider.request_count(), 0);

    let key = CacheKey::translation("Hello.", "en", "fr", "");
    assert_eq!(h.pipeline.cache().get(&key).await.as_deref(), Some("Salut."));
}

#[tokio::test]
async fn test_expiredLocalEntry_shouldRefillFromSharedTier() {
    let h = harness(MockProvider::working());
    h.pipeline.dispatcher().handle(hello_a1()).await;

    h.clock.advance(Duration::from_secs(301));
    let response = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 200);
    assert_eq!(h.provider.request_count(), 1);
}

#[tokio::test]
async fn test_sharedTierOffline_shouldStillServe() {
    let h = harness(MockProvider::working());
    h.remote.set_available(false);

    let first = h.pipeline.dispatcher().handle(hello_a1()).await;
    let second = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(first.status, 201);
    assert_eq!(second.status, 200);
    assert_eq!(h.provider.request_count(), 1);
}

#[tokio::test]
async fn test_upstreamUnavailable_shouldAnswer503AndPersistNothing() {
    let h = harness(MockProvider::unavailable());

    let response = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 503);
    assert_eq!(
        response.body,
        json!({"error": "Upstream translation service unavailable. Please try later."})
    );
    assert_eq!(h.pipeline.store().connection().record_count().unwrap(), 0);
    assert!(h.remote.is_empty());
}

#[tokio::test]
async fn test_upstreamHttpError_shouldSurfaceSameStatus() {
    let h = harness(MockProvider::failing());

    let response = h.pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 500);
    assert!(response.body["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_partialFailure_shouldDiscardAndReuseChunksOnRetry() {
    let mut config = test_config();
    config.max_chars_per_request = 30;
    let h = harness_with(MockProvider::intermittent(2), config);
    let text = common::sentences(2);
    let request = TranslateRequest::new(1, text.clone()).languages("en", "fr");

    let failed = h.pipeline.dispatcher().handle(request.clone()).await;
    assert_eq!(failed.status, 503);
    assert_eq!(h.pipeline.store().connection().record_count().unwrap(), 0);

    let retried = h.pipeline.dispatcher().handle(request).await;
    assert_eq!(retried.status, 201);
    assert_eq!(
        retried.body["translation"],
        "[fr] Sentence number 0 is here.\n[fr] Sentence number 1 is here."
    );
    assert_eq!(h.provider.request_count(), 3);
}

fn upstream_pipeline(url: &str) -> chunkwise::pipeline::Pipeline {
    upstream_pipeline_with_timeout(url, OpenRouterConfig::default().timeout)
}

fn upstream_pipeline_with_timeout(url: &str, timeout: Duration) -> chunkwise::pipeline::Pipeline {
    let provider = OpenRouter::new(OpenRouterConfig {
        endpoint: url.to_string(),
        timeout,
        retry: RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
        ..OpenRouterConfig::default()
    })
    .unwrap();
    let (pipeline, _, _) = common::pipeline_with(Arc::new(provider), test_config());
    pipeline
}

#[tokio::test]
async fn test_rateLimitedThreeTimes_shouldStillTranslate() {
    let upstream = FakeUpstream::start(
        vec![Reply::RateLimited, Reply::RateLimited, Reply::RateLimited],
        Reply::Completion("Hallo. Wie geht es dir?".into()),
    )
    .await;
    let pipeline = upstream_pipeline(&upstream.url);

    let response = pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 201);
    assert_eq!(response.body["translation"], "Hallo. Wie geht es dir?");
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_rateLimitedFourTimes_shouldAnswer429AndPersistNothing() {
    let upstream = FakeUpstream::start(vec![], Reply::RateLimited).await;
    let pipeline = upstream_pipeline(&upstream.url);

    let response = pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 429);
    assert_eq!(
        response.body,
        json!({"error": "Upstream rate limit still exceeded. Please try later."})
    );
    assert_eq!(pipeline.store().connection().record_count().unwrap(), 0);
    assert_eq!(upstream.hits(), 4);
}

#[tokio::test]
async fn test_stalledUpstream_shouldAnswer503AndPersistNothing() {
    let upstream = FakeUpstream::start(vec![], Reply::Stall).await;
    let pipeline = upstream_pipeline_with_timeout(&upstream.url, Duration::from_millis(300));

    let response = pipeline.dispatcher().handle(hello_a1()).await;

    assert_eq!(response.status, 503);
    assert_eq!(
        response.body,
        json!({"error": "Upstream translation service unavailable. Please try later."})
    );
    assert_eq!(pipeline.store().connection().record_count().unwrap(), 0);
    let key = CacheKey::translation("Hello. How are you?", "en", "de", "A1");
    assert!(pipeline.cache().get(&key).await.is_none());
}
