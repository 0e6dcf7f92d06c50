/*!
 * Tests for the background job path
 */

use chunkwise::cache::CacheKey;
use chunkwise::database::TranslationStore;
use chunkwise::jobs::{JobQueue, JobState};
use chunkwise::pipeline::TranslateRequest;
use chunkwise::providers::mock::MockProvider;

use crate::common::{self, finish_job, harness_with, test_config};

fn long_text_config() -> chunkwise::Config {
    let mut config = test_config();
    config.async_threshold = 50;
    config.max_chars_per_request = 30;
    config
}

fn expected_output(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("[fr] Sentence number {} is here.", i))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_longText_shouldBeQueuedAndCompleteInOrder() {
    let h = harness_with(MockProvider::slow(30), long_text_config());
    let text = common::sentences(6);
    let request = TranslateRequest::new(4, text.clone()).languages("en", "fr");

    let response = h.pipeline.dispatcher().handle(request.clone()).await;
    assert_eq!(response.status, 202);
    assert_eq!(response.body["status"], "queued");
    let job_id = response.body["task_id"].as_str().unwrap().to_string();

    let early = h.pipeline.dispatcher().job_status(&job_id).await.unwrap();
    assert!(matches!(early.state, JobState::Queued | JobState::Started));

    let done = finish_job(&h.pipeline, &job_id).await;
    assert_eq!(done.state, JobState::Success);
    assert_eq!(done.result.as_deref(), Some(expected_output(6).as_str()));
    assert!(done.finished_at >= done.started_at);

    assert!(h.provider.peak_in_flight() <= 3);
    assert_eq!(h.provider.request_count(), 6);

    let records = h.pipeline.store().list_for_owner(4).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].output_text, expected_output(6));

    let cached = h.pipeline.dispatcher().handle(request).await;
    assert_eq!(cached.status, 200);
    assert_eq!(cached.body["translation"], expected_output(6));
    assert_eq!(h.provider.request_count(), 6);
}

#[tokio::test]
async fn test_forceAsync_withShortText_shouldQueue() {
    let h = harness_with(MockProvider::working(), test_config());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "fr").force_async();

    let response = h.pipeline.dispatcher().handle(request).await;

    assert_eq!(response.status, 202);
    let job_id = response.body["task_id"].as_str().unwrap();
    let done = finish_job(&h.pipeline, job_id).await;
    assert_eq!(done.result.as_deref(), Some("[fr] Hello."));

    let key = CacheKey::translation("Hello.", "en", "fr", "");
    assert_eq!(h.pipeline.cache().get(&key).await.as_deref(), Some("[fr] Hello."));
}

#[tokio::test]
async fn test_cachedText_shouldNotBeQueuedEvenIfLong() {
    let h = harness_with(MockProvider::working(), long_text_config());
    let text = common::sentences(4);
    let key = CacheKey::translation(&text, "en", "fr", "");
    h.pipeline.cache().set(&key, "cached", None).await;

    let response = h
        .pipeline
        .dispatcher()
        .handle(TranslateRequest::new(1, text).languages("en", "fr"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(h.pipeline.queue().pending(), 0);
}

#[tokio::test]
async fn test_failingUpstream_shouldRetryJobThenReportFailure() {
    let h = harness_with(MockProvider::failing(), test_config());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "fr").force_async();

    let response = h.pipeline.dispatcher().handle(request).await;
    let job_id = response.body["task_id"].as_str().unwrap();
    let done = finish_job(&h.pipeline, job_id).await;

    assert_eq!(done.state, JobState::Failure);
    assert!(done.error.unwrap().contains("500"));
    assert_eq!(h.provider.request_count(), 4);
    assert_eq!(h.pipeline.store().connection().record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_transientOutage_shouldRecoverOnJobRetry() {
    let h = harness_with(MockProvider::fail_first(1), test_config());
    let request = TranslateRequest::new(1, "Hello.").languages("en", "es").force_async();

    let response = h.pipeline.dispatcher().handle(request).await;
    let job_id = response.body["task_id"].as_str().unwrap();
    let done = finish_job(&h.pipeline, job_id).await;

    assert_eq!(done.state, JobState::Success);
    assert_eq!(done.attempts, 2);
}

#[tokio::test]
async fn test_poll_withUnknownJob_shouldReturnNone() {
    let h = harness_with(MockProvider::working(), test_config());
    assert!(h.pipeline.dispatcher().job_status("missing").await.is_none());
    assert!(h.pipeline.queue().poll("missing").await.is_none());
}
