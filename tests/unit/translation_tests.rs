/*!
 * Tests for the batched translation layer
 */

use std::sync::Arc;
use std::time::Duration;

use subalign::translation::{
    BatchTranslator, MockTranslator, PassthroughTranslator, RetryPolicy, Translator,
};

use crate::common::mock_translators::{BrokenTranslator, RecordingTranslator, TruncatingTranslator};

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("line {i}")).collect()
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff: Duration::from_millis(1),
    }
}

/// Test that inputs are chunked by the configured batch size
#[tokio::test]
async fn test_batchTranslator_translate_shouldChunkByBatchSize() {
    let backend = Arc::new(RecordingTranslator::new());
    let tracker = backend.tracker();
    let translator = BatchTranslator::new(backend, 2).with_concurrency(1);

    let outcome = translator.translate(&texts(5), "en", "zh", |_, _| {}).await;

    assert_eq!(outcome.batches_total, 3);
    assert_eq!(outcome.batches_failed, 0);
    assert_eq!(outcome.texts, texts(5), "Echoing backend returns input order");

    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.call_count, 3);
    assert_eq!(tracker.batch_sizes, vec![2, 2, 1]);
}

/// Test that a transient failure is retried and recovers
#[tokio::test]
async fn test_batchTranslator_translate_withTransientFailure_shouldRetryAndRecover() {
    let backend = Arc::new(RecordingTranslator::new());
    backend.fail_next_calls(1);
    let tracker = backend.tracker();
    let translator = BatchTranslator::new(backend, 10)
        .with_concurrency(1)
        .with_retry_policy(fast_retry(2));

    let outcome = translator.translate(&texts(3), "en", "zh", |_, _| {}).await;

    assert_eq!(outcome.batches_failed, 0, "Retry should absorb the failure");
    assert_eq!(outcome.texts, texts(3));
    assert_eq!(tracker.lock().unwrap().call_count, 2, "One failure plus one retry");
}

/// Test that an unavailable backend falls back to the original texts
#[tokio::test]
async fn test_batchTranslator_translate_withBrokenBackend_shouldFallBackToInput() {
    let translator = BatchTranslator::new(Arc::new(BrokenTranslator), 2)
        .with_concurrency(2)
        .with_retry_policy(fast_retry(1));

    let input = texts(4);
    let outcome = translator.translate(&input, "en", "zh", |_, _| {}).await;

    assert_eq!(outcome.batches_total, 2);
    assert_eq!(outcome.batches_failed, 2, "Every batch should report fallback");
    assert_eq!(outcome.texts, input, "Fallback keeps the untranslated text in place");
}

/// Test that a count mismatch is treated as a failed batch
#[tokio::test]
async fn test_batchTranslator_translate_withCountMismatch_shouldFallBackToInput() {
    let translator = BatchTranslator::new(Arc::new(TruncatingTranslator), 3)
        .with_concurrency(1)
        .with_retry_policy(fast_retry(0));

    let input = texts(3);
    let outcome = translator.translate(&input, "en", "zh", |_, _| {}).await;

    assert_eq!(outcome.batches_failed, 1);
    assert_eq!(outcome.texts, input, "Short output must not shift later texts");
}

/// Test that empty input produces an empty outcome without backend calls
#[tokio::test]
async fn test_batchTranslator_translate_withEmptyInput_shouldShortCircuit() {
    let backend = Arc::new(RecordingTranslator::new());
    let tracker = backend.tracker();
    let translator = BatchTranslator::new(backend, 10);

    let outcome = translator.translate(&[], "en", "zh", |_, _| {}).await;

    assert_eq!(outcome.batches_total, 0);
    assert!(outcome.texts.is_empty());
    assert_eq!(tracker.lock().unwrap().call_count, 0);
}

/// Test that the progress callback sees every batch completion
#[tokio::test]
async fn test_batchTranslator_translate_shouldReportProgressPerBatch() {
    use std::sync::Mutex;

    let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);

    let translator = BatchTranslator::new(Arc::new(PassthroughTranslator::new()), 2)
        .with_concurrency(1);
    translator
        .translate(&texts(5), "en", "zh", move |done, total| {
            seen_clone.lock().unwrap().push((done, total));
        })
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3, "One callback per batch");
    assert_eq!(*seen.last().unwrap(), (3, 3));
}

/// Test the mock backend's language tagging
#[tokio::test]
async fn test_mockTranslator_translateBatch_shouldTagWithTargetLanguage() {
    let translator = MockTranslator::new();
    let out = translator
        .translate_batch(&["hello".to_string()], "en", "zh")
        .await
        .unwrap();
    assert_eq!(out, vec!["[zh] hello".to_string()]);
    assert_eq!(translator.name(), "mock");
}

/// Test the passthrough backend returns input unchanged
#[tokio::test]
async fn test_passthroughTranslator_translateBatch_shouldEchoInput() {
    let translator = PassthroughTranslator::new();
    let input = texts(2);
    let out = translator.translate_batch(&input, "en", "en").await.unwrap();
    assert_eq!(out, input);
    assert_eq!(translator.name(), "passthrough");
}
