/*!
 * Batch translation processing.
 *
 * Fans batches out over a bounded worker pool, retries each batch against
 * its budget, and writes results back by batch index so the output order
 * matches the input regardless of completion order. A batch that exhausts
 * its retries falls back to the original text and is counted, never raised.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use log::{debug, error};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::errors::TranslationError;

use super::engine::{RetryPolicy, Translator};

/// Concurrent batches in flight at once
const DEFAULT_CONCURRENCY: usize = 4;

/// What one full translation pass produced
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Translated texts in input order; failed batches carry original text
    pub texts: Vec<String>,

    /// Batches dispatched
    pub batches_total: usize,

    /// Batches that fell back to the original text
    pub batches_failed: usize,
}

/// Batch translator for processing texts with bounded concurrency
pub struct BatchTranslator {
    /// The backend to translate with
    translator: Arc<dyn Translator>,

    /// Texts per batch
    batch_size: usize,

    /// Maximum number of concurrent batches
    max_concurrent: usize,

    /// Per-batch retry budget
    retry: RetryPolicy,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(translator: Arc<dyn Translator>, batch_size: usize) -> Self {
        BatchTranslator {
            translator,
            batch_size: batch_size.max(1),
            max_concurrent: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate every text, preserving input order
    pub async fn translate(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> BatchOutcome {
        if texts.is_empty() {
            return BatchOutcome {
                texts: Vec::new(),
                batches_total: 0,
                batches_failed: 0,
            };
        }

        let batches: Vec<Vec<String>> = texts
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_batches = batches.len();

        // Limit concurrent backend calls
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        // Track progress
        let processed_batches = Arc::new(AtomicUsize::new(0));

        // Results land here keyed by batch index
        let results: Arc<Mutex<Vec<(usize, Result<Vec<String>, TranslationError>)>>> =
            Arc::new(Mutex::new(Vec::with_capacity(total_batches)));

        stream::iter(batches.into_iter().enumerate())
            .map(|(batch_index, batch)| {
                let translator = Arc::clone(&self.translator);
                let semaphore = Arc::clone(&semaphore);
                let processed_batches = Arc::clone(&processed_batches);
                let results = Arc::clone(&results);
                let progress_callback = progress_callback.clone();
                let retry = self.retry.clone();
                let source_language = source_language.to_string();
                let target_language = target_language.to_string();

                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    debug!("Processing batch {} of {}", batch_index + 1, total_batches);

                    let result = translate_with_retries(
                        translator.as_ref(),
                        &batch,
                        &source_language,
                        &target_language,
                        &retry,
                        batch_index,
                    )
                    .await;

                    let current = processed_batches.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_batches);

                    results.lock().push((batch_index, result));
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<()>>()
            .await;

        // Reassemble in input order
        let mut collected = std::mem::take(&mut *results.lock());
        collected.sort_by_key(|(index, _)| *index);

        let mut out = Vec::with_capacity(texts.len());
        let mut batches_failed = 0;
        for (batch_index, result) in collected {
            match result {
                Ok(translated) => out.extend(translated),
                Err(e) => {
                    error!("Batch {} fell back to original text: {}", batch_index + 1, e);
                    batches_failed += 1;
                    let start = batch_index * self.batch_size;
                    let end = (start + self.batch_size).min(texts.len());
                    out.extend(texts[start..end].iter().cloned());
                }
            }
        }

        BatchOutcome {
            texts: out,
            batches_total: total_batches,
            batches_failed,
        }
    }
}

/// Run one batch against the backend within its retry budget
async fn translate_with_retries(
    translator: &dyn Translator,
    batch: &[String],
    source_language: &str,
    target_language: &str,
    retry: &RetryPolicy,
    batch_index: usize,
) -> Result<Vec<String>, TranslationError> {
    let attempts_allowed = retry.max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=attempts_allowed {
        match translator
            .translate_batch(batch, source_language, target_language)
            .await
        {
            Ok(translated) if translated.len() == batch.len() => return Ok(translated),
            Ok(translated) => {
                last_error = TranslationError::CountMismatch {
                    expected: batch.len(),
                    got: translated.len(),
                }
                .to_string();
            }
            Err(e) => last_error = e.to_string(),
        }

        if attempt < attempts_allowed {
            tokio::time::sleep(retry.backoff).await;
        }
    }

    Err(TranslationError::BatchExhausted {
        index: batch_index,
        attempts: attempts_allowed,
        message: last_error,
    })
}
