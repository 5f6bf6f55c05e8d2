/*!
 * The translation backend seam.
 *
 * `Translator` is the only contract the pipeline has with the outside
 * translation service: a batch of texts in, the same number of texts out.
 * The mock backend keeps the whole pipeline runnable and testable without
 * any network collaborator.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// A batched translation backend
///
/// Implementations must return exactly one output text per input text, in
/// the same order. Anything else is treated as a failed batch and retried.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a batch of texts between the given languages
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>>;

    /// Short backend name for logs
    fn name(&self) -> &str {
        "translator"
    }
}

/// Retry budget applied to each batch before falling back
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Backend that returns every text unchanged
///
/// The default for the command-line tool: segmentation, alignment and
/// scoring stay useful on a single language, and a real backend can be
/// injected through the library API.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl PassthroughTranslator {
    pub fn new() -> Self {
        PassthroughTranslator
    }
}

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Vec<String>> {
        Ok(texts.to_vec())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Deterministic in-process backend for tests and dry runs
///
/// Echoes each text prefixed with the target language tag. A failure budget
/// makes the first N calls fail, which exercises the retry and fall-back
/// paths without a real backend.
#[derive(Debug, Default)]
pub struct MockTranslator {
    failures_remaining: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose first `count` calls fail
    pub fn failing_first(count: usize) -> Self {
        MockTranslator {
            failures_remaining: AtomicUsize::new(count),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>> {
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            .is_ok();
        if should_fail {
            bail!("simulated translation failure");
        }

        Ok(texts
            .iter()
            .map(|text| format!("[{target_language}] {text}"))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
