/*!
 * Mock translator implementations for testing
 *
 * These stand in for a real machine translation backend so that batching
 * and pipeline tests never make external calls. Each one implements the
 * Translator trait and returns predetermined output.
 */

use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;

use subalign::translation::Translator;

/// Tracks backend calls so tests can assert on batching behaviour
#[derive(Debug, Default)]
pub struct CallTracker {
    /// Count of translate_batch calls made
    pub call_count: usize,
    /// Sizes of the batches received, in call order
    pub batch_sizes: Vec<usize>,
    /// Calls left that should fail before the backend recovers
    pub failures_remaining: usize,
}

/// Translator that records every batch and echoes the input back
#[derive(Debug, Default)]
pub struct RecordingTranslator {
    tracker: Arc<Mutex<CallTracker>>,
}

impl RecordingTranslator {
    /// Create a new recording translator
    pub fn new() -> Self {
        RecordingTranslator::default()
    }

    /// Get the call tracker
    pub fn tracker(&self) -> Arc<Mutex<CallTracker>> {
        self.tracker.clone()
    }

    /// Configure the mock to fail its next `count` calls
    pub fn fail_next_calls(&self, count: usize) {
        let mut tracker = self.tracker.lock().unwrap();
        tracker.failures_remaining = count;
    }
}

#[async_trait]
impl Translator for RecordingTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Vec<String>> {
        let mut tracker = self.tracker.lock().unwrap();
        tracker.call_count += 1;
        tracker.batch_sizes.push(texts.len());

        if tracker.failures_remaining > 0 {
            tracker.failures_remaining -= 1;
            bail!("simulated backend outage");
        }

        Ok(texts.to_vec())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Translator that never succeeds, for fall-back accounting tests
#[derive(Debug, Default)]
pub struct BrokenTranslator;

#[async_trait]
impl Translator for BrokenTranslator {
    async fn translate_batch(
        &self,
        _texts: &[String],
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Vec<String>> {
        bail!("backend permanently unavailable")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Translator that drops the first text of every batch
///
/// Returning the wrong count must be treated as a failed batch, not
/// silently accepted.
#[derive(Debug, Default)]
pub struct TruncatingTranslator;

#[async_trait]
impl Translator for TruncatingTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        _target_language: &str,
    ) -> Result<Vec<String>> {
        Ok(texts.iter().skip(1).cloned().collect())
    }

    fn name(&self) -> &str {
        "truncating"
    }
}
