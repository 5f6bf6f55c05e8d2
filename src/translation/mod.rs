/*!
 * Batched translation over an injected backend.
 *
 * The pipeline treats translation as an external collaborator: anything
 * implementing the `Translator` trait can sit behind the batch layer. It is
 * split into two submodules:
 *
 * - `engine`: the `Translator` trait, retry policy and the mock backend
 * - `batch`: bounded-concurrency fan-out with ordered writeback and
 *   fall-back to the original text when a batch exhausts its retries
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOutcome, BatchTranslator};
pub use self::engine::{MockTranslator, PassthroughTranslator, RetryPolicy, Translator};

// Submodules
pub mod batch;
pub mod engine;
