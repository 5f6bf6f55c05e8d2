/*!
 * # subalign - adaptive subtitle segmentation, translation QA and timing alignment
 *
 * A Rust library that turns raw, timestamped speech transcripts into
 * well-formed subtitle segments, translates them, scores the translation,
 * and re-aligns the translated timing for speech synthesis.
 *
 * ## Features
 *
 * - Parse transcripts from SRT files or JSON fragment lists
 * - Deterministic cleanup of transcription artifacts and punctuation
 * - Content-aware re-segmentation (dialogue / lecture / technical /
 *   narrative / mixed), with sentence-boundary merging and safe splitting
 * - Batched, retrying translation behind a pluggable `Translator` trait
 * - Four-axis quality scoring with a bounded feedback loop over a small
 *   closed set of tunable parameters
 * - Per-language pacing-aware timestamp alignment with overlap repair
 * - Bilingual track assembly and JSON alignment export
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle`: Segment model, SRT/JSON parsing and formatting
 * - `normalize`: Correction rules and punctuation repair
 * - `terminology`: Terminology store and on-disk lexicon documents
 * - `classify`: Content-type classification
 * - `segmenter`: Content-aware adaptive segmentation
 * - `merger`: Sentence-boundary merging and long-segment splitting
 * - `translation`: Batched translation:
 *   - `translation::engine`: The `Translator` trait and retry policy
 *   - `translation::batch`: Concurrent batch fan-out with fallback
 * - `quality`: Multi-axis quality evaluation
 * - `feedback`: Closed-loop parameter tuning
 * - `align`: Timestamp alignment and alignment-document export
 * - `pipeline`: The end-to-end processing session
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the pipeline
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
pub mod align;
pub mod app_config;
pub mod classify;
pub mod errors;
pub mod feedback;
pub mod language_utils;
pub mod merger;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod segmenter;
pub mod subtitle;
pub mod terminology;
pub mod translation;

// Re-export main types for easier usage
pub use align::{AlignedSegment, AlignmentDocument, TimestampAligner};
pub use app_config::Config;
pub use classify::{ContentAnalysis, ContentClassifier, ContentKind};
pub use errors::{ConfigError, PipelineError, SubtitleError, TranslationError};
pub use feedback::{FeedbackController, ParameterKind};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use merger::{MergerConfig, SentenceBoundaryMerger};
pub use pipeline::{PipelineSession, RunOutcome, RunReport};
pub use quality::{QualityEvaluator, QualityReport};
pub use segmenter::{AdaptiveSegmenter, SegmentationStrategy};
pub use subtitle::{Segment, SubtitleTrack, WordTiming};
pub use translation::{BatchTranslator, MockTranslator, PassthroughTranslator, Translator};
