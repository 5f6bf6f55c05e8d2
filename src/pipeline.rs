/*!
 * End-to-end processing session: normalize, classify, segment, translate,
 * align and score a transcript, with bounded feedback rounds in between.
 *
 * The session owns the mutable state a run touches (terminology store,
 * adjustable parameters, quality history). Everything else is rebuilt per
 * round from the live parameter values, so a feedback adjustment is visible
 * to the very next round.
 */

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::align::{AlignedSegment, TimestampAligner};
use crate::app_config::Config;
use crate::classify::{ContentAnalysis, ContentClassifier, ContentKind};
use crate::feedback::{AUTO_OPTIMIZE_THRESHOLD, FeedbackController, ParameterKind};
use crate::merger::{MergerConfig, SentenceBoundaryMerger};
use crate::normalize::TextNormalizer;
use crate::quality::QualityReport;
use crate::segmenter::AdaptiveSegmenter;
use crate::subtitle::{Segment, SubtitleTrack};
use crate::terminology::{LexiconStore, TerminologyStore};
use crate::translation::{BatchTranslator, RetryPolicy, Translator};

/// Wall-clock cost of one pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub millis: u64,
}

/// Summary of a finished run, serializable as a JSON report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source_language: String,
    pub target_language: String,
    pub content_kind: ContentKind,
    pub content_confidence: f64,
    pub segments_in: usize,
    pub segments_out: usize,
    /// Feedback rounds actually executed, the initial pass not counted
    pub rounds_executed: usize,
    pub batches_total: usize,
    /// Batches that fell back to untranslated text across all rounds
    pub batches_failed: usize,
    /// Final value of every adjustable parameter
    pub parameters: BTreeMap<ParameterKind, f64>,
    pub quality: QualityReport,
    pub stage_timings: Vec<StageTiming>,
    pub elapsed_ms: u64,
}

/// Everything a finished run hands back to the caller
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final merged source segments
    pub segments: Vec<Segment>,

    /// Aligned translation, one entry per segment
    pub aligned: Vec<AlignedSegment>,

    pub report: RunReport,
}

impl RunOutcome {
    /// Translated segments as a subtitle track, aligned timing applied
    pub fn translated_track(&self) -> SubtitleTrack {
        let segments = self.aligned.iter().map(AlignedSegment::timing).collect();
        SubtitleTrack::from_segments(segments, &self.report.target_language)
    }

    /// The merged source segments as a subtitle track
    pub fn source_track(&self) -> SubtitleTrack {
        SubtitleTrack::from_segments(self.segments.clone(), &self.report.source_language)
    }

    /// Dual-language track: translation on top, source text underneath
    pub fn bilingual_track(&self) -> Result<SubtitleTrack> {
        let top = self.translated_track();
        let bottom = self.source_track();
        SubtitleTrack::merge_bilingual(&top, &bottom)
    }
}

/// Output of one segment/translate/align cycle
struct RoundArtifacts {
    segments: Vec<Segment>,
    aligned: Vec<AlignedSegment>,
}

/// Drives the full pipeline over one transcript
pub struct PipelineSession {
    config: Config,
    translator: Arc<dyn Translator>,
    normalizer: TextNormalizer,
    classifier: ContentClassifier,
    terminology: TerminologyStore,
    feedback: FeedbackController,
    reference: Option<Vec<String>>,
}

impl PipelineSession {
    /// Build a session around a validated configuration and a translator
    pub fn new(config: Config, translator: Arc<dyn Translator>) -> Result<Self> {
        config.validate()?;

        let lexicon_dir = config.lexicon.resolved_directory();
        let normalizer = if config.lexicon.enabled {
            match LexiconStore::open(&lexicon_dir) {
                Ok(store) => {
                    debug!("Lexicon loaded from {}", lexicon_dir.display());
                    TextNormalizer::with_rules(Box::new(store))
                }
                Err(e) => {
                    warn!("Lexicon unavailable, using built-in corrections: {e:#}");
                    TextNormalizer::default()
                }
            }
        } else {
            TextNormalizer::default()
        };

        let terminology = TerminologyStore::load(lexicon_dir.join("terminology.json"))?;

        let mut feedback = FeedbackController::new();
        feedback.set_value(
            ParameterKind::TranslationBatchSize,
            config.translation.batch_size as f64,
        );

        Ok(PipelineSession {
            config,
            translator,
            normalizer,
            classifier: ContentClassifier::new(),
            terminology,
            feedback,
            reference: None,
        })
    }

    /// Attach reference translations, enabling the n-gram quality axis
    pub fn with_reference(mut self, reference: Vec<String>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn terminology(&self) -> &TerminologyStore {
        &self.terminology
    }

    /// Snapshot of the adjustable parameter values
    pub fn parameters(&self) -> BTreeMap<ParameterKind, f64> {
        self.feedback.current_values()
    }

    /// Normalize, classify and segment without translating
    ///
    /// This is the front half of `run`, for callers that only want the
    /// re-segmented source track.
    pub fn segment_only(&self, track: &SubtitleTrack) -> (Vec<Segment>, ContentAnalysis) {
        let mut fragments = track.segments.clone();
        self.normalizer.normalize_segments(&mut fragments);
        let analysis = self.classifier.analyze(&fragments);
        let segments = self.segment_and_merge(&fragments, &analysis);
        (segments, analysis)
    }

    /// Run the full pipeline over one track
    pub async fn run(&mut self, track: &SubtitleTrack) -> Result<RunOutcome> {
        let run_start = Instant::now();
        let mut timings = Vec::new();

        info!(
            "🚀 subalign: {} → {}",
            crate::language_utils::get_language_name(&self.config.source_language)
                .unwrap_or_else(|_| self.config.source_language.clone()),
            crate::language_utils::get_language_name(&self.config.target_language)
                .unwrap_or_else(|_| self.config.target_language.clone()),
        );

        let stage_start = Instant::now();
        let mut fragments = track.segments.clone();
        self.normalizer.normalize_segments(&mut fragments);
        push_timing(&mut timings, "normalize", stage_start);

        if fragments.is_empty() {
            warn!("Nothing to process, the input track is empty after cleanup");
            return Ok(self.empty_outcome(track.segments.len(), run_start, timings));
        }

        let stage_start = Instant::now();
        let analysis = self.classifier.analyze(&fragments);
        let harvested = self.terminology.extract_from(&analysis);
        if harvested > 0 {
            debug!("Harvested {harvested} candidate terms from the transcript");
        }
        info!(
            "Content classified as {} ({:.0}% confidence)",
            analysis.kind,
            analysis.confidence * 100.0
        );
        push_timing(&mut timings, "classify", stage_start);

        let stage_start = Instant::now();
        let segments = self.segment_and_merge(&fragments, &analysis);
        info!(
            "Segmentation: {} fragments → {} segments",
            fragments.len(),
            segments.len()
        );
        push_timing(&mut timings, "segment", stage_start);

        let stage_start = Instant::now();
        let (translated, mut batches_total, mut batches_failed) =
            self.translate_segments(&segments).await;
        push_timing(&mut timings, "translate", stage_start);

        let stage_start = Instant::now();
        let aligned = self.align(&segments, &translated);
        push_timing(&mut timings, "align", stage_start);

        let reference = self.reference.clone();

        let stage_start = Instant::now();
        let translated_segments = paired_segments(&segments, &translated);
        let aligned_timings: Vec<Segment> = aligned.iter().map(AlignedSegment::timing).collect();
        let mut iteration = self.feedback.run_iteration(
            &segments,
            &translated_segments,
            Some(&aligned_timings),
            reference.as_deref(),
        );
        info!("Quality: {}", iteration.report.summary());
        push_timing(&mut timings, "evaluate", stage_start);

        let mut best = RoundArtifacts { segments, aligned };
        let mut best_report = iteration.report.clone();
        let mut rounds_executed = 0;

        if self.config.pipeline.auto_optimize {
            let stage_start = Instant::now();
            while best_report.overall_score < AUTO_OPTIMIZE_THRESHOLD
                && rounds_executed < self.config.pipeline.max_rounds
                && !iteration.adjustments.is_empty()
            {
                rounds_executed += 1;
                info!(
                    "Feedback round {rounds_executed}: re-running with {} adjusted parameters",
                    iteration.adjustments.len()
                );

                let segments = self.segment_and_merge(&fragments, &analysis);
                let (translated, round_total, round_failed) =
                    self.translate_segments(&segments).await;
                batches_total += round_total;
                batches_failed += round_failed;
                let aligned = self.align(&segments, &translated);

                let translated_segments = paired_segments(&segments, &translated);
                let aligned_timings: Vec<Segment> =
                    aligned.iter().map(AlignedSegment::timing).collect();
                iteration = self.feedback.run_iteration(
                    &segments,
                    &translated_segments,
                    Some(&aligned_timings),
                    reference.as_deref(),
                );

                if iteration.improved {
                    debug!("Round {rounds_executed} improved the score, keeping its output");
                    best = RoundArtifacts { segments, aligned };
                    best_report = iteration.report.clone();
                } else {
                    info!(
                        "Round {rounds_executed} did not improve the score, keeping the previous output"
                    );
                    break;
                }
            }
            if rounds_executed > 0 {
                push_timing(&mut timings, "feedback", stage_start);
            }
        }

        if self.config.lexicon.enabled && harvested > 0 {
            if let Err(e) = self.terminology.save() {
                warn!("Could not persist harvested terminology: {e:#}");
            }
        }

        let report = RunReport {
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
            content_kind: analysis.kind,
            content_confidence: analysis.confidence,
            segments_in: track.segments.len(),
            segments_out: best.segments.len(),
            rounds_executed,
            batches_total,
            batches_failed,
            parameters: self.feedback.current_values(),
            quality: best_report,
            stage_timings: timings,
            elapsed_ms: run_start.elapsed().as_millis() as u64,
        };
        info!(
            "Pipeline finished in {} ms: {} segments, overall score {:.3}",
            report.elapsed_ms, report.segments_out, report.quality.overall_score
        );

        Ok(RunOutcome {
            segments: best.segments,
            aligned: best.aligned,
            report,
        })
    }

    /// Re-chunk the fragments under the live parameter values
    fn segment_and_merge(&self, fragments: &[Segment], analysis: &ContentAnalysis) -> Vec<Segment> {
        let max_chars = self.feedback.value(ParameterKind::MaxSegmentChars) as usize;

        let mut segmenter = AdaptiveSegmenter::for_analysis(analysis);
        segmenter.strategy_mut().max_chars = max_chars;
        let segmented = segmenter.segment(fragments, &analysis.detected_terms);

        let merger = SentenceBoundaryMerger::new(MergerConfig {
            merge_threshold: self.feedback.value(ParameterKind::MergeThreshold),
            ..MergerConfig::default()
        });
        let merged = merger.merge(&segmented);

        merged
            .iter()
            .flat_map(|seg| merger.split_long(seg, max_chars))
            .collect()
    }

    /// Translate segment texts in bounded concurrent batches
    ///
    /// Returns the translated texts plus the dispatched/fallen-back batch
    /// counts. Terminology is enforced on the translated side.
    async fn translate_segments(&self, segments: &[Segment]) -> (Vec<String>, usize, usize) {
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();

        let batch_size = self.feedback.value(ParameterKind::TranslationBatchSize) as usize;
        let translator = BatchTranslator::new(Arc::clone(&self.translator), batch_size)
            .with_concurrency(self.config.translation.concurrent_batches)
            .with_retry_policy(RetryPolicy {
                max_retries: self.config.translation.retry_count,
                backoff: Duration::from_millis(self.config.translation.retry_backoff_ms),
            });

        let progress_bar = ProgressBar::new(texts.len().div_ceil(batch_size) as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let outcome = translator
            .translate(
                &texts,
                &self.config.source_language,
                &self.config.target_language,
                move |completed, _total| {
                    pb.set_position(completed as u64);
                },
            )
            .await;
        progress_bar.finish_and_clear();

        if outcome.batches_failed > 0 {
            warn!(
                "{} of {} batches fell back to the original text",
                outcome.batches_failed, outcome.batches_total
            );
        }

        let texts = outcome
            .texts
            .iter()
            .map(|t| self.terminology.apply(t))
            .collect();

        (texts, outcome.batches_total, outcome.batches_failed)
    }

    fn align(&self, segments: &[Segment], translated: &[String]) -> Vec<AlignedSegment> {
        let aligner =
            TimestampAligner::new(self.config.target_language.clone(), self.config.speaker_rate);
        aligner.align(segments, translated)
    }

    /// Legal result for a track with nothing left after cleanup
    fn empty_outcome(
        &self,
        segments_in: usize,
        run_start: Instant,
        timings: Vec<StageTiming>,
    ) -> RunOutcome {
        RunOutcome {
            segments: Vec::new(),
            aligned: Vec::new(),
            report: RunReport {
                source_language: self.config.source_language.clone(),
                target_language: self.config.target_language.clone(),
                content_kind: ContentKind::Mixed,
                content_confidence: 0.0,
                segments_in,
                segments_out: 0,
                rounds_executed: 0,
                batches_total: 0,
                batches_failed: 0,
                parameters: self.feedback.current_values(),
                quality: QualityReport {
                    overall_score: 0.0,
                    n_gram_score: None,
                    timestamp_error: 0.0,
                    coherence_score: 0.0,
                    fragmentation_score: 0.0,
                    details: BTreeMap::new(),
                },
                stage_timings: timings,
                elapsed_ms: run_start.elapsed().as_millis() as u64,
            },
        }
    }
}

/// Pair each source segment's timing with its translated text
fn paired_segments(segments: &[Segment], translated: &[String]) -> Vec<Segment> {
    segments
        .iter()
        .zip(translated)
        .map(|(seg, text)| Segment::new(seg.start, seg.end, text.clone()))
        .collect()
}

fn push_timing(timings: &mut Vec<StageTiming>, stage: &str, started: Instant) {
    timings.push(StageTiming {
        stage: stage.to_string(),
        millis: started.elapsed().as_millis() as u64,
    });
}
