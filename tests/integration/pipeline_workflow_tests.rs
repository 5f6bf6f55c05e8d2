/*!
 * Integration tests for the end-to-end processing pipeline
 *
 * These tests drive a full session over real files on disk, with the
 * translation backend replaced by in-process mocks.
 */

use std::sync::Arc;

use anyhow::Result;
use tokio_test;

use subalign::app_config::Config;
use subalign::pipeline::PipelineSession;
use subalign::subtitle::SubtitleTrack;
use subalign::translation::{MockTranslator, PassthroughTranslator};

use crate::common;
use crate::common::mock_translators::BrokenTranslator;

/// Build a hermetic config rooted in the given temp directory
fn workflow_config(dir: &std::path::Path) -> Config {
    let mut config = common::create_test_config(&dir.to_path_buf());
    // Keep batch accounting deterministic for exact assertions
    config.pipeline.auto_optimize = false;
    config
}

/// Test the full pipeline over a subtitle file with the mock backend
#[tokio::test]
async fn test_pipeline_withFullProcess_shouldProduceAlignedTranslation() -> Result<()> {
    // 1. Create a temporary directory and a subtitle file
    let temp_dir = common::create_temp_dir()?;
    let dir_path = temp_dir.path().to_path_buf();
    let srt_path = common::create_test_subtitle(&dir_path, "talk.srt")?;

    // 2. Load the source track
    let track = SubtitleTrack::from_srt_file(&srt_path, "en")?;
    assert_eq!(track.len(), 4, "Test subtitle should have 4 cues");

    // 3. Run the pipeline with the tagging mock backend
    let config = workflow_config(temp_dir.path());
    let mut session = PipelineSession::new(config, Arc::new(MockTranslator::new()))?;
    let outcome = session.run(&track).await?;

    // 4. Verify the shape of the output
    assert!(!outcome.segments.is_empty(), "Merged segments should survive");
    assert_eq!(
        outcome.aligned.len(),
        outcome.segments.len(),
        "One aligned entry per merged segment"
    );
    for aligned in &outcome.aligned {
        assert!(
            aligned.text.starts_with("[zh] "),
            "Mock backend tags every text, got: {}",
            aligned.text
        );
        assert!(aligned.end > aligned.start, "Every entry needs positive duration");
    }

    // 5. Verify the aligned entries stay ordered and free of overlap
    for pair in outcome.aligned.windows(2) {
        assert!(
            pair[0].end <= pair[1].start + 1e-9,
            "Aligned entries must not overlap: {} ends after {} starts",
            pair[0].index,
            pair[1].index
        );
    }

    // 6. Verify the run report
    let report = &outcome.report;
    assert_eq!(report.source_language, "en");
    assert_eq!(report.target_language, "zh");
    assert_eq!(report.segments_in, 4);
    assert_eq!(report.segments_out, outcome.segments.len());
    assert_eq!(report.rounds_executed, 0, "Auto-optimize is off");
    assert_eq!(report.batches_total, 1, "Four cues fit one default batch");
    assert_eq!(report.batches_failed, 0);
    assert_eq!(report.parameters.len(), 4, "Every knob appears in the report");
    assert!(report.quality.overall_score > 0.0);

    let stages: Vec<&str> = report.stage_timings.iter().map(|t| t.stage.as_str()).collect();
    for expected in ["normalize", "classify", "segment", "translate", "align", "evaluate"] {
        assert!(stages.contains(&expected), "Missing stage timing: {expected}");
    }
    Ok(())
}

/// Test the output track builders on a finished run
#[tokio::test]
async fn test_pipeline_outcomeTracks_shouldExposeAllThreeViews() -> Result<()> {
    // 1. Run the pipeline over an in-memory track
    let temp_dir = common::create_temp_dir()?;
    let config = workflow_config(temp_dir.path());
    let mut session = PipelineSession::new(config, Arc::new(MockTranslator::new()))?;

    let track = SubtitleTrack::from_segments(common::create_test_fragments(), "en");
    let outcome = session.run(&track).await?;

    // 2. The translated track carries aligned timing and the target language
    let translated = outcome.translated_track();
    assert_eq!(translated.len(), outcome.segments.len());
    assert_eq!(translated.language, "zh");

    // 3. The source track mirrors the merged segments
    let source = outcome.source_track();
    assert_eq!(source.len(), outcome.segments.len());
    assert_eq!(source.language, "en");

    // 4. The bilingual track stacks translation over source text
    let bilingual = outcome.bilingual_track()?;
    assert_eq!(bilingual.len(), outcome.segments.len());
    assert_eq!(bilingual.language, "zh+en");
    for segment in &bilingual.segments {
        assert!(
            segment.text.contains('\n'),
            "Bilingual cues hold two stacked lines: {}",
            segment.text
        );
        assert!(segment.text.starts_with("[zh] "), "Translation goes on top");
    }

    // 5. The translated track survives an SRT round trip
    let out_path = temp_dir.path().join("talk.zh.srt");
    translated.write_srt(&out_path)?;
    let reloaded = SubtitleTrack::from_srt_file(&out_path, "zh")?;
    assert_eq!(reloaded.len(), translated.len());
    Ok(())
}

/// Test that a dead backend degrades to untranslated output, not an error
#[test]
fn test_pipeline_withBrokenBackend_shouldFallBackToSourceText() -> Result<()> {
    // 1. Run with a backend that always fails
    let temp_dir = common::create_temp_dir()?;
    let mut config = workflow_config(temp_dir.path());
    config.translation.retry_count = 0;
    config.translation.retry_backoff_ms = 1;

    let mut session = PipelineSession::new(config, Arc::new(BrokenTranslator))?;
    let track = SubtitleTrack::from_segments(common::create_test_fragments(), "en");
    let outcome = tokio_test::block_on(async {
        session.run(&track).await
    })?;

    // 2. Every batch fell back, and the run still completed
    let report = &outcome.report;
    assert!(report.batches_total >= 1);
    assert_eq!(
        report.batches_failed, report.batches_total,
        "Every batch should report fallback"
    );

    // 3. Fallback keeps the source text in the aligned output
    for (aligned, segment) in outcome.aligned.iter().zip(&outcome.segments) {
        assert_eq!(
            aligned.text, segment.text,
            "Untranslated fallback must match the source segment"
        );
    }
    Ok(())
}

/// Test that an empty track short-circuits with a zeroed report
#[test]
fn test_pipeline_withEmptyTrack_shouldReturnEmptyOutcome() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = workflow_config(temp_dir.path());
    let mut session = PipelineSession::new(config, Arc::new(PassthroughTranslator::new()))?;

    let track = SubtitleTrack::from_segments(Vec::new(), "en");
    let outcome = tokio_test::block_on(async { session.run(&track).await })?;

    assert!(outcome.segments.is_empty());
    assert!(outcome.aligned.is_empty());
    assert_eq!(outcome.report.segments_in, 0);
    assert_eq!(outcome.report.segments_out, 0);
    assert_eq!(outcome.report.batches_total, 0);
    assert_eq!(outcome.report.quality.overall_score, 0.0);
    Ok(())
}

/// Test that a reference translation enables the n-gram axis
#[tokio::test]
async fn test_pipeline_withReference_shouldScoreNgramAxis() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = workflow_config(temp_dir.path());

    let track = SubtitleTrack::from_segments(common::create_test_fragments(), "en");
    let reference = vec![
        "reference line one".to_string(),
        "reference line two".to_string(),
        "reference line three".to_string(),
    ];

    let mut session = PipelineSession::new(config, Arc::new(PassthroughTranslator::new()))?
        .with_reference(reference);
    let outcome = session.run(&track).await?;

    assert!(
        outcome.report.quality.n_gram_score.is_some(),
        "A supplied reference should turn the n-gram axis on"
    );
    Ok(())
}

/// Test feedback rounds stay within budget and keep knobs in range
#[tokio::test]
async fn test_pipeline_withAutoOptimize_shouldKeepRoundsAndKnobsBounded() -> Result<()> {
    // 1. Run with feedback enabled on deliberately choppy input
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::create_test_config(&temp_dir.path().to_path_buf());
    config.pipeline.auto_optimize = true;
    config.translation.retry_backoff_ms = 1;

    let mut session = PipelineSession::new(config, Arc::new(MockTranslator::new()))?;
    let track = SubtitleTrack::from_segments(common::create_test_fragments(), "en");
    let outcome = session.run(&track).await?;

    // 2. Round count respects the configured budget
    let report = &outcome.report;
    assert!(
        report.rounds_executed <= session.config().pipeline.max_rounds,
        "Rounds must stay within max_rounds"
    );

    // 3. Batch accounting covers the initial pass plus every round
    assert!(
        report.batches_total >= 1 + report.rounds_executed,
        "Each round dispatches at least one more batch"
    );

    // 4. Adjusted knobs never leave their tuned ranges
    use subalign::feedback::ParameterKind;
    let params = &report.parameters;
    assert!((0.3..=2.0).contains(&params[&ParameterKind::MergeThreshold]));
    assert!((50.0..=200.0).contains(&params[&ParameterKind::MaxSegmentChars]));
    assert!((5.0..=20.0).contains(&params[&ParameterKind::TranslationBatchSize]));
    assert!((0.3..=0.7).contains(&params[&ParameterKind::DetectionThreshold]));
    Ok(())
}

/// Test that harvested terminology persists to the lexicon directory
#[tokio::test]
async fn test_pipeline_withTechnicalTerms_shouldPersistTerminology() -> Result<()> {
    // 1. A transcript dense with acronyms the classifier harvests
    let temp_dir = common::create_temp_dir()?;
    let config = workflow_config(temp_dir.path());

    let track = SubtitleTrack::from_segments(
        vec![
            subalign::subtitle::Segment::new(0.0, 2.0, "The API gateway spoke HTTP and JSON."),
            subalign::subtitle::Segment::new(2.5, 4.5, "Each GPU node ran the same algorithm."),
        ],
        "en",
    );

    // 2. Run the pipeline
    let mut session = PipelineSession::new(config, Arc::new(MockTranslator::new()))?;
    let outcome = session.run(&track).await?;
    assert!(
        !outcome.report.quality.details.is_empty(),
        "Details map should carry the reporting axes"
    );

    // 3. The harvested terms were written next to the lexicon documents
    let terminology_path = temp_dir.path().join("terminology.json");
    assert!(
        terminology_path.exists(),
        "Harvest should persist to {}",
        terminology_path.display()
    );
    let content = std::fs::read_to_string(&terminology_path)?;
    assert!(content.contains("api"), "Lower-cased keys persist: {content}");
    Ok(())
}
