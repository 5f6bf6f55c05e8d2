/*!
 * Tests for translation quality evaluation
 */

use subalign::quality::QualityEvaluator;
use subalign::subtitle::Segment;

/// Build a well-formed segment list for scoring
fn good_segments() -> Vec<Segment> {
    vec![
        Segment::new(0.0, 2.5, "Today we look at how translation systems work."),
        Segment::new(2.8, 5.5, "Translation systems learn from large parallel corpora."),
        Segment::new(5.8, 8.5, "These corpora pair sentences across two languages."),
    ]
}

/// Test scoring without reference or alignment input
#[test]
fn test_qualityEvaluator_evaluate_withoutReference_shouldSkipNgramAxis() {
    let segments = good_segments();
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, None, None);

    assert!(report.n_gram_score.is_none(), "No reference means no n-gram axis");
    assert_eq!(report.timestamp_error, 0.0, "No alignment means no drift");
    assert!(report.overall_score > 0.0 && report.overall_score <= 1.0);
    assert!(report.details.contains_key("segment_count"));
    assert_eq!(report.details["segment_count"], 3.0);
}

/// Test that a perfect reference match scores the n-gram axis near one
#[test]
fn test_qualityEvaluator_evaluate_withIdenticalReference_shouldScoreNgramHigh() {
    let segments = good_segments();
    let reference: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, None, Some(&reference));

    let n_gram = report.n_gram_score.expect("Reference provided, axis should exist");
    assert!(n_gram > 0.95, "Identical texts should score near 1.0, got {n_gram}");
}

/// Test that a disjoint reference scores the n-gram axis near zero
#[test]
fn test_qualityEvaluator_evaluate_withDisjointReference_shouldScoreNgramLow() {
    let segments = good_segments();
    let reference: Vec<String> = segments
        .iter()
        .map(|_| "completely unrelated words here".to_string())
        .collect();
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, None, Some(&reference));

    let n_gram = report.n_gram_score.expect("Reference provided, axis should exist");
    assert!(n_gram < 0.05, "Disjoint texts should score near 0.0, got {n_gram}");
}

/// Test that a reference of the wrong length scores zero rather than panicking
#[test]
fn test_qualityEvaluator_evaluate_withMismatchedReference_shouldScoreZero() {
    let segments = good_segments();
    let reference = vec!["only one line".to_string()];
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, None, Some(&reference));
    assert_eq!(report.n_gram_score, Some(0.0));
}

/// Test timestamp drift measurement against aligned output
#[test]
fn test_qualityEvaluator_evaluate_withShiftedAlignment_shouldMeasureDrift() {
    let segments = good_segments();
    let shifted: Vec<Segment> = segments
        .iter()
        .map(|s| Segment::new(s.start + 0.2, s.end + 0.2, s.text.clone()))
        .collect();
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, Some(&shifted), None);
    assert!((report.timestamp_error - 0.2).abs() < 0.005);

    // Identical alignment reports zero drift
    let clean = evaluator.evaluate(&segments, &segments, Some(&segments), None);
    assert_eq!(clean.timestamp_error, 0.0);
}

/// Test that fragmented output drags the overall score down
#[test]
fn test_qualityEvaluator_evaluate_withFragmentedOutput_shouldScoreWorse() {
    let evaluator = QualityEvaluator::new();

    let whole = good_segments();
    let fragmented: Vec<Segment> = vec![
        Segment::new(0.0, 0.4, "Today"),
        Segment::new(0.5, 0.9, "we"),
        Segment::new(1.0, 1.4, "look"),
        Segment::new(1.5, 1.9, "at"),
        Segment::new(2.0, 2.4, "how translation systems work across many domains"),
    ];

    let whole_report = evaluator.evaluate(&whole, &whole, None, None);
    let fragmented_report = evaluator.evaluate(&fragmented, &fragmented, None, None);

    assert!(
        fragmented_report.fragmentation_score > whole_report.fragmentation_score,
        "Word-at-a-time output should register as more fragmented"
    );
    assert!(fragmented_report.overall_score < whole_report.overall_score);
}

/// Test the one-line summary rendering
#[test]
fn test_qualityReport_summary_shouldListEveryAxis() {
    let segments = good_segments();
    let reference: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let evaluator = QualityEvaluator::new();

    let report = evaluator.evaluate(&segments, &segments, Some(&segments), Some(&reference));
    let summary = report.summary();

    assert!(summary.contains("overall"));
    assert!(summary.contains("n-gram"));
    assert!(summary.contains("timestamp error"));
    assert!(summary.contains("coherence"));
    assert!(summary.contains("fragmentation"));
}
