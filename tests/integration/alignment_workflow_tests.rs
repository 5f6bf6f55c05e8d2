/*!
 * Integration tests for alignment export and reload
 */

use anyhow::Result;
use subalign::align::{AlignmentDocument, FORMAT_VERSION, TimestampAligner};
use subalign::subtitle::Segment;

use crate::common;

/// Test exporting an alignment and loading it back from disk
#[test]
fn test_alignmentDocument_writeAndReload_shouldRoundTrip() -> Result<()> {
    // 1. Align a short translated track
    let original = vec![
        Segment::new(0.0, 2.0, "hello there"),
        Segment::new(2.5, 5.0, "how are you doing today"),
        Segment::new(5.5, 7.0, "see you soon"),
    ];
    let translated = vec![
        "你好".to_string(),
        "你今天过得怎么样".to_string(),
        "回头见".to_string(),
    ];

    let aligner = TimestampAligner::new("zh", 1.0);
    let aligned = aligner.align(&original, &translated);
    assert_eq!(aligned.len(), 3);

    // 2. Export to JSON in a temp directory
    let temp_dir = common::create_temp_dir()?;
    let doc_path = temp_dir.path().join("nested").join("talk.align.json");
    let document = AlignmentDocument::from_aligned(&aligned);
    document.write_json(&doc_path)?;
    assert!(doc_path.exists());

    // 3. Load it back and compare
    let reloaded = AlignmentDocument::from_json_file(&doc_path)?;
    assert_eq!(reloaded.metadata.format_version, FORMAT_VERSION);
    assert_eq!(reloaded.metadata.segment_count, 3);
    assert_eq!(reloaded.segments.len(), 3);

    for (exported, original) in reloaded.segments.iter().zip(&aligned) {
        assert_eq!(exported.index, original.index);
        assert_eq!(exported.text, original.text);
        assert_eq!(exported.original_text, original.original_text);
        assert!((exported.start - original.start).abs() < 0.001);
        assert!((exported.end - original.end).abs() < 0.001);
    }
    Ok(())
}

/// Test that the exported document is valid JSON with the expected keys
#[test]
fn test_alignmentDocument_writeJson_shouldEmitExpectedShape() -> Result<()> {
    let original = vec![Segment::new(0.0, 2.0, "a line of text")];
    let translated = vec!["一行文本".to_string()];

    let aligner = TimestampAligner::new("zh", 1.0);
    let aligned = aligner.align(&original, &translated);

    let temp_dir = common::create_temp_dir()?;
    let doc_path = temp_dir.path().join("single.align.json");
    AlignmentDocument::from_aligned(&aligned).write_json(&doc_path)?;

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&doc_path)?)?;
    assert!(raw["metadata"]["total_duration"].is_number());
    assert_eq!(raw["metadata"]["format_version"], FORMAT_VERSION);
    assert_eq!(raw["segments"][0]["index"], "1");
    assert_eq!(raw["segments"][0]["text"], "一行文本");
    assert!(raw["segments"][0]["speed_adjustment"].is_number());
    Ok(())
}

/// Test that surplus translations beyond the source list are dropped
#[test]
fn test_timestampAligner_align_withSurplusTexts_shouldDropExtras() {
    let original = vec![Segment::new(0.0, 2.0, "only one source line")];
    let translated = vec!["第一".to_string(), "第二".to_string()];

    let aligner = TimestampAligner::new("zh", 1.0);
    let aligned = aligner.align(&original, &translated);

    assert_eq!(aligned.len(), 1, "Position pairing drops the surplus text");
    assert_eq!(aligned[0].text, "第一");
    assert_eq!(aligned[0].index, "1");
}

/// Test pacing differences between target languages
#[test]
fn test_timestampAligner_align_withDifferentLanguages_shouldUsePacingRates() {
    let original = vec![Segment::new(0.0, 1.0, "hi")];
    // 14 characters of translated text
    let text = vec!["abcdefghijklmn".to_string()];

    // English pacing absorbs 14 chars in one second
    let english = TimestampAligner::new("en", 1.0).align(&original, &text);
    assert_eq!(english[0].speed_adjustment, 1.0);
    assert!((english[0].estimated_synthesis_duration - 1.0).abs() < 0.01);

    // Chinese pacing needs far longer for the same character count
    let chinese = TimestampAligner::new("zh", 1.0).align(&original, &text);
    assert!(chinese[0].estimated_synthesis_duration > 3.0);
    assert!(
        chinese[0].speed_adjustment > 1.0,
        "Overflow beyond the extension cap must speed playback up"
    );
}
