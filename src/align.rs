/*!
 * Timestamp alignment for synthesized speech.
 *
 * Translated text rarely fits the source timing. The aligner estimates the
 * synthesis duration from a per-language pacing rate, extends end times
 * within policy bounds, and reports a speed adjustment factor when even the
 * extended window is too tight. A final pass removes any overlap the
 * extensions introduced. The resulting list feeds the JSON alignment
 * document consumed by the synthesis side.
 */

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::subtitle::Segment;

/// Version tag carried by every exported alignment document
pub const FORMAT_VERSION: &str = "1.0";

/// Pacing fallback for languages without a tuned rate, chars per second
const DEFAULT_PACING_RATE: f64 = 4.0;

/// Gap left between segments when repairing an overlap, seconds
const OVERLAP_GAP: f64 = 0.1;

/// Characters per second the synthesis voice covers in a language
fn pacing_rate(language: &str) -> f64 {
    match language.split(['-', '_']).next().unwrap_or(language) {
        "zh" => 3.5,
        "ja" | "ko" => 4.0,
        "en" => 14.0,
        _ => DEFAULT_PACING_RATE,
    }
}

/// One translated segment with synthesis-ready timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedSegment {
    pub index: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub estimated_synthesis_duration: f64,
    /// Playback factor the synthesis engine should apply; 1.0 means none
    pub speed_adjustment: f64,
    pub duration_ratio: f64,
    pub original_text: String,
    pub original_duration: f64,
}

impl AlignedSegment {
    /// Plain timing view, for evaluation against the originals
    pub fn timing(&self) -> Segment {
        Segment::new(self.start, self.end, self.text.clone())
    }
}

/// Fits translated text into the source timing for a target language
#[derive(Debug, Clone)]
pub struct TimestampAligner {
    target_language: String,
    speaker_rate: f64,
}

impl TimestampAligner {
    pub fn new(target_language: impl Into<String>, speaker_rate: f64) -> Self {
        TimestampAligner {
            target_language: target_language.into(),
            speaker_rate,
        }
    }

    /// Align each translated text against its source segment
    ///
    /// Pairs up by position; surplus on either side is dropped. The output
    /// is free of temporal overlap.
    pub fn align(&self, original: &[Segment], translated: &[String]) -> Vec<AlignedSegment> {
        let rate = pacing_rate(&self.target_language) * self.speaker_rate;

        let mut aligned: Vec<AlignedSegment> = original
            .iter()
            .zip(translated)
            .enumerate()
            .map(|(i, (orig, text))| {
                let mut segment = self.align_one(orig, text, rate);
                segment.index = (i + 1).to_string();
                segment
            })
            .collect();

        fix_overlaps(&mut aligned);
        aligned
    }

    fn align_one(&self, orig: &Segment, translated: &str, rate: f64) -> AlignedSegment {
        let original_duration = orig.duration();
        let estimated = translated.chars().count() as f64 / rate;

        let duration_ratio = if original_duration > 0.0 {
            estimated / original_duration
        } else {
            1.0
        };

        let (end, speed_adjustment) = if duration_ratio <= 1.0 {
            (orig.end, 1.0)
        } else if duration_ratio <= 1.3 {
            let extension = (estimated - original_duration) * 0.5;
            (orig.end + extension, 1.0)
        } else {
            let max_extension = original_duration * 0.5;
            let extension = (estimated - original_duration).min(max_extension);
            let end = orig.end + extension;
            (end, estimated / (end - orig.start))
        };

        AlignedSegment {
            index: String::new(),
            text: translated.to_string(),
            start: orig.start,
            end,
            duration: end - orig.start,
            estimated_synthesis_duration: estimated,
            speed_adjustment: round2(speed_adjustment),
            duration_ratio: round2(duration_ratio),
            original_text: orig.text.clone(),
            original_duration,
        }
    }
}

/// Pull extended end times back so the list stays in temporal order
fn fix_overlaps(segments: &mut [AlignedSegment]) {
    for i in 1..segments.len() {
        let next_start = segments[i].start;
        let prev = &mut segments[i - 1];
        if prev.end > next_start {
            prev.end = (next_start - OVERLAP_GAP).max(prev.start);
            prev.duration = prev.end - prev.start;
        }
    }
}

/// Document header for the synthesis consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentMetadata {
    pub total_duration: f64,
    pub segment_count: usize,
    pub format_version: String,
}

/// The wire shape of one exported segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedSegment {
    pub index: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub speed_adjustment: f64,
    pub original_text: String,
    pub original_duration: f64,
}

/// The JSON alignment document, exportable and re-loadable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentDocument {
    pub metadata: AlignmentMetadata,
    pub segments: Vec<ExportedSegment>,
}

impl AlignmentDocument {
    /// Snapshot an aligned list, rounding times to the wire precision
    pub fn from_aligned(aligned: &[AlignedSegment]) -> Self {
        let total_duration = aligned
            .iter()
            .map(|s| s.end)
            .fold(0.0_f64, f64::max);

        let segments = aligned
            .iter()
            .map(|seg| ExportedSegment {
                index: seg.index.clone(),
                text: seg.text.clone(),
                start: round3(seg.start),
                end: round3(seg.end),
                duration: round3(seg.duration),
                speed_adjustment: seg.speed_adjustment,
                original_text: seg.original_text.clone(),
                original_duration: round3(seg.original_duration),
            })
            .collect();

        AlignmentDocument {
            metadata: AlignmentMetadata {
                total_duration: round2(total_duration),
                segment_count: aligned.len(),
                format_version: FORMAT_VERSION.to_string(),
            },
            segments,
        }
    }

    /// Write the document as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize alignment data")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write alignment data to {}", path.display()))?;

        info!("Alignment data saved to {}", path.display());
        Ok(())
    }

    /// Load a previously exported document
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alignment data from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid alignment document: {}", path.display()))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
