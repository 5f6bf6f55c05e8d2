/*!
 * Output quality scoring.
 *
 * Four independent axes: n-gram precision against an optional reference
 * translation, timestamp drift against the aligned timing, lexical
 * coherence between consecutive texts, and fragmentation of the segment
 * lengths. The aggregate is a plain mean of the clamped components, so a
 * report is always comparable across rounds.
 */

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::subtitle::Segment;

/// Segments shorter than this many characters count as fragments
pub const SHORT_SEGMENT_CHARS: usize = 20;

/// Timestamp drift, in seconds, at which the timing score reaches zero
const TIMESTAMP_FULL_PENALTY: f64 = 0.5;

/// Lexical overlap between neighbors that maps to a full coherence score
const COHERENCE_TARGET_OVERLAP: f64 = 0.2;

/// Guard against ln(0) in the geometric mean
const NGRAM_EPSILON: f64 = 1e-10;

/// One evaluation round's scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Mean of the clamped component scores, in [0, 1]
    pub overall_score: f64,

    /// Clipped n-gram precision; absent without a reference translation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_gram_score: Option<f64>,

    /// Mean per-segment boundary drift, seconds
    pub timestamp_error: f64,

    /// Rescaled lexical overlap between consecutive texts, in [0, 1]
    pub coherence_score: f64,

    /// Short-segment ratio blended with length variation, in [0, 1]
    pub fragmentation_score: f64,

    /// Per-axis raw values for reporting
    #[serde(default)]
    pub details: BTreeMap<String, f64>,
}

impl QualityReport {
    /// One-line rendering for logs and CLI output
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("overall {:.3}", self.overall_score)];
        if let Some(score) = self.n_gram_score {
            parts.push(format!("n-gram {score:.3}"));
        }
        parts.push(format!("timestamp error {:.3}s", self.timestamp_error));
        parts.push(format!("coherence {:.3}", self.coherence_score));
        parts.push(format!("fragmentation {:.3}", self.fragmentation_score));
        parts.join(", ")
    }
}

/// Scores a translated segment list against its inputs
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator;

impl QualityEvaluator {
    pub fn new() -> Self {
        QualityEvaluator
    }

    /// Score one round of output
    ///
    /// `aligned` carries post-alignment timing when available; `reference`
    /// enables the n-gram axis and must pair up with `translated` one to one.
    pub fn evaluate(
        &self,
        original: &[Segment],
        translated: &[Segment],
        aligned: Option<&[Segment]>,
        reference: Option<&[String]>,
    ) -> QualityReport {
        let translated_texts: Vec<&str> = translated.iter().map(|s| s.text.as_str()).collect();

        let n_gram_score =
            reference.map(|reference| ngram_precision_score(&translated_texts, reference));

        let timestamp_error = aligned
            .map(|aligned| timestamp_error(original, aligned))
            .unwrap_or(0.0);

        let coherence_score = coherence_score(&translated_texts);
        let fragmentation_score = fragmentation_score(translated);

        let timestamp_score = (1.0 - timestamp_error / TIMESTAMP_FULL_PENALTY).max(0.0);

        let mut components = Vec::with_capacity(4);
        if let Some(score) = n_gram_score {
            components.push(score.clamp(0.0, 1.0));
        }
        components.push(timestamp_score.clamp(0.0, 1.0));
        components.push(coherence_score.clamp(0.0, 1.0));
        components.push((1.0 - fragmentation_score).clamp(0.0, 1.0));

        let overall_score = round3(components.iter().sum::<f64>() / components.len() as f64);

        let mut details = BTreeMap::new();
        details.insert("segment_count".to_string(), translated.len() as f64);
        details.insert(
            "avg_segment_length".to_string(),
            round1(average_char_length(translated)),
        );
        details.insert("timestamp_score".to_string(), round3(timestamp_score));

        QualityReport {
            overall_score,
            n_gram_score,
            timestamp_error,
            coherence_score,
            fragmentation_score,
            details,
        }
    }
}

/// Per-pair clipped 1..4-gram precision with a brevity penalty, averaged
fn ngram_precision_score(candidates: &[&str], references: &[String]) -> f64 {
    if candidates.len() != references.len() {
        return 0.0;
    }

    let mut total = 0.0;
    for (candidate, reference) in candidates.iter().zip(references) {
        let cand_tokens: Vec<String> = candidate
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let ref_tokens: Vec<String> = reference
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        if cand_tokens.is_empty() || ref_tokens.is_empty() {
            continue;
        }

        let mut precisions = Vec::with_capacity(4);
        for n in 1..=cand_tokens.len().min(4) {
            let cand_grams = ngram_counts(&cand_tokens, n);
            if cand_grams.is_empty() {
                continue;
            }
            let ref_grams = ngram_counts(&ref_tokens, n);

            let matches: usize = cand_grams
                .iter()
                .map(|(gram, count)| (*count).min(ref_grams.get(gram).copied().unwrap_or(0)))
                .sum();
            let total_grams: usize = cand_grams.values().sum();
            precisions.push(matches as f64 / total_grams as f64);
        }

        if precisions.is_empty() {
            continue;
        }

        let log_mean = precisions
            .iter()
            .map(|p| (p + NGRAM_EPSILON).ln())
            .sum::<f64>()
            / precisions.len() as f64;
        let brevity = (1.0 - ref_tokens.len() as f64 / cand_tokens.len().max(1) as f64)
            .exp()
            .min(1.0);

        total += brevity * log_mean.exp();
    }

    round3(total / candidates.len().max(1) as f64)
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || n > tokens.len() {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Mean boundary drift between paired original and aligned segments, seconds
fn timestamp_error(original: &[Segment], aligned: &[Segment]) -> f64 {
    if original.is_empty() || aligned.is_empty() {
        return 0.0;
    }

    let errors: Vec<f64> = original
        .iter()
        .zip(aligned)
        .map(|(orig, align)| {
            ((orig.start - align.start).abs() + (orig.end - align.end).abs()) / 2.0
        })
        .collect();

    round3(errors.iter().sum::<f64>() / errors.len() as f64)
}

/// Jaccard overlap of neighbors, rescaled so the target overlap scores 1.0
///
/// Subtitles legitimately share few words between lines; the axis only
/// flags runs whose neighbors share nothing at all, the signature of
/// over-fragmented output.
fn coherence_score(texts: &[&str]) -> f64 {
    if texts.len() < 2 {
        return 1.0;
    }

    let mut overlaps = Vec::with_capacity(texts.len() - 1);
    for pair in texts.windows(2) {
        let prev: HashSet<String> = pair[0]
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let curr: HashSet<String> = pair[1]
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        if prev.is_empty() || curr.is_empty() {
            continue;
        }

        let intersection = prev.intersection(&curr).count();
        let union = prev.union(&curr).count();
        if union > 0 {
            overlaps.push(intersection as f64 / union as f64);
        }
    }

    let average = if overlaps.is_empty() {
        0.0
    } else {
        overlaps.iter().sum::<f64>() / overlaps.len() as f64
    };

    round3((average / COHERENCE_TARGET_OVERLAP).min(1.0))
}

/// Short-segment ratio blended with the coefficient of length variation
fn fragmentation_score(segments: &[Segment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }

    let lengths: Vec<f64> = segments.iter().map(|s| s.char_count() as f64).collect();
    let count = lengths.len() as f64;
    let average = lengths.iter().sum::<f64>() / count;

    let short_ratio = lengths
        .iter()
        .filter(|&&l| l < SHORT_SEGMENT_CHARS as f64)
        .count() as f64
        / count;

    let variance = lengths.iter().map(|l| (l - average).powi(2)).sum::<f64>() / count;
    let cv = if average > 0.0 {
        variance.sqrt() / average
    } else {
        0.0
    };

    round3(short_ratio * 0.6 + cv.min(1.0) * 0.4)
}

fn average_char_length(segments: &[Segment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    segments.iter().map(|s| s.char_count() as f64).sum::<f64>() / segments.len() as f64
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
