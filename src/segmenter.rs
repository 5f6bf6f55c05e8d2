/*!
 * Content-aware re-segmentation.
 *
 * One strategy per content kind, selected once per run: dialogue splits
 * long multi-question fragments, lectures accumulate a fixed number of
 * sentences, technical material splits only outside protected term spans,
 * and narrative/mixed content greedily merges while duration and length
 * bounds hold. Split timing is never fabricated; children share the
 * covered span proportionally to their character counts.
 */

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{ContentAnalysis, ContentKind};
use crate::subtitle::Segment;

/// How far a split point may back up to find whitespace or punctuation
const SPLIT_BACKUP_CHARS: usize = 20;

/// Per-kind segmentation bounds and policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationStrategy {
    /// Content kind this strategy serves
    pub kind: ContentKind,

    /// Smallest acceptable segment duration, seconds
    pub min_duration: f64,

    /// Largest acceptable segment duration, seconds
    pub max_duration: f64,

    /// Smallest acceptable text length, characters
    pub min_chars: usize,

    /// Largest acceptable text length, characters
    pub max_chars: usize,

    /// Whether fragments spanning a speaker boundary get split
    pub split_on_boundary_change: bool,

    /// Whether short neighbors are greedily merged
    pub merge_short: bool,

    /// Sentence budget per segment, for the accumulating strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences_per_segment: Option<usize>,
}

impl SegmentationStrategy {
    /// The tuned strategy for a content kind
    pub fn for_kind(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Dialogue => SegmentationStrategy {
                kind,
                min_duration: 1.0,
                max_duration: 5.0,
                min_chars: 10,
                max_chars: 80,
                split_on_boundary_change: true,
                merge_short: false,
                sentences_per_segment: None,
            },
            ContentKind::Lecture => SegmentationStrategy {
                kind,
                min_duration: 2.0,
                max_duration: 10.0,
                min_chars: 30,
                max_chars: 150,
                split_on_boundary_change: false,
                merge_short: true,
                sentences_per_segment: Some(2),
            },
            ContentKind::Technical => SegmentationStrategy {
                kind,
                min_duration: 2.0,
                max_duration: 8.0,
                min_chars: 20,
                max_chars: 120,
                split_on_boundary_change: false,
                merge_short: true,
                sentences_per_segment: None,
            },
            ContentKind::Narrative => SegmentationStrategy {
                kind,
                min_duration: 2.0,
                max_duration: 8.0,
                min_chars: 30,
                max_chars: 120,
                split_on_boundary_change: false,
                merge_short: true,
                sentences_per_segment: None,
            },
            ContentKind::Mixed => SegmentationStrategy {
                kind,
                min_duration: 1.5,
                max_duration: 7.0,
                min_chars: 20,
                max_chars: 100,
                split_on_boundary_change: true,
                merge_short: true,
                sentences_per_segment: None,
            },
        }
    }
}

impl Default for SegmentationStrategy {
    fn default() -> Self {
        Self::for_kind(ContentKind::Mixed)
    }
}

/// Re-chunks a fragment sequence under a per-kind strategy
#[derive(Debug, Clone)]
pub struct AdaptiveSegmenter {
    strategy: SegmentationStrategy,
}

impl AdaptiveSegmenter {
    /// Pick the strategy matching an analysis
    pub fn for_analysis(analysis: &ContentAnalysis) -> Self {
        AdaptiveSegmenter {
            strategy: SegmentationStrategy::for_kind(analysis.kind),
        }
    }

    /// Use an explicit strategy
    pub fn with_strategy(strategy: SegmentationStrategy) -> Self {
        AdaptiveSegmenter { strategy }
    }

    /// The active strategy
    pub fn strategy(&self) -> &SegmentationStrategy {
        &self.strategy
    }

    /// Mutable access, for parameter adjustments between rounds
    pub fn strategy_mut(&mut self) -> &mut SegmentationStrategy {
        &mut self.strategy
    }

    /// Re-segment the fragments, protecting the given terms where relevant
    pub fn segment(&self, fragments: &[Segment], terms: &[String]) -> Vec<Segment> {
        // Empty fragments never survive segmentation
        let fragments: Vec<&Segment> = fragments
            .iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();

        if fragments.is_empty() {
            return Vec::new();
        }

        let out = match self.strategy.kind {
            ContentKind::Dialogue => self.segment_dialogue(&fragments),
            ContentKind::Lecture => self.segment_lecture(&fragments),
            ContentKind::Technical => self.segment_technical(&fragments, terms),
            ContentKind::Narrative | ContentKind::Mixed => self.segment_default(&fragments),
        };

        debug!(
            "Segmented {} fragments into {} segments ({} strategy)",
            fragments.len(),
            out.len(),
            self.strategy.kind
        );
        out
    }

    /// Dialogue: split over-long fragments at question boundaries
    fn segment_dialogue(&self, fragments: &[&Segment]) -> Vec<Segment> {
        let mut result = Vec::with_capacity(fragments.len());

        for seg in fragments {
            let over_long = seg.char_count() > self.strategy.max_chars;
            if self.strategy.split_on_boundary_change && over_long && seg.text.contains('?') {
                let parts = split_by_questions(&seg.text);
                if parts.len() > 1 {
                    result.extend(allocate_spans(&parts, seg.start, seg.end));
                    continue;
                }
            }
            result.push((*seg).clone());
        }

        result
    }

    /// Lecture: accumulate fragments up to the sentence budget
    fn segment_lecture(&self, fragments: &[&Segment]) -> Vec<Segment> {
        let budget = self.strategy.sentences_per_segment.unwrap_or(2) + 1;

        let mut result = Vec::new();
        let mut current: Option<Segment> = None;
        let mut sentence_count = 0;

        for seg in fragments {
            let sentences = count_sentences(&seg.text);

            match current.take() {
                None => {
                    current = Some((*seg).clone());
                    sentence_count = sentences;
                }
                Some(mut acc) if sentence_count + sentences <= budget => {
                    acc.end = seg.end;
                    acc.text = format!("{} {}", acc.text, seg.text);
                    acc.words.extend(seg.words.iter().cloned());
                    sentence_count += sentences;
                    current = Some(acc);
                }
                Some(acc) => {
                    result.push(acc);
                    current = Some((*seg).clone());
                    sentence_count = sentences;
                }
            }
        }

        if let Some(acc) = current {
            result.push(acc);
        }

        result
    }

    /// Technical: split over-long fragments outside protected term spans
    fn segment_technical(&self, fragments: &[&Segment], terms: &[String]) -> Vec<Segment> {
        let term_pattern = build_term_pattern(terms);

        let mut result = Vec::with_capacity(fragments.len());
        for seg in fragments {
            if seg.char_count() > self.strategy.max_chars {
                result.extend(split_preserving_terms(
                    seg,
                    self.strategy.max_chars,
                    term_pattern.as_ref(),
                ));
            } else {
                result.push((*seg).clone());
            }
        }

        result
    }

    /// Narrative and mixed: greedy merge under the char and duration bounds
    fn segment_default(&self, fragments: &[&Segment]) -> Vec<Segment> {
        if !self.strategy.merge_short {
            return fragments.iter().map(|s| (*s).clone()).collect();
        }

        let mut result = Vec::new();
        let mut current: Option<Segment> = None;

        for seg in fragments {
            match current.take() {
                None => current = Some((*seg).clone()),
                Some(mut acc) => {
                    let combined_chars = acc.char_count() + seg.char_count();
                    let combined_duration = (acc.end - acc.start) + seg.duration();

                    if combined_chars < self.strategy.max_chars
                        && combined_duration < self.strategy.max_duration
                    {
                        acc.end = seg.end;
                        acc.text = format!("{} {}", acc.text, seg.text);
                        acc.words.extend(seg.words.iter().cloned());
                        current = Some(acc);
                    } else {
                        result.push(acc);
                        current = Some((*seg).clone());
                    }
                }
            }
        }

        if let Some(acc) = current {
            result.push(acc);
        }

        result
    }
}

/// Count sentence-ending punctuation marks, at least one
fn count_sentences(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, '.' | '!' | '?' | '。' | '！' | '？'))
        .count()
        .max(1)
}

/// Cut the text after each question mark
fn split_by_questions(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if c == '?' {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }

    parts
}

/// Case-insensitive whole-word matcher over the protected terms
fn build_term_pattern(terms: &[String]) -> Option<Regex> {
    if terms.is_empty() {
        return None;
    }

    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!(r"(?i)\b({})\b", alternation)).ok()
}

/// Split an over-long segment at safe points outside protected term spans
///
/// Candidate cuts fall every `max_chars` characters, then back up at most
/// [`SPLIT_BACKUP_CHARS`] to the nearest whitespace or punctuation. A
/// fragment with no safe cut is returned unchanged; the boundary merger
/// owns the forced-split fallback.
fn split_preserving_terms(seg: &Segment, max_chars: usize, term_pattern: Option<&Regex>) -> Vec<Segment> {
    let text = &seg.text;
    let bytes = text.as_bytes();

    let protected: Vec<(usize, usize)> = term_pattern
        .map(|re| re.find_iter(text).map(|m| (m.start(), m.end())).collect())
        .unwrap_or_default();

    // Byte offset of every character, so candidate cuts are char-aligned
    let char_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let n_chars = char_offsets.len();

    let mut split_points: Vec<usize> = Vec::new();
    let mut i_char = max_chars.max(1);
    while i_char < n_chars {
        let at = char_offsets[i_char];
        let inside_term = protected.iter().any(|(ps, pe)| *ps <= at && at <= *pe);

        if !inside_term {
            let low = i_char.saturating_sub(SPLIT_BACKUP_CHARS);
            let mut j_char = i_char;
            while j_char > low {
                let b = bytes[char_offsets[j_char]];
                if matches!(b, b' ' | b'.' | b',' | b';' | b':') {
                    split_points.push(char_offsets[j_char] + 1);
                    break;
                }
                j_char -= 1;
            }
        }

        i_char += max_chars.max(1);
    }

    split_points.dedup();
    if split_points.is_empty() {
        return vec![seg.clone()];
    }

    // Cut into parts, dropping any that trim away
    let mut parts = Vec::new();
    let mut prev = 0;
    for point in split_points {
        let piece = text[prev..point].trim();
        if !piece.is_empty() {
            parts.push(piece.to_string());
        }
        prev = point;
    }
    let tail = text[prev..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }

    if parts.len() <= 1 {
        return vec![seg.clone()];
    }

    allocate_spans(&parts, seg.start, seg.end)
}

/// Distribute a covered time span over parts, proportional to char share
fn allocate_spans(parts: &[String], start: f64, end: f64) -> Vec<Segment> {
    let total_chars: usize = parts.iter().map(|p| p.chars().count()).sum();
    let duration = (end - start).max(0.0);

    let mut out = Vec::with_capacity(parts.len());
    let mut cursor = start;
    for (i, part) in parts.iter().enumerate() {
        let share = part.chars().count() as f64 / total_chars.max(1) as f64;
        let span = duration * share;
        let seg_end = if i == parts.len() - 1 { end } else { cursor + span };
        out.push(Segment::new(cursor, seg_end, part.clone()));
        cursor = seg_end;
    }

    out
}
