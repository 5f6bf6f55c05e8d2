/*!
 * Sentence-boundary merging and over-length splitting.
 *
 * The merger walks the segment list with an accumulation window: each next
 * fragment either continues the window or flushes it, based on gap, length
 * and completeness heuristics. Flushed text always leaves with terminal
 * punctuation. The companion splitter undoes the opposite failure mode,
 * recursively cutting over-long segments at the boundary nearest the
 * midpoint.
 */

use log::debug;

use crate::subtitle::Segment;

/// Sentence-ending punctuation, Latin and CJK
const TERMINAL_PUNCT: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Words that leave a sentence hanging when they end a window
const CONTINUATION_WORDS: [&str; 28] = [
    "and", "but", "or", "so", "because", "to", "of", "for", "with", "in", "on", "at", "by",
    "from", "a", "an", "the", "is", "are", "was", "were", "be", "can", "could", "will",
    "would", "shall", "should",
];

/// Interrogative openers that turn a missing terminal into `?`
const QUESTION_WORDS: [&str; 8] = [
    "who", "what", "where", "when", "why", "how", "which", "whose",
];

/// Lower-case sentence openers that do not signal a continuation
const SENTENCE_OPENERS: [&str; 5] = ["i", "i'm", "i'll", "i've", "i'd"];

/// Bounds for the accumulation window
#[derive(Debug, Clone)]
pub struct MergerConfig {
    /// Base inter-fragment gap allowance, seconds
    pub max_gap: f64,

    /// Windows below this word count read as incomplete
    pub min_words: usize,

    /// Hard word ceiling for a merged window
    pub max_words: usize,

    /// Windows below this duration read as incomplete, seconds
    pub min_duration: f64,

    /// Hard duration ceiling for a merged window, seconds
    pub max_duration: f64,

    /// Session-level scaling applied to the gap allowance
    pub merge_threshold: f64,
}

impl Default for MergerConfig {
    fn default() -> Self {
        MergerConfig {
            max_gap: 0.3,
            min_words: 4,
            max_words: 20,
            min_duration: 1.5,
            max_duration: 8.0,
            merge_threshold: 1.0,
        }
    }
}

/// Merges fragment runs into complete sentences and splits the over-long ones
#[derive(Debug, Clone, Default)]
pub struct SentenceBoundaryMerger {
    config: MergerConfig,
}

impl SentenceBoundaryMerger {
    pub fn new(config: MergerConfig) -> Self {
        SentenceBoundaryMerger { config }
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MergerConfig {
        &mut self.config
    }

    /// Run the accumulation state machine over the segment list
    pub fn merge(&self, segments: &[Segment]) -> Vec<Segment> {
        let mut merged = Vec::new();
        let mut window: Option<Segment> = None;
        let mut merge_count = 0usize;

        for seg in segments {
            if seg.text.trim().is_empty() {
                continue;
            }

            match window.take() {
                None => {
                    window = Some(seg.clone());
                    merge_count = 0;
                }
                Some(acc) => {
                    if self.should_continue(&acc, seg, merge_count) {
                        window = Some(join_segments(acc, seg));
                        merge_count += 1;
                    } else {
                        merged.push(flush(acc));
                        window = Some(seg.clone());
                        merge_count = 0;
                    }
                }
            }
        }

        if let Some(acc) = window {
            merged.push(flush(acc));
        }

        debug!("Merged {} fragments into {} sentences", segments.len(), merged.len());
        merged
    }

    /// CONTINUE versus FLUSH decision for one candidate fragment
    fn should_continue(&self, acc: &Segment, next: &Segment, merge_count: usize) -> bool {
        let projected_duration = next.end - acc.start;
        let projected_words = acc.word_count() + next.word_count();

        if projected_duration > self.config.max_duration || projected_words > self.config.max_words {
            return false;
        }

        let acc_text = acc.text.trim();
        let next_text = next.text.trim();
        let complete = ends_terminal(acc_text);

        // Lower-case continuation, unless it is a legitimate sentence opener
        if let Some(first) = next_text.chars().next() {
            if first.is_lowercase() {
                let first_word = first_word_lower(next_text);
                if !SENTENCE_OPENERS.contains(&first_word.as_str()) {
                    return true;
                }
            }
        }

        // Window ends hanging on a connective, preposition or copula
        if acc_text.ends_with([',', ';', '-']) {
            return true;
        }
        let last_word = acc_text
            .split_whitespace()
            .next_back()
            .unwrap_or("")
            .trim_end_matches([',', ';', ':'])
            .to_lowercase();
        if CONTINUATION_WORDS.contains(&last_word.as_str()) {
            return true;
        }

        // Window still too small to stand alone
        let acc_duration = acc.end - acc.start;
        if (acc.word_count() < self.config.min_words || acc_duration < self.config.min_duration)
            && !complete
        {
            return true;
        }

        // Hard-adjacent fragments keep flowing while the sentence is open
        let gap = next.start - acc.end;
        let allowed_gap = self.config.max_gap * self.config.merge_threshold * (merge_count + 1) as f64;
        if gap < allowed_gap && !complete {
            return true;
        }

        false
    }

    /// Recursively split a segment whose text exceeds `max_chars`
    ///
    /// Prefers a sentence ending nearest the midpoint, then any clause
    /// punctuation, then whitespace. A segment with no cut point at all is
    /// returned unchanged.
    pub fn split_long(&self, seg: &Segment, max_chars: usize) -> Vec<Segment> {
        if max_chars == 0 || seg.char_count() <= max_chars {
            return vec![seg.clone()];
        }

        let chars: Vec<char> = seg.text.chars().collect();
        let mid = chars.len() / 2;

        let cut = best_boundary(&chars, mid, &['.', '!', '?', '。', '！', '？'])
            .or_else(|| best_boundary(&chars, mid, &[',', ';', ':']))
            .or_else(|| best_boundary(&chars, mid, &[' ']));

        let Some(cut) = cut else {
            return vec![seg.clone()];
        };

        let left_text: String = chars[..=cut].iter().collect();
        let right_text: String = chars[cut + 1..].iter().collect();
        let left_text = left_text.trim().to_string();
        let right_text = right_text.trim().to_string();
        if left_text.is_empty() || right_text.is_empty() {
            return vec![seg.clone()];
        }

        let left_chars = left_text.chars().count();
        let right_chars = right_text.chars().count();
        let share = left_chars as f64 / (left_chars + right_chars) as f64;
        let mid_time = seg.start + seg.duration() * share;

        let left = Segment::new(seg.start, mid_time, left_text);
        let right = Segment::new(mid_time, seg.end, right_text);

        let mut out = self.split_long(&left, max_chars);
        out.extend(self.split_long(&right, max_chars));
        out
    }
}

/// Append the next fragment to the window
fn join_segments(mut acc: Segment, next: &Segment) -> Segment {
    let acc_text = acc.text.trim_end();
    acc.text = if acc_text.ends_with('-') {
        format!("{}{}", acc_text, next.text.trim())
    } else {
        format!("{} {}", acc_text.trim_end_matches([',', ';', ':']), next.text.trim())
    };
    acc.end = next.end;
    acc.words.extend(next.words.iter().cloned());
    acc
}

/// Close the window, supplying terminal punctuation when missing
fn flush(mut acc: Segment) -> Segment {
    let text = acc.text.trim();
    if !text.is_empty() && !ends_terminal(text) {
        let stripped = text.trim_end_matches([',', ';', ':']);
        let mark = if QUESTION_WORDS.contains(&first_word_lower(text).as_str()) {
            '?'
        } else {
            '.'
        };
        acc.text = format!("{}{}", stripped, mark);
    } else {
        acc.text = text.to_string();
    }
    acc
}

fn ends_terminal(text: &str) -> bool {
    text.chars().next_back().is_some_and(|c| TERMINAL_PUNCT.contains(&c))
}

fn first_word_lower(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Interior boundary char nearest the midpoint, if any
fn best_boundary(chars: &[char], mid: usize, candidates: &[char]) -> Option<usize> {
    if chars.len() < 3 {
        return None;
    }
    (1..chars.len() - 1)
        .filter(|&i| candidates.contains(&chars[i]))
        .min_by_key(|&i| i.abs_diff(mid))
}
