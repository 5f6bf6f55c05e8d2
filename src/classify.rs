/*!
 * Whole-transcript content classification.
 *
 * Scores the concatenated transcript against three signature sets
 * (conversational, instructional, technical vocabulary), folds in a
 * speaker-change heuristic and detected-term bonuses, and returns the
 * dominant content kind with normalized per-kind scores. Everything is
 * pattern counting over word counts; there is no parser and no model,
 * so classification never fails.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::subtitle::Segment;

/// Cap on how many detected terms an analysis reports
const MAX_DETECTED_TERMS: usize = 20;

/// Minimum normalized score for a kind to claim the transcript
const CONFIDENCE_FLOOR: f64 = 0.4;

/// Content kind of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Conversational exchange between speakers
    Dialogue,
    /// Single-speaker instruction or presentation
    Lecture,
    /// Vocabulary-dense technical material
    Technical,
    /// Continuous narration
    Narrative,
    /// No kind dominates
    #[default]
    Mixed,
}

impl ContentKind {
    /// Lowercase identifier, matching the serialized form
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Dialogue => "dialogue".to_string(),
            Self::Lecture => "lecture".to_string(),
            Self::Technical => "technical".to_string(),
            Self::Narrative => "narrative".to_string(),
            Self::Mixed => "mixed".to_string(),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dialogue" => Ok(Self::Dialogue),
            "lecture" => Ok(Self::Lecture),
            "technical" => Ok(Self::Technical),
            "narrative" => Ok(Self::Narrative),
            "mixed" => Ok(Self::Mixed),
            _ => Err(anyhow!("Invalid content kind: {}", s)),
        }
    }
}

/// Result of classifying a transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Dominant content kind
    pub kind: ContentKind,

    /// Normalized score of the dominant kind, in [0, 1]
    pub confidence: f64,

    /// Normalized per-kind scores over the scored axes; values sum to 1
    pub scores: BTreeMap<ContentKind, f64>,

    /// Technical terms found in the transcript, at most twenty
    pub detected_terms: Vec<String>,
}

impl ContentAnalysis {
    /// Analysis of an empty transcript
    pub fn empty() -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(ContentKind::Dialogue, 1.0 / 3.0);
        scores.insert(ContentKind::Lecture, 1.0 / 3.0);
        scores.insert(ContentKind::Technical, 1.0 / 3.0);

        ContentAnalysis {
            kind: ContentKind::Mixed,
            confidence: 0.0,
            scores,
            detected_terms: Vec::new(),
        }
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "{} ({:.0}% confidence, {} terms)",
            self.kind,
            self.confidence * 100.0,
            self.detected_terms.len()
        )
    }
}

// Signature sets. Conversational and instructional markers match
// case-insensitively; the acronym and camel-case shapes are case-sensitive
// because their casing is the signal.
static DIALOGUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(I|you|we|they|he|she)\s+(think|believe|feel|want|need)\b",
        r"(?i)\b(yes|no|yeah|okay|ok|sure|right|well)\b",
        r"\?$",
        r"(?i)^(so|and|but|because)\b",
        r"(?i)\b(said|asked|replied|answered)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LECTURE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(today|now|let's|let me|I'll|we'll)\b",
        r"(?i)\b(first|second|third|finally|next|then)\b",
        r"(?i)\b(important|key|main|essential|fundamental)\b",
        r"(?i)\b(example|instance|case|scenario)\b",
        r"(?i)\b(understand|learn|know|remember|note)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TECHNICAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(API|SDK|HTTP|JSON|XML|SQL|CPU|GPU|RAM|SSD)\b",
        r"(?i)\b(function|class|method|variable|parameter|algorithm)\b",
        r"(?i)\b(machine learning|deep learning|neural network|AI|ML)\b",
        r"(?i)\b(database|server|client|protocol|framework)\b",
        r"\b\d+\.\d+\.\d+\b",
        r"\b[A-Z]{2,}[a-z]+[A-Z]\w*\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ACRONYM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());

/// Heuristic content-type classifier
#[derive(Debug, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    /// Create a classifier
    pub fn new() -> Self {
        ContentClassifier
    }

    /// Classify an ordered segment sequence
    ///
    /// Always returns an analysis; an empty or blank transcript comes back
    /// as [`ContentKind::Mixed`] with zero confidence.
    pub fn analyze(&self, segments: &[Segment]) -> ContentAnalysis {
        let all_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if all_text.trim().is_empty() {
            return ContentAnalysis::empty();
        }

        let dialogue_score = pattern_score(&all_text, &DIALOGUE_PATTERNS);
        let lecture_score = pattern_score(&all_text, &LECTURE_PATTERNS);
        let technical_score = pattern_score(&all_text, &TECHNICAL_PATTERNS);

        let speaker_changes = detect_speaker_changes(segments);
        let detected_terms = extract_technical_terms(&all_text);

        let mut scores = BTreeMap::new();
        scores.insert(ContentKind::Dialogue, dialogue_score + speaker_changes as f64 * 0.1);
        scores.insert(ContentKind::Lecture, lecture_score);
        scores.insert(ContentKind::Technical, technical_score + detected_terms.len() as f64 * 0.05);

        // Normalize to a distribution; a transcript with no signal at all
        // falls back to the uniform one
        let total: f64 = scores.values().sum();
        let axes = scores.len() as f64;
        for value in scores.values_mut() {
            *value = if total > f64::EPSILON {
                *value / total
            } else {
                1.0 / axes
            };
        }

        // First strictly-greater entry wins, so ties resolve in kind order
        let (mut max_kind, mut confidence) = (ContentKind::Dialogue, 0.0);
        for (kind, score) in &scores {
            if *score > confidence {
                max_kind = *kind;
                confidence = *score;
            }
        }

        let kind = if confidence < CONFIDENCE_FLOOR {
            ContentKind::Mixed
        } else {
            max_kind
        };

        ContentAnalysis {
            kind,
            confidence,
            scores,
            detected_terms,
        }
    }
}

/// Pattern-density score: matches per word, scaled and capped at 1
fn pattern_score(text: &str, patterns: &[Regex]) -> f64 {
    let word_count = text.split_whitespace().count().max(1);

    let matches: usize = patterns.iter().map(|p| p.find_iter(text).count()).sum();

    (matches as f64 / word_count as f64 * 10.0).min(1.0)
}

/// Count adjacent question/statement style alternations
fn detect_speaker_changes(segments: &[Segment]) -> usize {
    let mut changes = 0;
    let mut prev_is_question: Option<bool> = None;

    for segment in segments {
        let is_question = segment.text.trim().ends_with('?');
        if let Some(prev) = prev_is_question {
            if prev != is_question {
                changes += 1;
            }
        }
        prev_is_question = Some(is_question);
    }

    changes
}

/// Harvest technical terms: pattern hits plus standalone acronyms
fn extract_technical_terms(text: &str) -> Vec<String> {
    let mut terms = BTreeSet::new();

    for pattern in TECHNICAL_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(0)) {
                terms.insert(m.as_str().to_string());
            }
        }
    }

    for m in ACRONYM_PATTERN.find_iter(text) {
        terms.insert(m.as_str().to_string());
    }

    terms.into_iter().take(MAX_DETECTED_TERMS).collect()
}
