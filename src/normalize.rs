/*!
 * Deterministic text cleanup for recognizer output.
 *
 * Corrections are data, not code branches: a correction source implements
 * [`CorrectionRules`] and the normalizer composes it with a fixed set of
 * pattern fixes and a punctuation pass. The built-in table covers frequent
 * transcription artifacts; an external lexicon can replace it without
 * touching the pipeline.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitle::Segment;

/// A source of text corrections
///
/// Implementations substitute known-bad strings with their canonical form.
/// The trait is object-safe so the pipeline can hold either the built-in
/// table or an externally loaded store behind one handle.
pub trait CorrectionRules: Send + Sync {
    /// Apply every correction this source knows about
    fn correct(&self, text: &str) -> String;

    /// Short description of the source, used in logs
    fn describe(&self) -> String {
        "correction rules".to_string()
    }
}

/// Literal artifact fixes shipped with the crate
///
/// Ordered case-insensitive replacements for mishearings and stutter
/// duplicates, plus a whole-word table forcing known terms to canonical
/// casing. Patterns are compiled once, at insertion.
pub struct BuiltinRules {
    /// Substring replacements, applied in order
    fixes: Vec<(Regex, String)>,

    /// Whole-word canonical casings, applied after the fixes
    terms: Vec<(Regex, String)>,
}

impl Default for BuiltinRules {
    fn default() -> Self {
        let fixes = [
            ("a lot of of", "a lot of"),
            ("going to to", "going to"),
            ("kind of a", "kind of"),
            ("sort of a", "sort of"),
            ("see the light day", "see the light of day"),
        ];

        let terms = [
            ("github", "GitHub"),
            ("javascript", "JavaScript"),
            ("typescript", "TypeScript"),
            ("python", "Python"),
            ("api", "API"),
            ("apis", "APIs"),
            ("sdk", "SDK"),
            ("http", "HTTP"),
            ("https", "HTTPS"),
            ("json", "JSON"),
            ("xml", "XML"),
            ("html", "HTML"),
            ("css", "CSS"),
            ("sql", "SQL"),
            ("cpu", "CPU"),
            ("gpu", "GPU"),
            ("ram", "RAM"),
            ("ssd", "SSD"),
            ("ai", "AI"),
            ("llm", "LLM"),
            ("vs code", "VS Code"),
        ];

        let mut rules = BuiltinRules::empty();
        for (wrong, right) in fixes {
            rules = rules.with_fix(wrong, right);
        }
        for (lower, canonical) in terms {
            rules = rules.with_term(lower, canonical);
        }
        rules
    }
}

impl BuiltinRules {
    /// Create an empty rule set
    pub fn empty() -> Self {
        BuiltinRules {
            fixes: Vec::new(),
            terms: Vec::new(),
        }
    }

    /// Add a literal substring fix
    pub fn with_fix(mut self, wrong: &str, right: &str) -> Self {
        match Regex::new(&format!("(?i){}", regex::escape(wrong))) {
            Ok(re) => self.fixes.push((re, right.to_string())),
            Err(e) => warn!("Skipping unusable fix '{}': {}", wrong, e),
        }
        self
    }

    /// Add a whole-word canonical term
    pub fn with_term(mut self, lower: &str, canonical: &str) -> Self {
        match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(lower))) {
            Ok(re) => self.terms.push((re, canonical.to_string())),
            Err(e) => warn!("Skipping unusable term '{}': {}", lower, e),
        }
        self
    }

    /// Number of loaded rules across both tables
    pub fn len(&self) -> usize {
        self.fixes.len() + self.terms.len()
    }

    /// Whether no rules are loaded
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty() && self.terms.is_empty()
    }
}

impl CorrectionRules for BuiltinRules {
    fn correct(&self, text: &str) -> String {
        let mut out = text.to_string();

        for (pattern, right) in &self.fixes {
            out = pattern.replace_all(&out, right.as_str()).into_owned();
        }

        for (pattern, canonical) in &self.terms {
            out = pattern.replace_all(&out, canonical.as_str()).into_owned();
        }

        out
    }

    fn describe(&self) -> String {
        format!("built-in rules ({} entries)", self.len())
    }
}

// Pattern fixes that run regardless of the configured correction source.
// Compound tokens split by the recognizer and acronym casings the literal
// tables cannot express as plain substrings.
static PATTERN_FIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // Version-style compounds: "Dev 1" -> "Dev1"
        (Regex::new(r"\bDev\s+(\d+)\b").unwrap(), "Dev$1"),
        (Regex::new(r"(?i)\bprs\b").unwrap(), "PRs"),
        (Regex::new(r"(?i)\bpr\b").unwrap(), "PR"),
        (Regex::new(r"(?i)\bxr\b").unwrap(), "XR"),
    ]
});

static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+([.,!?;:'"])"#).unwrap()
});

static MISSING_SPACE_AFTER_SENTENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([.!?])([A-Z])").unwrap()
});

/// Composes a correction source with pattern fixes and punctuation repair
pub struct TextNormalizer {
    rules: Box<dyn CorrectionRules>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        TextNormalizer {
            rules: Box::new(BuiltinRules::default()),
        }
    }
}

impl TextNormalizer {
    /// Build a normalizer around an explicit correction source
    pub fn with_rules(rules: Box<dyn CorrectionRules>) -> Self {
        TextNormalizer { rules }
    }

    /// Description of the active correction source
    pub fn rules_description(&self) -> String {
        self.rules.describe()
    }

    /// Run the full cleanup: corrections, pattern fixes, punctuation
    pub fn normalize(&self, text: &str) -> String {
        let mut out = self.rules.correct(text);

        // Pattern fixes always run, whatever the correction source was
        for (pattern, replacement) in PATTERN_FIXES.iter() {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }

        normalize_punctuation(&out)
    }

    /// Normalize every segment in place, dropping any that clean to empty
    pub fn normalize_segments(&self, segments: &mut Vec<Segment>) {
        for segment in segments.iter_mut() {
            segment.text = self.normalize(&segment.text);
        }
        segments.retain(|s| !s.text.is_empty());
    }
}

/// Punctuation and whitespace repair
///
/// Strips space before punctuation, restores the space after sentence
/// punctuation when a capital follows, collapses repeated punctuation and
/// internal whitespace, straightens doubled quote marks, and capitalizes
/// the first letter.
pub fn normalize_punctuation(text: &str) -> String {
    let mut out = SPACE_BEFORE_PUNCT.replace_all(text.trim(), "$1").into_owned();
    out = MISSING_SPACE_AFTER_SENTENCE.replace_all(&out, "$1 $2").into_owned();

    // Collapse internal whitespace runs
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    out = collapse_repeated_punctuation(&out);
    out = out.replace("``", "\"").replace("''", "\"");

    capitalize_first(&out)
}

/// Collapse runs of the same sentence punctuation mark to one
fn collapse_repeated_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;

    for c in text.chars() {
        let is_repeat = matches!(c, '.' | ',' | '!' | '?') && prev == Some(c);
        if !is_repeat {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}

/// Upper-case the first alphabetic character, if the text starts with one
fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            first.to_uppercase().collect::<String>() + chars.as_str()
        }
        _ => text.to_string(),
    }
}
