/*!
 * Terminology persistence and the external lexicon store.
 *
 * Two cooperating pieces: [`TerminologyStore`] is the session-owned
 * source→target term map that survives a run (loaded at startup, saved
 * after mutation), and [`LexiconStore`] is an on-disk, reloadable set of
 * correction and terminology documents that can stand in for the built-in
 * rule tables behind the [`CorrectionRules`] capability.
 */

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, Context, anyhow};
use log::{debug, info, warn};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::classify::ContentAnalysis;
use crate::normalize::CorrectionRules;

/// Session-owned term mapping applied to text before translation
///
/// Keys are lower-cased source terms; values are the canonical target
/// strings. The whole map persists as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerminologyStore {
    /// Lower-cased source term to canonical target
    entries: BTreeMap<String, String>,

    /// Where the store persists, when it has a backing file
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl TerminologyStore {
    /// Create an empty, unbacked store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON document
    ///
    /// A missing file yields an empty store bound to that path; the first
    /// save will create it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("Terminology file {} not found, starting empty", path.display());
            return Ok(TerminologyStore {
                entries: BTreeMap::new(),
                path: Some(path.to_path_buf()),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read terminology file: {}", path.display()))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse terminology file: {}", path.display()))?;

        info!("Loaded {} terminology entries from {}", entries.len(), path.display());

        Ok(TerminologyStore {
            entries,
            path: Some(path.to_path_buf()),
        })
    }

    /// Save the whole store to its backing file, atomically
    ///
    /// The document is written to a temporary file in the same directory
    /// and renamed over the target, so readers never see a partial write.
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref()
            .ok_or_else(|| anyhow!("Terminology store has no backing file"))?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .context("Failed to create temporary terminology file")?;
        let json = serde_json::to_string_pretty(&self.entries)?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write terminology entries")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace terminology file: {}", path.display()))?;

        debug!("Saved {} terminology entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Bind the store to a backing file without loading
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a term; re-adding an existing lower-cased key is a no-op
    ///
    /// Returns true when the term was newly inserted.
    pub fn add_term(&mut self, source: &str, target: &str) -> bool {
        let key = source.trim().to_lowercase();
        if key.is_empty() || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, target.trim().to_string());
        true
    }

    /// Look up the canonical target for a source term
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(&source.trim().to_lowercase()).map(|s| s.as_str())
    }

    /// Whether the store knows a term
    pub fn has_term(&self, source: &str) -> bool {
        self.entries.contains_key(&source.trim().to_lowercase())
    }

    /// Number of stored terms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no terms
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All known source terms, lower-cased
    pub fn source_terms(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Replace every known source term in the text with its target form
    ///
    /// Matching is whole-word and case-insensitive.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();

        for (source, target) in &self.entries {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(source));
            match Regex::new(&pattern) {
                Ok(re) => out = re.replace_all(&out, target.as_str()).into_owned(),
                Err(e) => warn!("Skipping unusable term '{}': {}", source, e),
            }
        }

        out
    }

    /// Harvest newly detected technical terms from a content analysis
    ///
    /// Each detected term is stored under its lower-cased form, mapping to
    /// the detected casing. Returns how many terms were actually new.
    pub fn extract_from(&mut self, analysis: &ContentAnalysis) -> usize {
        let mut added = 0;
        for term in &analysis.detected_terms {
            if self.add_term(term, term) {
                added += 1;
            }
        }

        if added > 0 {
            debug!("Harvested {} new terminology entries", added);
        }
        added
    }

    /// Merge another store's entries; existing keys win
    pub fn merge(&mut self, other: &TerminologyStore) -> usize {
        let mut added = 0;
        for (source, target) in &other.entries {
            if self.add_term(source, target) {
                added += 1;
            }
        }
        added
    }
}

/// One pattern-based rule inside the terms document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    /// Rule name, used only in diagnostics
    pub name: String,

    /// The regular expression to match
    pub pattern: String,

    /// Replacement text, `$1`-style groups allowed
    pub replacement: String,

    /// Flag characters: `i` case-insensitive, `m` multi-line
    #[serde(default)]
    pub flags: String,
}

/// On-disk shape of `corrections.json`
#[derive(Debug, Default, Serialize, Deserialize)]
struct CorrectionsFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// On-disk shape of `terms.json`
#[derive(Debug, Default, Serialize, Deserialize)]
struct TermsFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,

    #[serde(default)]
    patterns: Vec<PatternRule>,
}

/// Compiled lookup tables, swapped wholesale on reload
#[derive(Default)]
struct CompiledTables {
    /// Literal corrections, exact match, in key order
    corrections: Vec<(String, String)>,

    /// Compiled pattern rules, in document order
    patterns: Vec<(Regex, String)>,

    /// Whole-word term matchers, in key order
    terms: Vec<(Regex, String)>,
}

/// Table sizes, for logs and the `lexicon stats` surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LexiconStats {
    pub corrections: usize,
    pub terms: usize,
    pub patterns: usize,
}

/// External, reloadable correction and terminology documents
///
/// Reads `corrections.json` and `terms.json` from a directory; missing
/// files are empty tables, not errors. Compiled tables sit behind an
/// `RwLock` so `correct` callers never observe a half-loaded store while
/// another thread reloads.
pub struct LexiconStore {
    dir: PathBuf,
    tables: RwLock<CompiledTables>,
}

impl LexiconStore {
    /// Conventional store location under the user's configuration directory
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subalign")
    }

    /// Open a store rooted at the given directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let store = LexiconStore {
            dir: dir.as_ref().to_path_buf(),
            tables: RwLock::new(CompiledTables::default()),
        };
        store.reload()?;
        Ok(store)
    }

    /// Path of the corrections document
    fn corrections_path(&self) -> PathBuf {
        self.dir.join("corrections.json")
    }

    /// Path of the terms document
    fn terms_path(&self) -> PathBuf {
        self.dir.join("terms.json")
    }

    /// Re-read both documents and swap the compiled tables
    pub fn reload(&self) -> Result<()> {
        let corrections = Self::read_json::<CorrectionsFile>(&self.corrections_path())?;
        let terms = Self::read_json::<TermsFile>(&self.terms_path())?;

        let mut compiled = CompiledTables {
            corrections: corrections.entries.into_iter().collect(),
            patterns: Vec::with_capacity(terms.patterns.len()),
            terms: Vec::with_capacity(terms.entries.len()),
        };

        for rule in &terms.patterns {
            let mut prefix = String::new();
            if rule.flags.contains('i') {
                prefix.push('i');
            }
            if rule.flags.contains('m') {
                prefix.push('m');
            }
            let source = if prefix.is_empty() {
                rule.pattern.clone()
            } else {
                format!("(?{}){}", prefix, rule.pattern)
            };

            match Regex::new(&source) {
                Ok(re) => compiled.patterns.push((re, rule.replacement.clone())),
                Err(e) => warn!("Skipping unusable lexicon pattern '{}': {}", rule.name, e),
            }
        }

        for (lower, canonical) in terms.entries {
            match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&lower))) {
                Ok(re) => compiled.terms.push((re, canonical)),
                Err(e) => warn!("Skipping unusable lexicon term '{}': {}", lower, e),
            }
        }

        info!(
            "Lexicon loaded from {}: {} corrections, {} terms, {} patterns",
            self.dir.display(),
            compiled.corrections.len(),
            compiled.terms.len(),
            compiled.patterns.len()
        );

        *self.tables.write() = compiled;
        Ok(())
    }

    /// Add a whole-word term and persist the terms document
    ///
    /// Returns true when the term was newly inserted.
    pub fn add_term(&self, lower: &str, canonical: &str) -> Result<bool> {
        let key = lower.trim().to_lowercase();
        if key.is_empty() {
            return Ok(false);
        }

        let mut file = Self::read_json::<TermsFile>(&self.terms_path())?;
        if file.entries.contains_key(&key) {
            return Ok(false);
        }
        file.entries.insert(key, canonical.trim().to_string());

        Self::write_json(&self.terms_path(), &file)?;
        self.reload()?;
        Ok(true)
    }

    /// Add a literal correction and persist the corrections document
    pub fn add_correction(&self, wrong: &str, right: &str) -> Result<bool> {
        if wrong.trim().is_empty() {
            return Ok(false);
        }

        let mut file = Self::read_json::<CorrectionsFile>(&self.corrections_path())?;
        if file.entries.contains_key(wrong) {
            return Ok(false);
        }
        file.entries.insert(wrong.to_string(), right.to_string());

        Self::write_json(&self.corrections_path(), &file)?;
        self.reload()?;
        Ok(true)
    }

    /// Case-insensitive substring search over the corrections table
    pub fn search(&self, query: &str) -> Vec<(String, String)> {
        let needle = query.to_lowercase();
        let tables = self.tables.read();

        tables.corrections.iter()
            .filter(|(wrong, right)| {
                wrong.to_lowercase().contains(&needle) || right.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Current table sizes
    pub fn stats(&self) -> LexiconStats {
        let tables = self.tables.read();
        LexiconStats {
            corrections: tables.corrections.len(),
            terms: tables.terms.len(),
            patterns: tables.patterns.len(),
        }
    }

    /// Read one JSON document; a missing file is an empty table set
    fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse lexicon file: {}", path.display()))
    }

    /// Write one JSON document atomically
    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let mut tmp = NamedTempFile::new_in(parent)
            .context("Failed to create temporary lexicon file")?;
        let json = serde_json::to_string_pretty(value)?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write lexicon file")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to replace lexicon file: {}", path.display()))?;

        Ok(())
    }
}

impl CorrectionRules for LexiconStore {
    fn correct(&self, text: &str) -> String {
        let tables = self.tables.read();
        let mut out = text.to_string();

        // Literal corrections first, exact match
        for (wrong, right) in &tables.corrections {
            if out.contains(wrong.as_str()) {
                out = out.replace(wrong.as_str(), right);
            }
        }

        // Then pattern rules
        for (pattern, replacement) in &tables.patterns {
            out = pattern.replace_all(&out, replacement.as_str()).into_owned();
        }

        // Term casings last, whole-word
        for (pattern, canonical) in &tables.terms {
            out = pattern.replace_all(&out, canonical.as_str()).into_owned();
        }

        out
    }

    fn describe(&self) -> String {
        let stats = self.stats();
        format!(
            "lexicon at {} ({} corrections, {} terms, {} patterns)",
            self.dir.display(),
            stats.corrections,
            stats.terms,
            stats.patterns
        )
    }
}
