use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Speaking-rate multiplier applied on top of the per-language pacing rate
    #[serde(default = "default_speaker_rate")]
    pub speaker_rate: f64,

    /// Directory where subtitle and alignment files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Pipeline config
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Lexicon store config
    #[serde(default)]
    pub lexicon: LexiconConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    // @provider: Passthrough (texts returned unchanged)
    #[default]
    Passthrough,
    // @provider: Mock (texts tagged with the target language)
    Mock,
}

impl TranslatorKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Passthrough => "Passthrough",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Passthrough => "passthrough".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

// Implement Display trait for TranslatorKind
impl std::fmt::Display for TranslatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslatorKind
impl std::str::FromStr for TranslatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow::anyhow!("Invalid translator kind: {}", s)),
        }
    }
}

/// Batched translation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation backend to use
    #[serde(default)]
    pub provider: TranslatorKind,

    // @field: Segments per translation batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    // @field: Max batches in flight at once
    #[serde(default = "default_concurrent_batches")]
    pub concurrent_batches: usize,

    // @field: Retry count for failed batches
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Backoff between retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslatorKind::default(),
            batch_size: default_batch_size(),
            concurrent_batches: default_concurrent_batches(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Pipeline behaviour settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Whether to run feedback rounds when the first score is low
    #[serde(default = "default_true")]
    pub auto_optimize: bool,

    /// Upper bound on feedback rounds per run
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Whether to emit a bilingual subtitle track alongside the translation
    #[serde(default)]
    pub bilingual: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_optimize: true,
            max_rounds: default_max_rounds(),
            bilingual: false,
        }
    }
}

/// Lexicon store settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LexiconConfig {
    /// Whether externally loaded corrections and terms are applied
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the lexicon documents; defaults to the user config dir
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl LexiconConfig {
    /// Resolve the lexicon directory, falling back to `<config dir>/subalign`
    pub fn resolved_directory(&self) -> PathBuf {
        if let Some(dir) = &self.directory {
            return dir.clone();
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subalign")
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching log crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }

    // @returns: Lowercase level identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Error => "error".to_string(),
            Self::Warn => "warn".to_string(),
            Self::Info => "info".to_string(),
            Self::Debug => "debug".to_string(),
            Self::Trace => "trace".to_string(),
        }
    }
}

// Implement Display trait for LogLevel
impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for LogLevel
impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_speaker_rate() -> f64 {
    1.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_batch_size() -> usize {
    10
}

fn default_concurrent_batches() -> usize {
    4
}

fn default_retry_count() -> u32 {
    2 // Default to 2 retries
}

fn default_retry_backoff_ms() -> u64 {
    500 // 500ms between attempts on the same batch
}

fn default_max_rounds() -> usize {
    crate::feedback::MAX_FEEDBACK_ROUNDS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path.as_ref(), json)
            .context(format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate languages
        crate::language_utils::get_language_name(&self.source_language)
            .map_err(|_| ConfigError::UnknownLanguage(self.source_language.clone()))?;
        crate::language_utils::get_language_name(&self.target_language)
            .map_err(|_| ConfigError::UnknownLanguage(self.target_language.clone()))?;

        if !self.speaker_rate.is_finite() || self.speaker_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "speaker_rate".to_string(),
                reason: "must be a positive number".to_string(),
            });
        }

        if self.translation.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translation.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.translation.concurrent_batches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translation.concurrent_batches".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.pipeline.auto_optimize && self.pipeline.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_rounds".to_string(),
                reason: "must be at least 1 when auto_optimize is enabled".to_string(),
            });
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            speaker_rate: default_speaker_rate(),
            output_dir: default_output_dir(),
            translation: TranslationConfig::default(),
            pipeline: PipelineConfig::default(),
            lexicon: LexiconConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
