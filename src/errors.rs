/*!
 * Error types for the subalign pipeline.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error when a required configuration value is missing
    #[error("Missing required configuration: {0}")]
    MissingValue(String),

    /// Error when a configuration value is outside its allowed range
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Error when a language code cannot be resolved
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),

    /// Error reading or parsing the configuration file
    #[error("Failed to read configuration: {0}")]
    ReadFailed(String),
}

/// Errors that can occur during subtitle parsing and formatting
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Error when no usable cue could be recovered from the input
    #[error("No valid subtitle entries were found in the input")]
    EmptyTrack,

    /// Error when a timestamp cannot be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Error when a cue fails validation
    #[error("Invalid cue {index}: {reason}")]
    InvalidCue {
        /// Sequence number of the offending cue
        index: usize,
        /// Why the cue was rejected
        reason: String,
    },

    /// Error when two tracks cannot be zipped together
    #[error("Track length mismatch: {left} vs {right} cues")]
    LengthMismatch {
        /// Cue count of the first track
        left: usize,
        /// Cue count of the second track
        right: usize,
    },
}

/// Errors that can occur during batched translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error when the translator returned a different number of texts
    #[error("Translator returned {got} texts for a batch of {expected}")]
    CountMismatch {
        /// Number of texts sent in the batch
        expected: usize,
        /// Number of texts received back
        got: usize,
    },

    /// Error when a batch failed after exhausting its retry budget
    #[error("Batch {index} failed after {attempts} attempts: {message}")]
    BatchExhausted {
        /// Zero-based batch index
        index: usize,
        /// Total attempts made, including the first
        attempts: u32,
        /// Last error message seen
        message: String,
    },

    /// Error reported by the translation backend itself
    #[error("Translator error: {0}")]
    Backend(String),
}

/// Main pipeline error type that wraps all other errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from subtitle parsing or formatting
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
