use std::fmt;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};
use serde::{Deserialize, Serialize};

// @module: Segment model and subtitle track I/O

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

// @struct: Word-level timing inside a segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    // @field: Word token
    pub token: String,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Recognizer confidence, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

// @struct: Single timestamped transcript segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Segment text
    pub text: String,

    // @field: Optional word-level timings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTiming>,
}

impl Segment {
    /// Creates a new segment - used by tests and external consumers
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Segment {
            start,
            end,
            text: text.into(),
            words: Vec::new(),
        }
    }

    // @creates: Validated segment
    // @validates: Time range and non-empty text
    pub fn new_validated(start: f64, end: f64, text: String) -> Result<Self> {
        // Validate time range
        if end < start {
            return Err(anyhow!(
                "Invalid time range: end time {:.3} < start time {:.3}",
                end, start
            ));
        }

        // Validate text is not empty (after trimming)
        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty segment text at {:.3}s", start));
        }

        Ok(Segment {
            start,
            end,
            text: trimmed_text.to_string(),
            words: Vec::new(),
        })
    }

    /// Duration of the segment in seconds
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Character count of the text (Unicode scalar values)
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whitespace-separated word count of the text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Silence between this segment and the next, clamped at zero
    pub fn gap_to(&self, next: &Segment) -> f64 {
        (next.start - self.end).max(0.0)
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
        let parts: Vec<&str> = timestamp.split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        // Validate time components
        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
    }

    /// Format a time in seconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(seconds: f64) -> String {
        let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let millis = total_ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start),
            Self::format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.text)
    }
}

/// Ordered collection of segments with source metadata
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    /// Source filename
    pub source_file: PathBuf,

    /// Ordered list of segments
    pub segments: Vec<Segment>,

    /// Language of the track
    pub language: String,
}

impl SubtitleTrack {
    /// Create an empty track
    pub fn new(source_file: PathBuf, language: String) -> Self {
        SubtitleTrack {
            source_file,
            segments: Vec::new(),
            language,
        }
    }

    /// Wrap an existing segment list in a track
    pub fn from_segments(segments: Vec<Segment>, language: &str) -> Self {
        SubtitleTrack {
            source_file: PathBuf::new(),
            segments,
            language: language.to_string(),
        }
    }

    /// Number of segments in the track
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the track holds no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End time of the last-finishing segment, in seconds
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }

    /// Load a track from an SRT file
    pub fn from_srt_file<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let segments = Self::parse_srt_string(&content)?;

        Ok(SubtitleTrack {
            source_file: path.to_path_buf(),
            segments,
            language: language.to_string(),
        })
    }

    /// Load a track from a JSON fragment file, as produced by a recognizer
    ///
    /// Expected shape: `[{"start": f64, "end": f64, "text": str, "words": [...]?}, ...]`
    pub fn from_json_file<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fragment file: {}", path.display()))?;

        let mut segments: Vec<Segment> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fragment JSON: {}", path.display()))?;

        // Drop empty fragments up-front and keep start-time order
        let before = segments.len();
        segments.retain(|s| !s.text.trim().is_empty());
        if segments.len() < before {
            warn!("Dropped {} empty fragments from {}", before - segments.len(), path.display());
        }
        segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

        if segments.is_empty() {
            return Err(anyhow!("No usable fragments in {}", path.display()));
        }

        Ok(SubtitleTrack {
            source_file: path.to_path_buf(),
            segments,
            language: language.to_string(),
        })
    }

    /// Parse SRT format string into segments
    pub fn parse_srt_string(content: &str) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_start: Option<f64> = None;
        let mut current_end: Option<f64> = None;
        let mut current_text = String::new();
        let mut line_count = 0;

        // Helper to add the current entry if complete
        let mut add_current_entry = |seq_num: usize, start: f64, end: f64, text: &str| {
            if !text.trim().is_empty() {
                match Segment::new_validated(start, end, text.trim().to_string()) {
                    Ok(segment) => {
                        segments.push(segment);
                        true
                    },
                    Err(e) => {
                        warn!("Skipping invalid subtitle cue {}: {}", seq_num, e);
                        false
                    }
                }
            } else {
                warn!("Skipping empty subtitle cue {}", seq_num);
                false
            }
        };

        for line in content.lines() {
            line_count += 1;
            let trimmed = line.trim();

            // A blank line finalizes the entry under construction
            if trimmed.is_empty() {
                if let (Some(seq_num), Some(start), Some(end)) = (current_seq_num, current_start, current_end) {
                    if !current_text.is_empty() {
                        add_current_entry(seq_num, start, end, &current_text);

                        current_seq_num = None;
                        current_start = None;
                        current_end = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            // Try to parse as sequence number (only if we're starting a new entry)
            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            // Try to parse as timestamp line
            if current_seq_num.is_some() && current_start.is_none() && current_end.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_start = Some(Self::capture_to_seconds(&caps, 1));
                    current_end = Some(Self::capture_to_seconds(&caps, 5));
                    continue;
                }
            }

            // With a sequence number and timestamps in hand, this must be cue text
            if current_seq_num.is_some() && current_start.is_some() && current_end.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                // Likely malformed SRT; skip the line and keep scanning
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_count, trimmed);
            }
        }

        // Add the last entry if there is one
        if let (Some(seq_num), Some(start), Some(end)) = (current_seq_num, current_start, current_end) {
            if !current_text.is_empty() {
                add_current_entry(seq_num, start, end, &current_text);
            }
        }

        if segments.is_empty() {
            warn!("No valid subtitle cues found in content");
            return Err(anyhow!("No valid subtitle cues were found in the SRT content"));
        }

        // Sort by start time to ensure correct order
        segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

        // Report overlapping cues; the aligner repairs them later
        let mut overlap_count = 0;
        for i in 0..segments.len().saturating_sub(1) {
            if segments[i].end > segments[i + 1].start {
                overlap_count += 1;
            }
        }

        if overlap_count > 0 {
            debug!("Found {} overlapping subtitle cues", overlap_count);
        }

        Ok(segments)
    }

    /// Format the track as an SRT document
    pub fn to_srt_string(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            out.push_str(&format!("{}\n{}\n", i + 1, segment));
        }
        out
    }

    /// Write the track to an SRT file
    pub fn write_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        file.write_all(self.to_srt_string().as_bytes())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }

    /// Zip two equal-length tracks into a dual-language track
    ///
    /// The top track keeps its timing; each cue's text becomes
    /// `"{top}\n{bottom}"` for stacked display.
    pub fn merge_bilingual(top: &SubtitleTrack, bottom: &SubtitleTrack) -> Result<SubtitleTrack> {
        if top.len() != bottom.len() {
            return Err(anyhow!(
                "Cannot merge tracks of different lengths: {} vs {}",
                top.len(), bottom.len()
            ));
        }

        let segments = top.segments.iter()
            .zip(bottom.segments.iter())
            .map(|(t, b)| {
                let mut merged = t.clone();
                merged.text = format!("{}\n{}", t.text, b.text);
                merged.words = Vec::new();
                merged
            })
            .collect();

        Ok(SubtitleTrack {
            source_file: top.source_file.clone(),
            segments,
            language: format!("{}+{}", top.language, bottom.language),
        })
    }

    /// Convert a timestamp capture group to seconds
    fn capture_to_seconds(caps: &regex::Captures, start_idx: usize) -> f64 {
        let hours: u64 = caps.get(start_idx)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let minutes: u64 = caps.get(start_idx + 1)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let seconds: u64 = caps.get(start_idx + 2)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let millis: u64 = caps.get(start_idx + 3)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));

        (hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0
    }
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Track")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.language)?;
        writeln!(f, "Segments: {}", self.segments.len())?;
        Ok(())
    }
}
