// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::align::AlignmentDocument;
use crate::app_config::{Config, TranslatorKind};
use crate::pipeline::PipelineSession;
use crate::quality::QualityEvaluator;
use crate::subtitle::SubtitleTrack;
use crate::translation::{MockTranslator, PassthroughTranslator, Translator};

mod align;
mod app_config;
mod classify;
mod errors;
mod feedback;
mod language_utils;
mod merger;
mod normalize;
mod pipeline;
mod quality;
mod segmenter;
mod subtitle;
mod terminology;
mod translation;

/// CLI Wrapper for TranslatorKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslatorKind {
    Passthrough,
    Mock,
}

impl From<CliTranslatorKind> for TranslatorKind {
    fn from(cli_kind: CliTranslatorKind) -> Self {
        match cli_kind {
            CliTranslatorKind::Passthrough => TranslatorKind::Passthrough,
            CliTranslatorKind::Mock => TranslatorKind::Mock,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: segment, translate, align, score (default command)
    #[command(alias = "run")]
    Process(ProcessArgs),

    /// Re-segment a transcript without translating and write the result as SRT
    Segment(SegmentArgs),

    /// Score a translated subtitle file against its original
    Evaluate(EvaluateArgs),

    /// Generate shell completions for subalign
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input transcript: an SRT file or a JSON fragment list
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for the translated subtitles and the alignment document
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'ja', 'en')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation backend to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslatorKind>,

    /// Speaking-rate multiplier for the synthesis voice
    #[arg(long)]
    speaker_rate: Option<f64>,

    /// Reference translation (SRT) enabling the n-gram quality axis
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Upper bound on feedback rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Also write a bilingual subtitle track
    #[arg(long)]
    bilingual: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct SegmentArgs {
    /// Input transcript: an SRT file or a JSON fragment list
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for the re-segmented subtitle file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct EvaluateArgs {
    /// Original subtitle file (SRT)
    #[arg(value_name = "ORIGINAL")]
    original: PathBuf,

    /// Translated subtitle file (SRT)
    #[arg(value_name = "TRANSLATED")]
    translated: PathBuf,

    /// Reference translation (SRT) enabling the n-gram quality axis
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subalign - adaptive subtitle segmentation, translation QA and timing alignment
///
/// Turns raw speech transcripts into well-formed subtitle segments, translates
/// them in batches, scores the result, and re-aligns the translated timing for
/// speech synthesis.
#[derive(Parser, Debug)]
#[command(name = "subalign")]
#[command(version = "0.1.0")]
#[command(about = "Adaptive subtitle segmentation, translation QA and timing alignment")]
#[command(long_about = "subalign re-segments raw speech transcripts into well-formed subtitles,
translates them in batches, scores the translation, and aligns the translated
timing against per-language pacing for downstream speech synthesis.

EXAMPLES:
    subalign talk.srt                            # Full pipeline with default config
    subalign -s en -t zh talk.srt                # Translate from English to Chinese
    subalign --speaker-rate 1.2 talk.srt         # Faster synthesis voice
    subalign --reference human.srt talk.srt      # Score against a human translation
    subalign --bilingual talk.srt                # Also write a dual-language track
    subalign segment talk.json                   # Re-segment only, no translation
    subalign evaluate talk.srt talk.zh.srt       # Score an existing translation
    subalign completions bash > subalign.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

TRANSLATION BACKENDS:
    passthrough - returns text unchanged (default; alignment and QA only)
    mock        - tags text with the target language, for demos and tests
    Real machine-translation engines plug in through the library's Translator
    trait.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input transcript: an SRT file or a JSON fragment list
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Directory for the translated subtitles and the alignment document
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'ja', 'en')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation backend to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslatorKind>,

    /// Speaking-rate multiplier for the synthesis voice
    #[arg(long)]
    speaker_rate: Option<f64>,

    /// Reference translation (SRT) enabling the n-gram quality axis
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Upper bound on feedback rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Also write a bilingual subtitle track
    #[arg(long)]
    bilingual: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");

            let mut stderr = std::io::stderr();
            let emoji = Self::get_emoji_for_level(record.level());
            let color = match record.level() {
                Level::Error => "\x1B[1;31m",
                Level::Warn => "\x1B[1;33m",
                Level::Info => "\x1B[1;32m",
                Level::Debug => "\x1B[1;36m",
                Level::Trace => "\x1B[1;35m",
            };
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    // Handle subcommands
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subalign", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Process(args)) => run_process(args).await,
        Some(Commands::Segment(args)) => run_segment(args),
        Some(Commands::Evaluate(args)) => run_evaluate(args),
        None => {
            // Default behavior - use top-level args for backwards compatibility
            let input = cli
                .input
                .ok_or_else(|| anyhow!("INPUT is required when no subcommand is specified"))?;

            let process_args = ProcessArgs {
                input,
                output_dir: cli.output_dir,
                source_language: cli.source_language,
                target_language: cli.target_language,
                provider: cli.provider,
                speaker_rate: cli.speaker_rate,
                reference: cli.reference,
                max_rounds: cli.max_rounds,
                bilingual: cli.bilingual,
                report: cli.report,
                config: cli.config,
                log_level: cli.log_level,
            };
            run_process(process_args).await
        }
    }
}

/// Load the configuration file, creating a default one when missing
fn load_config(config_path: &str, log_level: &Option<CliLogLevel>) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let config = if Path::new(config_path).exists() {
        let mut config = Config::from_file(config_path)?;

        // Update log level in config if specified via command line
        if let Some(level) = log_level {
            config.log_level = level.clone().into();
        }

        config
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let mut config = Config::default();
        if let Some(level) = log_level {
            config.log_level = level.clone().into();
        }
        config.save(config_path)?;

        config
    };

    // If log level was not set via command line, update it from config now
    if log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

/// Normalize a CLI language override to its shortest ISO form
fn normalized_language(code: &str) -> Result<String> {
    language_utils::normalize_to_part1_or_part2t(code)
        .with_context(|| format!("Unsupported language code: {}", code))
}

fn build_translator(kind: &TranslatorKind) -> Arc<dyn Translator> {
    match kind {
        TranslatorKind::Passthrough => Arc::new(PassthroughTranslator::new()),
        TranslatorKind::Mock => Arc::new(MockTranslator::new()),
    }
}

/// Read a transcript from SRT or JSON, keyed off the file extension
fn load_track(path: &Path, language: &str) -> Result<SubtitleTrack> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("json") => SubtitleTrack::from_json_file(path, language),
        _ => SubtitleTrack::from_srt_file(path, language),
    }
}

/// Reference texts for the n-gram axis, in cue order
fn load_reference_texts(path: &Path) -> Result<Vec<String>> {
    let track = SubtitleTrack::from_srt_file(path, "ref")?;
    Ok(track.segments.into_iter().map(|s| s.text).collect())
}

async fn run_process(args: ProcessArgs) -> Result<()> {
    let mut config = load_config(&args.config, &args.log_level)?;

    // Override config with CLI options if provided
    if let Some(source) = &args.source_language {
        config.source_language = normalized_language(source)?;
    }
    if let Some(target) = &args.target_language {
        config.target_language = normalized_language(target)?;
    }
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(rate) = args.speaker_rate {
        config.speaker_rate = rate;
    }
    if let Some(rounds) = args.max_rounds {
        config.pipeline.max_rounds = rounds;
    }
    if args.bilingual {
        config.pipeline.bilingual = true;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate().context("Configuration validation failed")?;

    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input));
    }

    let track = load_track(&args.input, &config.source_language)?;
    info!(
        "Loaded {} segments from {}",
        track.len(),
        args.input.display()
    );

    let translator = build_translator(&config.translation.provider);
    info!("Translation backend: {}", config.translation.provider.display_name());

    let output_dir = config.output_dir.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let mut session = PipelineSession::new(config.clone(), translator)?;
    if let Some(reference_path) = &args.reference {
        let reference = load_reference_texts(reference_path)?;
        info!(
            "Loaded {} reference texts from {}",
            reference.len(),
            reference_path.display()
        );
        session = session.with_reference(reference);
    }

    let outcome = session.run(&track).await?;

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let srt_path = output_dir.join(format!("{}.{}.srt", stem, config.target_language));
    outcome.translated_track().write_srt(&srt_path)?;
    info!("Wrote translated subtitles to {}", srt_path.display());

    if config.pipeline.bilingual {
        let bilingual_path = output_dir.join(format!(
            "{}.{}-{}.srt",
            stem, config.target_language, config.source_language
        ));
        outcome.bilingual_track()?.write_srt(&bilingual_path)?;
        info!("Wrote bilingual subtitles to {}", bilingual_path.display());
    }

    let align_path = output_dir.join(format!("{}.{}.align.json", stem, config.target_language));
    AlignmentDocument::from_aligned(&outcome.aligned).write_json(&align_path)?;

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&outcome.report)
            .context("Failed to serialize the run report to JSON")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write run report: {}", report_path.display()))?;
        info!("Wrote run report to {}", report_path.display());
    }

    Ok(())
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let mut config = load_config(&args.config, &args.log_level)?;

    if let Some(source) = &args.source_language {
        config.source_language = normalized_language(source)?;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate().context("Configuration validation failed")?;

    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input));
    }

    let track = load_track(&args.input, &config.source_language)?;
    info!(
        "Loaded {} segments from {}",
        track.len(),
        args.input.display()
    );

    let output_dir = config.output_dir.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let translator = build_translator(&config.translation.provider);
    let source_language = config.source_language.clone();
    let session = PipelineSession::new(config, translator)?;
    let (segments, analysis) = session.segment_only(&track);
    info!(
        "Segmentation: {} fragments → {} segments ({})",
        track.len(),
        segments.len(),
        analysis.summary()
    );

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let srt_path = output_dir.join(format!("{}.segmented.srt", stem));
    SubtitleTrack::from_segments(segments, &source_language).write_srt(&srt_path)?;
    info!("Wrote re-segmented subtitles to {}", srt_path.display());

    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    if let Some(level) = &args.log_level {
        let config_level: app_config::LogLevel = level.clone().into();
        log::set_max_level(config_level.to_level_filter());
    }

    let original = SubtitleTrack::from_srt_file(&args.original, "source")?;
    let translated = SubtitleTrack::from_srt_file(&args.translated, "target")?;

    let reference = match &args.reference {
        Some(path) => Some(load_reference_texts(path)?),
        None => None,
    };

    let evaluator = QualityEvaluator::new();
    let report = evaluator.evaluate(
        &original.segments,
        &translated.segments,
        Some(&translated.segments),
        reference.as_deref(),
    );

    info!("Quality: {}", report.summary());
    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize the quality report to JSON")?;
    println!("{}", json);

    Ok(())
}
