/*!
 * Closed-loop parameter tuning.
 *
 * The controller owns the adjustable parameter set and a bounded history of
 * quality reports. Each iteration evaluates the current output, flags the
 * axes that cross their thresholds, nudges exactly one parameter per flagged
 * axis, and records the report. The caller re-runs segmentation and
 * translation with the updated values and keeps the round only if the
 * overall score improved.
 */

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::quality::{QualityEvaluator, QualityReport};
use crate::subtitle::Segment;

/// Rounds the optimizer may run per session
pub const MAX_FEEDBACK_ROUNDS: usize = 3;

/// Overall score below which auto-optimization engages
pub const AUTO_OPTIMIZE_THRESHOLD: f64 = 0.8;

/// Reports kept for trend inspection
const MAX_HISTORY: usize = 10;

const FRAGMENTATION_THRESHOLD: f64 = 0.3;
const TIMESTAMP_THRESHOLD: f64 = 0.1;
const COHERENCE_THRESHOLD: f64 = 0.5;
const NGRAM_THRESHOLD: f64 = 0.3;

/// The closed set of tunable knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Scales the merger's gap allowance
    MergeThreshold,

    /// Upper character bound fed to segmentation and splitting
    MaxSegmentChars,

    /// Texts per translation batch
    TranslationBatchSize,

    /// Sensitivity of the upstream boundary detector
    DetectionThreshold,
}

impl ParameterKind {
    pub fn all() -> [ParameterKind; 4] {
        [
            ParameterKind::MergeThreshold,
            ParameterKind::MaxSegmentChars,
            ParameterKind::TranslationBatchSize,
            ParameterKind::DetectionThreshold,
        ]
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::MergeThreshold => "merge_threshold",
            ParameterKind::MaxSegmentChars => "max_segment_chars",
            ParameterKind::TranslationBatchSize => "translation_batch_size",
            ParameterKind::DetectionThreshold => "detection_threshold",
        };
        write!(f, "{name}")
    }
}

/// A bounded knob with its step size and live value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustableParameter {
    pub kind: ParameterKind,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub current: f64,
    pub default: f64,
}

impl AdjustableParameter {
    /// The tuned range and default for a knob
    pub fn for_kind(kind: ParameterKind) -> Self {
        let (min, max, step, default) = match kind {
            ParameterKind::MergeThreshold => (0.3, 2.0, 0.1, 1.0),
            ParameterKind::MaxSegmentChars => (50.0, 200.0, 10.0, 120.0),
            ParameterKind::TranslationBatchSize => (5.0, 20.0, 5.0, 10.0),
            ParameterKind::DetectionThreshold => (0.3, 0.7, 0.05, 0.5),
        };
        AdjustableParameter {
            kind,
            min,
            max,
            step,
            current: default,
            default,
        }
    }

    /// One step up, clamped to the ceiling
    pub fn increased(&self) -> f64 {
        (self.current + self.step).min(self.max)
    }

    /// One step down, clamped to the floor
    pub fn decreased(&self) -> f64 {
        (self.current - self.step).max(self.min)
    }

    /// Set the live value, clamped into range
    pub fn set(&mut self, value: f64) {
        self.current = value.clamp(self.min, self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.default;
    }
}

/// Per-axis severities; zero means the axis is healthy
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorAnalysis {
    pub fragmentation: f64,
    pub timestamp: f64,
    pub coherence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<f64>,
}

impl ErrorAnalysis {
    pub fn any_flagged(&self) -> bool {
        self.fragmentation > 0.0
            || self.timestamp > 0.0
            || self.coherence > 0.0
            || self.translation.is_some_and(|s| s > 0.0)
    }
}

/// One suggested parameter nudge
#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub kind: ParameterKind,
    pub previous: f64,
    pub suggested: f64,
    pub reason: &'static str,
}

/// Everything one feedback round produced
#[derive(Debug, Clone)]
pub struct IterationResult {
    pub report: QualityReport,
    pub errors: ErrorAnalysis,
    pub adjustments: Vec<Adjustment>,
    /// Whether this round's score beat the previously recorded one
    pub improved: bool,
}

/// Evaluates, diagnoses and retunes between pipeline rounds
#[derive(Debug, Clone)]
pub struct FeedbackController {
    evaluator: QualityEvaluator,
    parameters: BTreeMap<ParameterKind, AdjustableParameter>,
    history: VecDeque<QualityReport>,
}

impl Default for FeedbackController {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackController {
    pub fn new() -> Self {
        let parameters = ParameterKind::all()
            .into_iter()
            .map(|kind| (kind, AdjustableParameter::for_kind(kind)))
            .collect();
        FeedbackController {
            evaluator: QualityEvaluator::new(),
            parameters,
            history: VecDeque::new(),
        }
    }

    /// Live value of one knob
    pub fn value(&self, kind: ParameterKind) -> f64 {
        self.parameters[&kind].current
    }

    /// Seed one knob with an externally configured value, clamped into range
    pub fn set_value(&mut self, kind: ParameterKind, value: f64) {
        if let Some(param) = self.parameters.get_mut(&kind) {
            param.set(value);
        }
    }

    /// Snapshot of every knob's live value
    pub fn current_values(&self) -> BTreeMap<ParameterKind, f64> {
        self.parameters
            .iter()
            .map(|(kind, param)| (*kind, param.current))
            .collect()
    }

    pub fn history(&self) -> &VecDeque<QualityReport> {
        &self.history
    }

    /// Flag every axis that crosses its threshold
    pub fn analyze(&self, report: &QualityReport) -> ErrorAnalysis {
        let fragmentation = if report.fragmentation_score > FRAGMENTATION_THRESHOLD {
            report.fragmentation_score.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let timestamp = if report.timestamp_error > TIMESTAMP_THRESHOLD {
            (report.timestamp_error / TIMESTAMP_THRESHOLD).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let coherence = if report.coherence_score < COHERENCE_THRESHOLD {
            (1.0 - report.coherence_score).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let translation = report.n_gram_score.map(|score| {
            if score < NGRAM_THRESHOLD {
                (1.0 - score).clamp(0.0, 1.0)
            } else {
                0.0
            }
        });

        ErrorAnalysis {
            fragmentation,
            timestamp,
            coherence,
            translation,
        }
    }

    /// One bounded nudge per flagged axis
    pub fn suggest(&self, errors: &ErrorAnalysis) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();

        if errors.fragmentation > 0.0 {
            let param = &self.parameters[&ParameterKind::MergeThreshold];
            adjustments.push(Adjustment {
                kind: ParameterKind::MergeThreshold,
                previous: param.current,
                suggested: param.increased(),
                reason: "output too fragmented, widening the merge window",
            });
        }

        if errors.timestamp > 0.0 {
            let param = &self.parameters[&ParameterKind::DetectionThreshold];
            adjustments.push(Adjustment {
                kind: ParameterKind::DetectionThreshold,
                previous: param.current,
                suggested: param.decreased(),
                reason: "timing drift too high, relaxing boundary detection",
            });
        }

        if errors.coherence > 0.0 {
            let param = &self.parameters[&ParameterKind::TranslationBatchSize];
            adjustments.push(Adjustment {
                kind: ParameterKind::TranslationBatchSize,
                previous: param.current,
                suggested: param.increased(),
                reason: "neighbors read disconnected, batching more context",
            });
        }

        if errors.translation.is_some_and(|s| s > 0.0) {
            let param = &self.parameters[&ParameterKind::MaxSegmentChars];
            adjustments.push(Adjustment {
                kind: ParameterKind::MaxSegmentChars,
                previous: param.current,
                suggested: param.decreased(),
                reason: "translation precision low, shortening segments",
            });
        }

        adjustments
    }

    /// Commit suggested values to the live parameter set
    pub fn apply(&mut self, adjustments: &[Adjustment]) {
        for adjustment in adjustments {
            if let Some(param) = self.parameters.get_mut(&adjustment.kind) {
                param.set(adjustment.suggested);
                info!(
                    "Adjusting {}: {:.2} -> {:.2} ({})",
                    adjustment.kind, adjustment.previous, param.current, adjustment.reason
                );
            }
        }
    }

    /// Evaluate, diagnose, retune and record one round
    pub fn run_iteration(
        &mut self,
        original: &[Segment],
        translated: &[Segment],
        aligned: Option<&[Segment]>,
        reference: Option<&[String]>,
    ) -> IterationResult {
        let report = self.evaluator.evaluate(original, translated, aligned, reference);
        let errors = self.analyze(&report);
        let adjustments = self.suggest(&errors);
        self.apply(&adjustments);

        let improved = self
            .history
            .back()
            .is_some_and(|previous| report.overall_score > previous.overall_score);

        self.record(report.clone());
        debug!(
            "Feedback round: {} ({} adjustments, improved: {improved})",
            report.summary(),
            adjustments.len()
        );

        IterationResult {
            report,
            errors,
            adjustments,
            improved,
        }
    }

    /// Record a report, trimming the history to its bound
    pub fn record(&mut self, report: QualityReport) {
        self.history.push_back(report);
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Back to defaults, history cleared
    pub fn reset(&mut self) {
        for param in self.parameters.values_mut() {
            param.reset();
        }
        self.history.clear();
    }
}
