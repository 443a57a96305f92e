use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::config::PipelineConfig;
use crate::preprocessing::bad_channels::{interpolate_bad_channels, BadChannelDetector, BadChannelFindings};
use crate::preprocessing::capabilities::{ArtifactSubspaceRemover, CapabilityError, ComponentClassifier};
use crate::preprocessing::gedai::{self, DecompositionPath, GedaiReport};
use crate::preprocessing::ica;
use crate::preprocessing::log::{PipelineStage, ProcessingLog, StepLog};
use crate::signal::{filter, SignalBuffer, SignalError};
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Traditional,
    Gedai,
}
impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Traditional, Strategy::Gedai];
    pub fn key(&self) -> &'static str {
        match self {
            Strategy::Traditional => "traditional",
            Strategy::Gedai => "gedai",
        }
    }
    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::Traditional => "Traditional",
            Strategy::Gedai => "GEDAI",
        }
    }
    fn heading(&self) -> &'static str {
        match self {
            Strategy::Traditional => "TRADITIONAL PREPROCESSING: ASR + ICA + COMPONENT LABELLING",
            Strategy::Gedai => "GEDAI PREPROCESSING: Eigenvalue-Based Artifact Removal",
        }
    }
    fn total_steps(&self) -> usize {
        match self {
            Strategy::Traditional => 7,
            Strategy::Gedai => 6,
        }
    }
}
impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
impl FromStr for Strategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traditional" => Ok(Strategy::Traditional),
            "gedai" => Ok(Strategy::Gedai),
            other => Err(format!("unknown strategy `{other}`")),
        }
    }
}
/// Shared flag checked between pipeline stages.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
/// A run stopped at a stage boundary; carries the log accumulated so far.
#[derive(Clone, Debug, Error)]
#[error("preprocessing cancelled after {} of its stages", .log.steps.len())]
pub struct Cancelled {
    pub log: ProcessingLog,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IcaReport {
    pub n_components: usize,
    pub iterations: usize,
    pub excluded: Vec<usize>,
    /// Whether a classifier's labels decided the exclusion.
    pub classified: bool,
}
/// Everything one pipeline run produces.
#[derive(Clone, Debug)]
pub struct ProcessingResult {
    pub strategy: Strategy,
    pub cleaned: SignalBuffer,
    pub log: ProcessingLog,
    pub bad_channels: Option<BadChannelFindings>,
    pub ica: Option<IcaReport>,
    pub gedai: Option<GedaiReport>,
}
#[derive(Debug, Error)]
enum StageError {
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
/// Runs one preprocessing strategy over a recording.
///
/// Every stage is guarded: a failing stage is logged as degraded and the
/// buffer it received flows on unchanged, so a run always reaches its final
/// stage. The input buffer is never modified.
#[derive(Clone)]
pub struct PreprocessingPipeline {
    strategy: Strategy,
    config: PipelineConfig,
    subspace_remover: Option<Arc<dyn ArtifactSubspaceRemover>>,
    classifier: Option<Arc<dyn ComponentClassifier>>,
}
impl PreprocessingPipeline {
    pub fn new(strategy: Strategy, config: PipelineConfig) -> Self {
        Self {
            strategy,
            config,
            subspace_remover: None,
            classifier: None,
        }
    }
    pub fn with_subspace_remover(mut self, remover: Arc<dyn ArtifactSubspaceRemover>) -> Self {
        self.subspace_remover = Some(remover);
        self
    }
    pub fn with_classifier(mut self, classifier: Arc<dyn ComponentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
    pub fn run(&self, input: &SignalBuffer) -> ProcessingResult {
        match self.stages(input, |_| Ok::<(), Infallible>(())) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }
    pub fn run_with_cancel(
        &self,
        input: &SignalBuffer,
        cancel: &CancellationToken,
    ) -> Result<ProcessingResult, Cancelled> {
        self.stages(input, |log| {
            if cancel.is_cancelled() {
                log::info!("{} pipeline cancelled after {} stages", self.strategy, log.steps.len());
                Err(Cancelled { log: log.clone() })
            } else {
                Ok(())
            }
        })
    }
    fn stages<E>(
        &self,
        input: &SignalBuffer,
        mut checkpoint: impl FnMut(&ProcessingLog) -> Result<(), E>,
    ) -> Result<ProcessingResult, E> {
        let total = self.strategy.total_steps();
        let filters = &self.config.filters;
        let mut log = ProcessingLog::new(self.strategy.heading());
        let mut current = input.clone();
        let mut bad_channels = None;
        let mut ica_report = None;
        let mut gedai_report = None;
        log::info!("{} preprocessing started", self.strategy);
        checkpoint(&log)?;
        current = guarded(
            &mut log,
            StepLog::new(1, total, PipelineStage::ChannelSelect, "Selecting EEG channels"),
            current,
            |buffer, step| {
                let picked = filter::pick_eeg(buffer)?;
                step.note(format!("Selected {} EEG channels", picked.n_channels()));
                Ok(picked)
            },
        );
        checkpoint(&log)?;
        current = guarded(
            &mut log,
            StepLog::new(2, total, PipelineStage::Reference, "Setting average reference"),
            current,
            |buffer, step| {
                let referenced = filter::average_reference(buffer)?;
                step.note("Average reference applied");
                Ok(referenced)
            },
        );
        checkpoint(&log)?;
        current = guarded(
            &mut log,
            StepLog::new(
                3,
                total,
                PipelineStage::Bandpass,
                format!(
                    "Applying bandpass filter ({}-{} Hz)",
                    filters.bandpass_low_hz, filters.bandpass_high_hz
                ),
            ),
            current,
            |buffer, step| {
                let filtered = filter::bandpass(
                    buffer,
                    filters.bandpass_low_hz,
                    filters.bandpass_high_hz,
                    filters.filter_order,
                )?;
                step.note("Bandpass filter applied");
                Ok(filtered)
            },
        );
        checkpoint(&log)?;
        current = guarded(
            &mut log,
            StepLog::new(
                4,
                total,
                PipelineStage::Notch,
                format!("Applying notch filter ({} Hz)", filters.line_freq_hz),
            ),
            current,
            |buffer, step| {
                let filtered = filter::notch_buffer(buffer, filters.line_freq_hz, filters.notch_q)?;
                step.note("Notch filter applied");
                Ok(filtered)
            },
        );
        checkpoint(&log)?;
        match self.strategy {
            Strategy::Traditional => {
                current = guarded(
                    &mut log,
                    StepLog::new(
                        5,
                        total,
                        PipelineStage::ArtifactStage,
                        "Detecting bad channels and applying ASR",
                    ),
                    current,
                    |buffer, step| {
                        let (repaired, findings) = self.repair_channels(buffer, step)?;
                        bad_channels = Some(findings);
                        Ok(self.apply_subspace_remover(repaired, step))
                    },
                );
                checkpoint(&log)?;
                current = guarded(
                    &mut log,
                    StepLog::new(
                        6,
                        total,
                        PipelineStage::Reconstruction,
                        "Running ICA for remaining artifacts",
                    ),
                    current,
                    |buffer, step| {
                        let (cleaned, report) = self.remove_components(buffer, step)?;
                        ica_report = Some(report);
                        Ok(cleaned)
                    },
                );
            }
            Strategy::Gedai => {
                current = guarded(
                    &mut log,
                    StepLog::new(
                        5,
                        total,
                        PipelineStage::ArtifactStage,
                        "Applying GEDAI (Generalized Eigenvalue Decomposition)",
                    ),
                    current,
                    |buffer, step| {
                        step.note("Computing covariance matrices and solving S v = λ R v");
                        let (cleaned, report) = gedai::apply(buffer, &self.config.gedai)?;
                        describe_gedai(&report, step);
                        gedai_report = Some(report);
                        Ok(cleaned)
                    },
                );
            }
        }
        checkpoint(&log)?;
        let mut step = StepLog::new(total, total, PipelineStage::Done, "Final processing steps");
        step.note(format!("{} preprocessing completed!", self.strategy));
        log.push(step);
        log::info!(
            "{} preprocessing finished with {} degraded stages",
            self.strategy,
            log.degraded_steps().count()
        );
        Ok(ProcessingResult {
            strategy: self.strategy,
            cleaned: current,
            log,
            bad_channels,
            ica: ica_report,
            gedai: gedai_report,
        })
    }
    fn repair_channels(
        &self,
        buffer: &SignalBuffer,
        step: &mut StepLog,
    ) -> Result<(SignalBuffer, BadChannelFindings), StageError> {
        let config = &self.config.bad_channels;
        let detector = BadChannelDetector {
            flat_ratio: config.flat_ratio,
            noisy_ratio: config.noisy_ratio,
        };
        let findings = detector.detect(buffer);
        if findings.channels.is_empty() {
            step.note("No bad channels detected");
            return Ok((buffer.clone(), findings));
        }
        step.note(format!(
            "Detected {} bad channels: {}",
            findings.channels.len(),
            findings.channels.join(", ")
        ));
        let mut flagged = buffer.clone();
        for name in &findings.channels {
            flagged.mark_bad(name)?;
        }
        if findings.fraction() < config.max_interpolate_fraction {
            let repaired = interpolate_bad_channels(&flagged)?;
            step.note("Bad channels interpolated from neighbouring channels");
            Ok((repaired, findings))
        } else {
            log::warn!(
                "{:.0}% of channels are bad; skipping interpolation",
                findings.fraction() * 100.0
            );
            step.note(format!(
                "Warning: too many bad channels ({:.0}%) to interpolate safely; left flagged",
                findings.fraction() * 100.0
            ));
            Ok((flagged, findings))
        }
    }
    /// Artifact subspace reconstruction. Its failure keeps the stage's other work.
    fn apply_subspace_remover(&self, buffer: SignalBuffer, step: &mut StepLog) -> SignalBuffer {
        let Some(remover) = &self.subspace_remover else {
            step.note("ASR not available; skipping artifact subspace reconstruction");
            return buffer;
        };
        let seconds = self.config.asr.calibration_seconds.min(buffer.duration_seconds());
        let calibration = buffer.head_seconds(seconds);
        let repaired = remover
            .fit(&calibration)
            .and_then(|model| {
                step.note(format!("ASR model fitted on first {seconds:.1} s of data"));
                model.transform(&buffer)
            })
            .map_err(StageError::from)
            .and_then(|repaired| Ok(buffer.with_data(repaired.data().to_owned())?));
        match repaired {
            Ok(repaired) => {
                step.note("ASR artifact removal completed");
                repaired
            }
            Err(err) => {
                step.degrade(format!("Error in ASR: {err}; continuing without ASR"));
                buffer
            }
        }
    }
    fn remove_components(
        &self,
        buffer: &SignalBuffer,
        step: &mut StepLog,
    ) -> Result<(SignalBuffer, IcaReport), StageError> {
        let config = &self.config.ica;
        let good = buffer.good_channel_indices();
        if good.len() < 2 {
            return Err(SignalError::TooFewChannels {
                needed: 2,
                actual: good.len(),
            }
            .into());
        }
        let n_components = config.max_components.min(good.len() - 1);
        let fit_copy = filter::highpass_buffer(buffer, config.highpass_hz, self.config.filters.filter_order)?
            .select_channels(&good)?;
        let fit = ica::fit_infomax(fit_copy.data(), n_components, config.max_iter, config.seed)?;
        let mut components = fit.components;
        step.note(format!(
            "ICA fitted with {} components in {} iterations",
            components.n_components(),
            fit.iterations
        ));
        let (excluded, classified) = match &self.classifier {
            Some(classifier) => match classifier
                .classify(&fit_copy, &components)
                .and_then(|labels| config.exclusion_policy.select(&labels, components.n_components()))
            {
                Ok(excluded) => {
                    step.note(format!("Classifier identified {} artifact components", excluded.len()));
                    (excluded, true)
                }
                Err(err) => {
                    step.note(format!("Warning: component classification failed: {err}"));
                    (Vec::new(), false)
                }
            },
            None => {
                step.note("Component classifier not available - using variance heuristic");
                let excluded = components
                    .high_variance_components(config.heuristic_variance_ratio, config.heuristic_max_excluded);
                step.note(format!("Heuristic flagged {} high-variance components", excluded.len()));
                (excluded, false)
            }
        };
        if excluded.is_empty() {
            step.skip("No components excluded");
        } else {
            step.note(format!("Excluded components: {excluded:?}"));
        }
        for &idx in &excluded {
            components.exclude(idx);
        }
        let cleaned_rows = components.remove_excluded(buffer.data().select(Axis(0), &good).view());
        let mut data = buffer.data().to_owned();
        for (row, &channel) in good.iter().enumerate() {
            data.row_mut(channel).assign(&cleaned_rows.row(row));
        }
        step.note("ICA applied successfully");
        Ok((
            buffer.with_data(data)?,
            IcaReport {
                n_components: components.n_components(),
                iterations: fit.iterations,
                excluded,
                classified,
            },
        ))
    }
}
fn guarded(
    log: &mut ProcessingLog,
    mut step: StepLog,
    current: SignalBuffer,
    stage: impl FnOnce(&SignalBuffer, &mut StepLog) -> Result<SignalBuffer, StageError>,
) -> SignalBuffer {
    let next = match stage(&current, &mut step) {
        Ok(next) => next,
        Err(err) => {
            step.degrade(format!("Error: {err}; continuing with unchanged data"));
            current
        }
    };
    log.push(step);
    next
}
fn describe_gedai(report: &GedaiReport, step: &mut StepLog) {
    if report.path == DecompositionPath::SignalOnlyFallback {
        step.note("Generalized decomposition failed; fell back to standard eigenvalue decomposition");
    }
    let min = report.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    let max = report.eigenvalues.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    step.note(format!(
        "Computed {} eigenvalues in range [{min:.4}, {max:.4}]",
        report.eigenvalues.len()
    ));
    if report.auto_selected {
        step.note(format!(
            "Auto-selected {} components (out of {})",
            report.n_components, report.n_channels
        ));
    } else {
        step.note(format!("Using {} components (user-specified)", report.n_components));
    }
    step.note(format!("Kept {} signal components", report.n_components));
    step.note(format!(
        "Removed {} artifact components",
        report.n_channels - report.n_components
    ));
    step.note(format!(
        "Removed {:.2}% of total power as artifacts",
        report.removed_percent()
    ));
}
