// src/engine.rs
use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use serde::Serialize;
use thiserror::Error;
use crate::config::PipelineConfig;
use crate::preprocessing::{
    ArtifactSubspaceRemover, CancellationToken, Cancelled, ComponentClassifier, PreprocessingPipeline,
    ProcessingLog, ProcessingResult, Strategy,
};
use crate::quality::{report, Comparison, ComparisonReducer, QualityMetrics, QualityMetricsEngine};
use crate::signal::{IngestError, RecordingSource, SignalBuffer};
use crate::types::{AnalysisMessage, Method};
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to load EEG data: {0}")]
    Ingest(#[from] IngestError),
    #[error("analysis cancelled")]
    Cancelled { logs: Vec<ProcessingLog> },
}
/// One analysis job: where the recording comes from and how to clean it.
pub struct AnalysisRequest {
    source: Box<dyn RecordingSource + Send>,
    method: Method,
    config: PipelineConfig,
    subspace_remover: Option<Arc<dyn ArtifactSubspaceRemover>>,
    classifier: Option<Arc<dyn ComponentClassifier>>,
}
impl AnalysisRequest {
    pub fn new(source: impl RecordingSource + Send + 'static, method: Method) -> Self {
        Self {
            source: Box::new(source),
            method,
            config: PipelineConfig::default(),
            subspace_remover: None,
            classifier: None,
        }
    }
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
    pub fn with_subspace_remover(mut self, remover: Arc<dyn ArtifactSubspaceRemover>) -> Self {
        self.subspace_remover = Some(remover);
        self
    }
    pub fn with_classifier(mut self, classifier: Arc<dyn ComponentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
    fn pipeline(&self, strategy: Strategy) -> PreprocessingPipeline {
        let mut pipeline = PreprocessingPipeline::new(strategy, self.config.clone());
        if let Some(remover) = &self.subspace_remover {
            pipeline = pipeline.with_subspace_remover(Arc::clone(remover));
        }
        if let Some(classifier) = &self.classifier {
            pipeline = pipeline.with_classifier(Arc::clone(classifier));
        }
        pipeline
    }
}
#[derive(Clone, Debug)]
pub struct StrategyOutcome {
    pub result: ProcessingResult,
    pub metrics: QualityMetrics,
}
#[derive(Clone, Debug)]
pub struct AnalysisOutput {
    pub method: Method,
    pub original: SignalBuffer,
    pub original_metrics: QualityMetrics,
    /// Ordered Traditional, then GEDAI.
    pub outcomes: BTreeMap<Strategy, StrategyOutcome>,
}
#[derive(Serialize)]
pub struct AnalysisSummary<'a> {
    pub original: &'a QualityMetrics,
    pub processed: BTreeMap<&'static str, &'a QualityMetrics>,
    pub comparison: Option<Comparison>,
}
impl AnalysisOutput {
    pub fn cleaned(&self, strategy: Strategy) -> Option<&SignalBuffer> {
        self.outcomes.get(&strategy).map(|o| &o.result.cleaned)
    }
    /// Side-by-side comparison when more than one strategy ran.
    pub fn comparison(&self) -> Option<Comparison> {
        if self.outcomes.len() < 2 {
            return None;
        }
        ComparisonReducer::compare(
            self.outcomes
                .iter()
                .map(|(strategy, outcome)| (strategy.key(), &outcome.metrics)),
        )
        .ok()
    }
    pub fn summary(&self) -> AnalysisSummary<'_> {
        AnalysisSummary {
            original: &self.original_metrics,
            processed: self
                .outcomes
                .iter()
                .map(|(strategy, outcome)| (strategy.key(), &outcome.metrics))
                .collect(),
            comparison: self.comparison(),
        }
    }
    /// Plain-text report: original metrics, per-strategy metrics, the
    /// comparison when available, then each processing log.
    pub fn report(&self) -> String {
        let mut sections = vec![format!(
            "Original Data Quality Metrics\n\n{}",
            report::render(&self.original_metrics, "EEG DATA QUALITY REPORT")
        )];
        for (strategy, outcome) in &self.outcomes {
            sections.push(format!(
                "{} - Processed Data Quality Metrics\n\n{}",
                strategy.display_name(),
                report::render(&outcome.metrics, "EEG DATA QUALITY REPORT")
            ));
        }
        if let Some(comparison) = self.comparison() {
            sections.push(comparison.render());
        }
        for (strategy, outcome) in &self.outcomes {
            sections.push(format!(
                "{} PROCESSING LOG\n{}",
                strategy.key().to_uppercase(),
                outcome.result.log
            ));
        }
        sections.join("\n\n")
    }
}
fn checkpoint(cancel: &CancellationToken, logs: &[ProcessingLog]) -> Result<(), AnalysisError> {
    if cancel.is_cancelled() {
        log::info!("analysis cancelled");
        return Err(AnalysisError::Cancelled {
            logs: logs.to_vec(),
        });
    }
    Ok(())
}
/// Load, score, clean and re-score one recording.
///
/// `progress` receives milestone percentages in increasing order. Only a load
/// failure or cancellation ends the analysis early.
pub fn run_analysis(
    mut request: AnalysisRequest,
    progress: &mut dyn FnMut(u8, &str),
    cancel: &CancellationToken,
) -> Result<AnalysisOutput, AnalysisError> {
    checkpoint(cancel, &[])?;
    progress(10, "Loading EEG data...");
    let original = request.source.load()?;
    log::info!(
        "loaded {} channels x {} samples at {} Hz",
        original.n_channels(),
        original.n_samples(),
        original.sample_rate_hz()
    );
    checkpoint(cancel, &[])?;
    progress(20, "Calculating quality metrics for original data...");
    let engine = QualityMetricsEngine::default();
    let original_metrics = engine.compute(&original);
    checkpoint(cancel, &[])?;
    progress(40, &format!("Preprocessing with {} method...", request.method));
    let pipelines: Vec<PreprocessingPipeline> = request
        .method
        .strategies()
        .into_iter()
        .map(|strategy| request.pipeline(strategy))
        .collect();
    let input = &original;
    let runs: Vec<Result<ProcessingResult, Cancelled>> = if pipelines.len() > 1 {
        thread::scope(|scope| {
            let handles: Vec<_> = pipelines
                .iter()
                .map(|pipeline| scope.spawn(move || pipeline.run_with_cancel(input, cancel)))
                .collect();
            handles
                .into_iter()
                .zip(&pipelines)
                .map(|(handle, pipeline)| {
                    handle.join().unwrap_or_else(|_| {
                        // A panicking worker still yields a result for its strategy.
                        log::error!("{} worker panicked; keeping the unprocessed buffer", pipeline.strategy());
                        Ok(ProcessingResult {
                            strategy: pipeline.strategy(),
                            cleaned: input.clone(),
                            log: ProcessingLog::new(format!("{} PREPROCESSING (worker panicked)", pipeline.strategy())),
                            bad_channels: None,
                            ica: None,
                            gedai: None,
                        })
                    })
                })
                .collect()
        })
    } else {
        pipelines
            .iter()
            .map(|pipeline| pipeline.run_with_cancel(input, cancel))
            .collect()
    };
    let mut results = Vec::with_capacity(runs.len());
    let mut partial_logs = Vec::new();
    for run in runs {
        match run {
            Ok(result) => {
                partial_logs.push(result.log.clone());
                results.push(result);
            }
            Err(cancelled) => partial_logs.push(cancelled.log),
        }
    }
    if results.len() < partial_logs.len() {
        return Err(AnalysisError::Cancelled { logs: partial_logs });
    }
    checkpoint(cancel, &partial_logs)?;
    progress(70, "Calculating quality metrics for processed data...");
    let outcomes = results
        .into_iter()
        .map(|result| {
            let metrics = engine.compute(&result.cleaned);
            (result.strategy, StrategyOutcome { result, metrics })
        })
        .collect();
    checkpoint(cancel, &partial_logs)?;
    progress(90, "Finalizing results...");
    let output = AnalysisOutput {
        method: request.method,
        original,
        original_metrics,
        outcomes,
    };
    progress(100, "Processing complete!");
    Ok(output)
}
/// Run [`run_analysis`] on a background thread, streaming progress and exactly
/// one terminal message over `tx`.
pub fn spawn_thread(
    request: AnalysisRequest,
    tx: Sender<AnalysisMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let mut progress = |percent: u8, message: &str| {
            log::info!("[{percent:3}%] {message}");
            progress_tx
                .send(AnalysisMessage::Progress {
                    percent,
                    message: message.to_owned(),
                })
                .ok();
        };
        let terminal = match run_analysis(request, &mut progress, &cancel) {
            Ok(output) => AnalysisMessage::Finished(Box::new(output)),
            Err(AnalysisError::Cancelled { logs }) => AnalysisMessage::Cancelled(logs),
            Err(err) => {
                log::error!("{err}");
                AnalysisMessage::Failed(err.to_string())
            }
        };
        tx.send(terminal).ok();
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::InMemorySource;
    use std::f64::consts::PI;
    use std::sync::mpsc;
    fn recording() -> SignalBuffer {
        let fs = 250.0;
        let rows = (0..4)
            .map(|ch| {
                (0..1500)
                    .map(|t| {
                        let x = t as f64 / fs;
                        20e-6 * (2.0 * PI * 10.0 * x).sin() + 3e-6 * (2.0 * PI * (4.0 + ch as f64) * x).sin()
                    })
                    .collect()
            })
            .collect();
        let names = (0..4).map(|i| format!("EEG{i}")).collect();
        SignalBuffer::from_rows(names, fs, rows).unwrap()
    }
    #[test]
    fn worker_reports_milestones_then_finishes() {
        let (tx, rx) = mpsc::channel();
        let request = AnalysisRequest::new(InMemorySource::new([recording()]), Method::Gedai);
        spawn_thread(request, tx, CancellationToken::new()).join().unwrap();
        let messages: Vec<AnalysisMessage> = rx.try_iter().collect();
        let percents: Vec<u8> = messages
            .iter()
            .filter_map(|m| match m {
                AnalysisMessage::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![10, 20, 40, 70, 90, 100]);
        assert!(matches!(messages.last(), Some(AnalysisMessage::Finished(_))));
        assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
    }
    #[test]
    fn empty_source_fails_without_results() {
        let (tx, rx) = mpsc::channel();
        let request = AnalysisRequest::new(InMemorySource::new(Vec::new()), Method::Both);
        spawn_thread(request, tx, CancellationToken::new()).join().unwrap();
        let messages: Vec<AnalysisMessage> = rx.try_iter().collect();
        assert!(matches!(messages.last(), Some(AnalysisMessage::Failed(_))));
    }
    #[test]
    fn pre_cancelled_analysis_emits_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut seen = Vec::new();
        let err = run_analysis(
            AnalysisRequest::new(InMemorySource::new([recording()]), Method::Traditional),
            &mut |p: u8, _: &str| seen.push(p),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled { .. }));
        assert!(seen.is_empty());
    }
}
