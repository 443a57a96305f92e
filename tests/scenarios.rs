mod common;
use neuroclean::preprocessing::{BadChannelReason, PipelineStage, StepOutcome};
use neuroclean::quality::{ComparisonReducer, QualityGrade, SlopeQuality};
use neuroclean::{PreprocessingPipeline, QualityMetrics, QualityMetricsEngine, Strategy};
#[test]
fn clean_alpha_recording_scores_well() {
    let buffer = common::alpha_recording(10, 60.0);
    let metrics = QualityMetricsEngine::default().compute(&buffer);
    assert!(metrics.snr > 20.0, "snr {}", metrics.snr);
    assert!(
        matches!(
            metrics.psd_slope.quality,
            SlopeQuality::Excellent | SlopeQuality::Good
        ),
        "slope {} ({})",
        metrics.psd_slope.mean_slope,
        metrics.psd_slope.quality
    );
    assert!(metrics.artifact_percentage.estimated_total < 5.0);
    assert_eq!(metrics.bad_channels.count, 0);
    assert!(metrics.data_quality_score > 80.0, "score {}", metrics.data_quality_score);
    assert!(metrics.quality_grade >= QualityGrade::Good);
    assert!(metrics.frequency_bands.ratios.alpha > 90.0);
}
#[test]
fn flat_channel_is_flagged_and_both_pipelines_finish() {
    let buffer = common::with_flat_channel(&common::alpha_recording(10, 60.0), 3);
    let metrics = QualityMetricsEngine::default().compute(&buffer);
    assert_eq!(metrics.bad_channels.count, 1);
    assert_eq!(metrics.bad_channels.bad_channels, vec!["EEG03".to_string()]);
    assert_eq!(metrics.bad_channels.reasons["EEG03"], BadChannelReason::Flat);
    assert_eq!(metrics.bad_channels.reasons["EEG03"].to_string(), "Low variance (flat)");
    for strategy in Strategy::ALL {
        let result = PreprocessingPipeline::new(strategy, common::quick_config()).run(&buffer);
        let last = result.log.steps.last().unwrap();
        assert_eq!(last.stage, PipelineStage::Done);
        assert_eq!(result.cleaned.n_channels(), 10);
        assert_eq!(result.cleaned.n_samples(), buffer.n_samples());
        assert!(result.cleaned.data().iter().all(|v| v.is_finite()));
    }
}
#[test]
fn comparison_reports_gedai_improvement() {
    let scored = |score: f64| QualityMetrics {
        data_quality_score: score,
        quality_grade: QualityGrade::from_score(score),
        ..Default::default()
    };
    let traditional = scored(62.0);
    let gedai = scored(78.5);
    let comparison = ComparisonReducer::compare([
        (Strategy::Traditional.key(), &traditional),
        (Strategy::Gedai.key(), &gedai),
    ])
    .unwrap();
    assert_eq!(comparison.winner, "gedai");
    let delta = comparison.delta.unwrap();
    assert!((delta.points - 16.5).abs() < 1e-9);
    assert!((delta.percent - 26.61).abs() < 0.01);
    assert!(comparison.render().contains("BEST METHOD: GEDAI"));
}
#[test]
fn pipelines_are_reproducible() {
    let buffer = common::mixed_recording(8, 10.0, 3);
    for strategy in Strategy::ALL {
        let pipeline = PreprocessingPipeline::new(strategy, common::quick_config());
        let first = pipeline.run(&buffer);
        let second = pipeline.run(&buffer);
        assert_eq!(first.cleaned, second.cleaned);
        assert_eq!(first.log, second.log);
        assert_eq!(first.ica, second.ica);
    }
}
#[test]
fn input_buffer_is_left_untouched() {
    let buffer = common::mixed_recording(6, 8.0, 11);
    let snapshot = buffer.clone();
    for strategy in Strategy::ALL {
        let result = PreprocessingPipeline::new(strategy, common::quick_config()).run(&buffer);
        assert_ne!(result.cleaned.data(), buffer.data());
    }
    assert_eq!(buffer, snapshot);
}
#[test]
fn gedai_removes_some_power_from_mixture() {
    let buffer = common::mixed_recording(8, 10.0, 5);
    let result = PreprocessingPipeline::new(Strategy::Gedai, common::quick_config()).run(&buffer);
    assert!(result.log.degraded_steps().next().is_none());
    let report = result.gedai.unwrap();
    assert!(report.auto_selected);
    assert!((4..=7).contains(&report.n_components));
    assert!(report.removed_percent() > 0.0 && report.removed_percent() < 100.0);
    let text = result.log.to_string();
    assert!(text.contains(&format!("Auto-selected {} components (out of 8)", report.n_components)));
}
#[test]
fn user_component_count_is_capped_at_channel_count() {
    let buffer = common::mixed_recording(6, 6.0, 9);
    let mut config = common::quick_config();
    config.gedai.n_components = Some(40);
    let result = PreprocessingPipeline::new(Strategy::Gedai, config).run(&buffer);
    let report = result.gedai.unwrap();
    assert!(!report.auto_selected);
    assert_eq!(report.n_components, 6);
    assert!(report.removed_power.abs() < 1e-12 * report.total_power.max(1.0));
    assert!(result.log.steps[4].outcome == StepOutcome::Completed);
}
