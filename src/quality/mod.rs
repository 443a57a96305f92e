// src/quality/mod.rs
pub mod compare;
pub mod metrics;
pub mod report;
pub use compare::{Comparison, ComparisonError, ComparisonReducer, ScoreDelta};
pub use metrics::{
    ArtifactPercentage, BadChannelReport, BandPowers, BandRatios, CorrelationStats, KurtosisStats,
    PsdSlope, QualityGrade, QualityMetrics, QualityMetricsEngine, SlopeQuality, VarianceStats,
};
