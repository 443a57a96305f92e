// src/lib.rs
pub mod config;
pub mod engine;
pub mod preprocessing;
pub mod quality;
pub mod recorder;
pub mod signal;
pub mod types;
pub use config::PipelineConfig;
pub use engine::{run_analysis, spawn_thread, AnalysisError, AnalysisOutput, AnalysisRequest};
pub use preprocessing::{CancellationToken, PreprocessingPipeline, ProcessingResult, Strategy};
pub use quality::{ComparisonReducer, QualityMetrics, QualityMetricsEngine};
pub use signal::SignalBuffer;
pub use types::{AnalysisMessage, Method};
