// src/preprocessing/mod.rs
pub mod bad_channels;
pub mod capabilities;
pub mod components;
pub mod gedai;
pub mod ica;
pub mod log;
pub mod pipeline;
pub use bad_channels::{BadChannelDetector, BadChannelFindings, BadChannelReason};
pub use capabilities::{
    ArtifactSubspaceRemover, CapabilityError, ComponentClassifier, ComponentLabel, ComponentLabels,
    ExclusionPolicy, SubspaceModel,
};
pub use components::ComponentSet;
pub use gedai::{CovariancePair, DecompositionPath, GedaiReport};
pub use self::log::{PipelineStage, ProcessingLog, StepLog, StepOutcome};
pub use pipeline::{
    CancellationToken, Cancelled, IcaReport, PreprocessingPipeline, ProcessingResult, Strategy,
};
