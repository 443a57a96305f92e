//! Seams for the external engines the Traditional pipeline calls into.
//!
//! Neither artifact subspace reconstruction nor automatic component labelling
//! is implemented here. Callers plug in implementations; when none is given the
//! pipeline logs the gap and falls back to its own heuristics.
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::preprocessing::ComponentSet;
use crate::signal::SignalBuffer;
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Failed(String),
    #[error("unknown component label `{0}`")]
    UnknownLabel(String),
    #[error("classifier returned {labels} labels and {probabilities} probability rows for {components} components")]
    ShapeMismatch {
        labels: usize,
        probabilities: usize,
        components: usize,
    },
}
/// A fitted "clean data" model that can repair a recording.
pub trait SubspaceModel: Send {
    fn transform(&self, buffer: &SignalBuffer) -> Result<SignalBuffer, CapabilityError>;
}
/// Artifact subspace reconstruction: fit on a calibration window, then repair.
pub trait ArtifactSubspaceRemover: Send + Sync {
    fn fit(&self, calibration: &SignalBuffer) -> Result<Box<dyn SubspaceModel>, CapabilityError>;
}
/// Label vocabulary understood by the exclusion policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentLabel {
    Brain,
    EyeBlink,
    MuscleArtifact,
    HeartBeat,
    LineNoise,
    ChannelNoise,
    Other,
}
impl ComponentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentLabel::Brain => "brain",
            ComponentLabel::EyeBlink => "eye blink",
            ComponentLabel::MuscleArtifact => "muscle artifact",
            ComponentLabel::HeartBeat => "heart beat",
            ComponentLabel::LineNoise => "line noise",
            ComponentLabel::ChannelNoise => "channel noise",
            ComponentLabel::Other => "other",
        }
    }
    pub fn is_artifact(&self) -> bool {
        matches!(
            self,
            ComponentLabel::EyeBlink
                | ComponentLabel::MuscleArtifact
                | ComponentLabel::HeartBeat
                | ComponentLabel::LineNoise
                | ComponentLabel::ChannelNoise
        )
    }
}
impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for ComponentLabel {
    type Err = CapabilityError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brain" => Ok(ComponentLabel::Brain),
            "eye blink" => Ok(ComponentLabel::EyeBlink),
            "muscle artifact" => Ok(ComponentLabel::MuscleArtifact),
            "heart beat" => Ok(ComponentLabel::HeartBeat),
            "line noise" => Ok(ComponentLabel::LineNoise),
            "channel noise" => Ok(ComponentLabel::ChannelNoise),
            "other" => Ok(ComponentLabel::Other),
            other => Err(CapabilityError::UnknownLabel(other.to_owned())),
        }
    }
}
/// Classifier output: one label per component, and per component a row of class
/// probabilities whose first entry is the brain probability.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentLabels {
    pub labels: Vec<ComponentLabel>,
    pub probabilities: Vec<Vec<f64>>,
}
impl ComponentLabels {
    pub fn brain_probability(&self, component: usize) -> f64 {
        self.probabilities
            .get(component)
            .and_then(|row| row.first())
            .copied()
            .unwrap_or(0.0)
    }
    fn validate(&self, components: usize) -> Result<(), CapabilityError> {
        if self.labels.len() != components || self.probabilities.len() != components {
            return Err(CapabilityError::ShapeMismatch {
                labels: self.labels.len(),
                probabilities: self.probabilities.len(),
                components,
            });
        }
        Ok(())
    }
}
pub trait ComponentClassifier: Send + Sync {
    fn classify(
        &self,
        buffer: &SignalBuffer,
        components: &ComponentSet,
    ) -> Result<ComponentLabels, CapabilityError>;
}
/// Which classified components to drop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// Drop only components carrying an explicit artifact label.
    ArtifactLabels,
    /// Also drop "brain" components whose brain probability is at or below the bar.
    ArtifactLabelsAndUncertainBrain { min_brain_probability: f64 },
}
impl Default for ExclusionPolicy {
    fn default() -> Self {
        ExclusionPolicy::ArtifactLabelsAndUncertainBrain {
            min_brain_probability: 0.8,
        }
    }
}
impl ExclusionPolicy {
    /// Component indices to exclude, in ascending order.
    pub fn select(
        &self,
        labels: &ComponentLabels,
        components: usize,
    ) -> Result<Vec<usize>, CapabilityError> {
        labels.validate(components)?;
        Ok(labels
            .labels
            .iter()
            .enumerate()
            .filter(|(idx, label)| match (self, label) {
                (_, l) if l.is_artifact() => true,
                (
                    ExclusionPolicy::ArtifactLabelsAndUncertainBrain {
                        min_brain_probability,
                    },
                    ComponentLabel::Brain,
                ) => labels.brain_probability(*idx) <= *min_brain_probability,
                _ => false,
            })
            .map(|(idx, _)| idx)
            .collect())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sample_labels() -> ComponentLabels {
        ComponentLabels {
            labels: vec![
                ComponentLabel::Brain,
                ComponentLabel::EyeBlink,
                ComponentLabel::Brain,
                ComponentLabel::Other,
                ComponentLabel::LineNoise,
            ],
            probabilities: vec![
                vec![0.95, 0.05],
                vec![0.10, 0.90],
                vec![0.60, 0.40],
                vec![0.30, 0.70],
                vec![0.05, 0.95],
            ],
        }
    }
    #[test]
    fn artifact_only_policy_keeps_uncertain_brain() {
        let excluded = ExclusionPolicy::ArtifactLabels
            .select(&sample_labels(), 5)
            .unwrap();
        assert_eq!(excluded, vec![1, 4]);
    }
    #[test]
    fn default_policy_drops_low_confidence_brain() {
        let excluded = ExclusionPolicy::default().select(&sample_labels(), 5).unwrap();
        assert_eq!(excluded, vec![1, 2, 4]);
    }
    #[test]
    fn label_vocabulary_round_trips() {
        for label in [
            "brain",
            "eye blink",
            "muscle artifact",
            "heart beat",
            "line noise",
            "channel noise",
        ] {
            assert_eq!(label.parse::<ComponentLabel>().unwrap().as_str(), label);
        }
        assert!("alien".parse::<ComponentLabel>().is_err());
    }
    #[test]
    fn mismatched_classifier_output_is_an_error() {
        assert!(ExclusionPolicy::default().select(&sample_labels(), 4).is_err());
    }
}
