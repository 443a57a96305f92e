use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::preprocessing::ExclusionPolicy;
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
/// Every tunable of both preprocessing strategies. Missing sections and
/// fields fall back to their defaults when loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filters: FilterConfig,
    pub bad_channels: BadChannelConfig,
    pub asr: AsrConfig,
    pub ica: IcaConfig,
    pub gedai: GedaiConfig,
}
impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    /// Power-line frequency removed by the notch stage.
    pub line_freq_hz: f64,
    pub notch_q: f64,
    pub filter_order: usize,
}
impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: 1.0,
            bandpass_high_hz: 80.0,
            line_freq_hz: 60.0,
            notch_q: 30.0,
            filter_order: 4,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadChannelConfig {
    pub flat_ratio: f64,
    pub noisy_ratio: f64,
    /// Interpolate only while the bad fraction stays below this.
    pub max_interpolate_fraction: f64,
}
impl Default for BadChannelConfig {
    fn default() -> Self {
        Self {
            flat_ratio: 0.1,
            noisy_ratio: 10.0,
            max_interpolate_fraction: 0.3,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    pub calibration_seconds: f64,
}
impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            calibration_seconds: 30.0,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcaConfig {
    pub max_components: usize,
    pub max_iter: usize,
    pub seed: u64,
    /// High-pass applied to the copy the decomposition is fitted on.
    pub highpass_hz: f64,
    pub exclusion_policy: ExclusionPolicy,
    pub heuristic_variance_ratio: f64,
    pub heuristic_max_excluded: usize,
}
impl Default for IcaConfig {
    fn default() -> Self {
        Self {
            max_components: 15,
            max_iter: 500,
            seed: 42,
            highpass_hz: 1.0,
            exclusion_policy: ExclusionPolicy::default(),
            heuristic_variance_ratio: 3.0,
            heuristic_max_excluded: 5,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GedaiConfig {
    /// Fixed number of kept components; selected from the eigenvalues when absent.
    pub n_components: Option<usize>,
    pub regularization: f64,
    pub signal_band_hz: (f64, f64),
    pub noise_highpass_hz: f64,
    pub derivative_weight: f64,
    pub variance_threshold: f64,
    pub min_fraction: f64,
    pub max_fraction: f64,
}
impl Default for GedaiConfig {
    fn default() -> Self {
        Self {
            n_components: None,
            regularization: 0.01,
            signal_band_hz: (1.0, 40.0),
            noise_highpass_hz: 40.0,
            derivative_weight: 0.5,
            variance_threshold: 0.95,
            min_fraction: 0.5,
            max_fraction: 0.8,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"filters": {{"line_freq_hz": 50.0}}, "gedai": {{"n_components": 6}},
               "ica": {{"exclusion_policy": {{"kind": "artifact_labels"}}}}}}"#
        )
        .unwrap();
        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.filters.line_freq_hz, 50.0);
        assert_eq!(config.filters.bandpass_high_hz, 80.0);
        assert_eq!(config.gedai.n_components, Some(6));
        assert_eq!(config.ica.exclusion_policy, ExclusionPolicy::ArtifactLabels);
        assert_eq!(config.ica.seed, 42);
        assert_eq!(config.bad_channels, BadChannelConfig::default());
    }
    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_json_file("/nonexistent/neuroclean.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/neuroclean.json"));
    }
}
