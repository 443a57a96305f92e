//! Quality battery for one recording.
//!
//! Every sub-metric is computed independently. One that fails is logged and
//! replaced by its default instead of aborting the battery.
use std::collections::BTreeMap;
use std::fmt;
use ndarray::{ArrayView1, Axis};
use serde::{Serialize, Serializer};
use crate::preprocessing::{BadChannelDetector, BadChannelReason};
use crate::signal::{filter, stats, SignalBuffer, SignalError, SpectrumBuilder};
/// SNR reported when the noise band carries no power at all.
pub const SNR_CEILING_DB: f64 = 100.0;
const HIGH_KURTOSIS: f64 = 5.0;
const AMPLITUDE_FLOOR_V: f64 = 100e-6;
const SLOPE_FFT_SIZE: usize = 2048;
const BAND_FFT_SIZE: usize = 256;
pub const BANDS: [(&str, f64, f64); 5] = [
    ("delta", 1.0, 4.0),
    ("theta", 4.0, 8.0),
    ("alpha", 8.0, 13.0),
    ("beta", 13.0, 30.0),
    ("gamma", 30.0, 80.0),
];
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlopeQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Garbage,
    /// The slope could not be computed.
    Unknown,
}
impl SlopeQuality {
    pub fn from_slope(slope: f64) -> Self {
        if !slope.is_finite() {
            SlopeQuality::Unknown
        } else if slope >= 0.0 {
            SlopeQuality::Garbage
        } else if slope >= -0.1 {
            SlopeQuality::Poor
        } else if slope >= -0.2 {
            SlopeQuality::Fair
        } else if slope >= -0.3 {
            SlopeQuality::Good
        } else {
            SlopeQuality::Excellent
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            SlopeQuality::Excellent => "Excellent",
            SlopeQuality::Good => "Good",
            SlopeQuality::Fair => "Fair",
            SlopeQuality::Poor => "Poor",
            SlopeQuality::Garbage => "Garbage",
            SlopeQuality::Unknown => "Unknown",
        }
    }
}
impl fmt::Display for SlopeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl Serialize for SlopeQuality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}
impl QualityGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityGrade::Excellent
        } else if score >= 80.0 {
            QualityGrade::VeryGood
        } else if score >= 70.0 {
            QualityGrade::Good
        } else if score >= 60.0 {
            QualityGrade::Fair
        } else if score >= 50.0 {
            QualityGrade::Poor
        } else {
            QualityGrade::VeryPoor
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "Excellent (A+)",
            QualityGrade::VeryGood => "Very Good (A)",
            QualityGrade::Good => "Good (B)",
            QualityGrade::Fair => "Fair (C)",
            QualityGrade::Poor => "Poor (D)",
            QualityGrade::VeryPoor => "Very Poor (F)",
        }
    }
}
impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
impl Serialize for QualityGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VarianceStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PsdSlope {
    pub mean_slope: f64,
    pub std_slope: f64,
    pub quality: SlopeQuality,
    pub slopes_per_channel: Vec<f64>,
}
impl Default for PsdSlope {
    fn default() -> Self {
        Self {
            mean_slope: 0.0,
            std_slope: 0.0,
            quality: SlopeQuality::Unknown,
            slopes_per_channel: Vec::new(),
        }
    }
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct KurtosisStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub channels_with_high_kurtosis: usize,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BadChannelReport {
    pub bad_channels: Vec<String>,
    pub count: usize,
    pub percentage: f64,
    pub reasons: BTreeMap<String, BadChannelReason>,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ArtifactPercentage {
    pub amplitude_based: f64,
    pub gradient_based: f64,
    pub estimated_total: f64,
}
/// Percent of the summed band power per band.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BandRatios {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}
impl BandRatios {
    pub fn total(&self) -> f64 {
        self.delta + self.theta + self.alpha + self.beta + self.gamma
    }
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub ratios: BandRatios,
    pub alpha_delta_ratio: f64,
}
impl BandPowers {
    fn from_powers(powers: [f64; 5]) -> Self {
        let [delta, theta, alpha, beta, gamma] = powers;
        let total: f64 = powers.iter().sum();
        let pct = |p: f64| if total > 0.0 { p / total * 100.0 } else { 0.0 };
        Self {
            delta,
            theta,
            alpha,
            beta,
            gamma,
            ratios: BandRatios {
                delta: pct(delta),
                theta: pct(theta),
                alpha: pct(alpha),
                beta: pct(beta),
                gamma: pct(gamma),
            },
            alpha_delta_ratio: if delta > 0.0 { alpha / delta } else { 0.0 },
        }
    }
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CorrelationStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}
/// Immutable result of one quality evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// dB
    pub snr: f64,
    pub variance: VarianceStats,
    pub psd_slope: PsdSlope,
    pub kurtosis: KurtosisStats,
    pub bad_channels: BadChannelReport,
    pub artifact_percentage: ArtifactPercentage,
    pub frequency_bands: BandPowers,
    pub channel_correlation: CorrelationStats,
    pub data_quality_score: f64,
    pub quality_grade: QualityGrade,
}
impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            snr: 0.0,
            variance: VarianceStats::default(),
            psd_slope: PsdSlope::default(),
            kurtosis: KurtosisStats::default(),
            bad_channels: BadChannelReport::default(),
            artifact_percentage: ArtifactPercentage::default(),
            frequency_bands: BandPowers::default(),
            channel_correlation: CorrelationStats::default(),
            data_quality_score: 0.0,
            quality_grade: QualityGrade::VeryPoor,
        }
    }
}
/// Pure function from a buffer to its [`QualityMetrics`].
#[derive(Clone, Copy, Debug, Default)]
pub struct QualityMetricsEngine {
    pub detector: BadChannelDetector,
}
impl QualityMetricsEngine {
    pub fn compute(&self, buffer: &SignalBuffer) -> QualityMetrics {
        let snr = snr_db(buffer).unwrap_or_else(|err| {
            log::warn!("SNR unavailable ({err}); using 0.0 dB");
            0.0
        });
        let psd_slope = psd_slope(buffer).unwrap_or_else(|err| {
            log::warn!("PSD slope unavailable ({err})");
            PsdSlope::default()
        });
        let frequency_bands = band_powers(buffer).unwrap_or_else(|err| {
            log::warn!("band powers unavailable ({err})");
            BandPowers::default()
        });
        let mut metrics = QualityMetrics {
            snr,
            variance: variance_stats(buffer),
            psd_slope,
            kurtosis: kurtosis_stats(buffer),
            bad_channels: self.bad_channels(buffer),
            artifact_percentage: artifact_percentage(buffer),
            frequency_bands,
            channel_correlation: channel_correlation(buffer),
            data_quality_score: 0.0,
            quality_grade: QualityGrade::VeryPoor,
        };
        metrics.data_quality_score = overall_score(&metrics);
        metrics.quality_grade = QualityGrade::from_score(metrics.data_quality_score);
        log::debug!(
            "quality score {:.1} ({})",
            metrics.data_quality_score,
            metrics.quality_grade
        );
        metrics
    }
    fn bad_channels(&self, buffer: &SignalBuffer) -> BadChannelReport {
        let findings = self.detector.detect(buffer);
        BadChannelReport {
            count: findings.channels.len(),
            percentage: findings.fraction() * 100.0,
            bad_channels: findings.channels,
            reasons: findings.reasons,
        }
    }
}
fn flat_variance(buffer: &SignalBuffer) -> f64 {
    let flat: Vec<f64> = buffer.data().iter().copied().collect();
    stats::variance(ArrayView1::from(&flat))
}
fn snr_db(buffer: &SignalBuffer) -> Result<f64, SignalError> {
    let signal = flat_variance(&filter::bandpass(buffer, 8.0, 13.0, 4)?);
    let noise = flat_variance(&filter::highpass_buffer(buffer, 50.0, 4)?);
    if noise == 0.0 {
        return Ok(SNR_CEILING_DB);
    }
    if signal == 0.0 {
        return Ok(-SNR_CEILING_DB);
    }
    Ok(10.0 * (signal / noise).log10())
}
fn psd_slope(buffer: &SignalBuffer) -> Result<PsdSlope, SignalError> {
    let spectrum = SpectrumBuilder::with_size(SLOPE_FFT_SIZE).welch(buffer, 1.0, 80.0)?;
    let slopes = spectrum
        .psd
        .iter()
        .map(|channel| {
            let db: Vec<f64> = channel
                .iter()
                .map(|p| 10.0 * p.max(f64::MIN_POSITIVE).log10())
                .collect();
            stats::linear_slope(&spectrum.frequencies_hz, &db).ok_or_else(|| {
                SignalError::Numerical("PSD slope needs at least two frequency bins".into())
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    let mean_slope = slopes.iter().sum::<f64>() / slopes.len().max(1) as f64;
    Ok(PsdSlope {
        mean_slope,
        std_slope: stats::slice_std(&slopes),
        quality: SlopeQuality::from_slope(mean_slope),
        slopes_per_channel: slopes,
    })
}
fn variance_stats(buffer: &SignalBuffer) -> VarianceStats {
    let variances = stats::channel_variances(buffer.data());
    summarize(&variances)
}
fn summarize(values: &[f64]) -> VarianceStats {
    if values.is_empty() {
        return VarianceStats::default();
    }
    VarianceStats {
        mean: values.iter().sum::<f64>() / values.len() as f64,
        std: stats::slice_std(values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}
fn kurtosis_stats(buffer: &SignalBuffer) -> KurtosisStats {
    let values: Vec<f64> = buffer
        .data()
        .axis_iter(Axis(0))
        .map(stats::excess_kurtosis)
        .collect();
    let summary = summarize(&values);
    KurtosisStats {
        mean: summary.mean,
        std: summary.std,
        max: summary.max,
        channels_with_high_kurtosis: values.iter().filter(|&&k| k > HIGH_KURTOSIS).count(),
    }
}
fn artifact_percentage(buffer: &SignalBuffer) -> ArtifactPercentage {
    let data = buffer.data();
    let total = data.len();
    if total == 0 {
        return ArtifactPercentage::default();
    }
    let threshold = AMPLITUDE_FLOOR_V.max(5.0 * flat_variance(buffer).sqrt());
    let over_amplitude = data.iter().filter(|v| v.abs() > threshold).count();
    let gradients: Vec<f64> = data
        .axis_iter(Axis(0))
        .flat_map(|row| {
            row.iter()
                .zip(row.iter().skip(1))
                .map(|(a, b)| (b - a).abs())
                .collect::<Vec<_>>()
        })
        .collect();
    let gradient_threshold = 5.0 * stats::median(&gradients);
    let over_gradient = gradients.iter().filter(|&&g| g > gradient_threshold).count();
    let amplitude_based = over_amplitude as f64 / total as f64 * 100.0;
    let gradient_based = if gradients.is_empty() {
        0.0
    } else {
        over_gradient as f64 / gradients.len() as f64 * 100.0
    };
    ArtifactPercentage {
        amplitude_based,
        gradient_based,
        estimated_total: amplitude_based.max(gradient_based),
    }
}
fn band_powers(buffer: &SignalBuffer) -> Result<BandPowers, SignalError> {
    let spectrum = SpectrumBuilder::with_size(BAND_FFT_SIZE).welch(buffer, 0.5, 80.0)?;
    let mut powers = [0.0; 5];
    for (slot, (_, low, high)) in powers.iter_mut().zip(BANDS) {
        let bins = spectrum.bins_between(low, high);
        let count = bins.len() * spectrum.psd.len();
        if count == 0 {
            continue;
        }
        let sum: f64 = spectrum
            .psd
            .iter()
            .map(|channel| bins.iter().map(|&b| channel[b]).sum::<f64>())
            .sum();
        *slot = sum / count as f64;
    }
    Ok(BandPowers::from_powers(powers))
}
fn channel_correlation(buffer: &SignalBuffer) -> CorrelationStats {
    let n = buffer.n_channels();
    let mut values = Vec::with_capacity(n * n.saturating_sub(1));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                values.push(stats::pearson(buffer.channel(i), buffer.channel(j)));
            }
        }
    }
    if values.is_empty() {
        return CorrelationStats::default();
    }
    let summary = summarize(&values);
    CorrelationStats {
        mean: summary.mean,
        std: summary.std,
        min: summary.min,
        max: summary.max,
        median: stats::median(&values),
    }
}
fn clip01(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
/// Weighted 0-100 score: SNR 25, PSD slope 20, artifacts 20, bad channels 15,
/// kurtosis 10, channel correlation 10.
pub fn overall_score(metrics: &QualityMetrics) -> f64 {
    let slope = metrics.psd_slope.mean_slope;
    let slope_score = if !slope.is_finite() {
        0.0
    } else if slope < -0.3 {
        1.0
    } else if slope < -0.2 {
        0.8
    } else if slope < -0.1 {
        0.6
    } else if slope < 0.0 {
        0.4
    } else {
        0.2
    };
    let score = clip01(metrics.snr / 20.0) * 25.0
        + slope_score * 20.0
        + clip01(1.0 - metrics.artifact_percentage.estimated_total / 50.0) * 20.0
        + clip01(1.0 - metrics.bad_channels.percentage / 30.0) * 15.0
        + clip01(1.0 - metrics.kurtosis.mean.abs() / 10.0) * 10.0
        + clip01(metrics.channel_correlation.mean / 0.5) * 10.0;
    score.clamp(0.0, 100.0)
}
