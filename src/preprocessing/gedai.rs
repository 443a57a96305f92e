//! Generalized eigenvalue decomposition artifact removal (GEDAI).
//!
//! Two channel covariances are contrasted: a "signal" covariance of the
//! band-limited recording and a "reference" covariance built from its
//! high-frequency content plus the temporal derivative. Solving
//! `S v = λ R v` orders directions by how much more signal than artifact they
//! carry; the trailing directions are zeroed and the rest projected back.
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use crate::config::GedaiConfig;
use crate::preprocessing::ComponentSet;
use crate::signal::{filter, stats, SignalBuffer, SignalError};
/// Regularized signal (`S`) and reference (`R`) covariances of one recording.
#[derive(Clone, Debug)]
pub struct CovariancePair {
    pub signal: DMatrix<f64>,
    pub reference: DMatrix<f64>,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DecompositionPath {
    Generalized,
    /// `S` alone was decomposed because the generalized problem failed.
    SignalOnlyFallback,
}
#[derive(Clone, Debug)]
pub struct Decomposition {
    /// Eigenvalues in descending order.
    pub eigenvalues: Vec<f64>,
    /// Columns are the eigenvectors, in eigenvalue order.
    pub eigenvectors: DMatrix<f64>,
    /// Exact inverse of `eigenvectors^T`.
    pub mixing: DMatrix<f64>,
    pub path: DecompositionPath,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GedaiReport {
    pub n_channels: usize,
    pub n_components: usize,
    pub auto_selected: bool,
    pub eigenvalues: Vec<f64>,
    pub path: DecompositionPath,
    pub removed_power: f64,
    pub kept_power: f64,
    pub total_power: f64,
}
impl GedaiReport {
    pub fn removed_percent(&self) -> f64 {
        if self.total_power > 0.0 {
            self.removed_power / self.total_power * 100.0
        } else {
            0.0
        }
    }
}
impl CovariancePair {
    pub fn from_buffer(buffer: &SignalBuffer, config: &GedaiConfig) -> Result<Self, SignalError> {
        let n = buffer.n_channels();
        if n < 2 {
            return Err(SignalError::TooFewChannels { needed: 2, actual: n });
        }
        let (low, high) = config.signal_band_hz;
        let mut signal = filter::bandpass(buffer, low, high, 4)?.data().to_owned();
        stats::zscore_rows(&mut signal);
        let mut reference = filter::highpass_buffer(buffer, config.noise_highpass_hz, 4)?
            .data()
            .to_owned();
        let raw = buffer.data();
        let samples = buffer.n_samples();
        for (mut row, raw_row) in reference.axis_iter_mut(Axis(0)).zip(raw.axis_iter(Axis(0))) {
            for t in 0..samples.saturating_sub(1) {
                row[t] += config.derivative_weight * (raw_row[t + 1] - raw_row[t]);
            }
        }
        stats::zscore_rows(&mut reference);
        let mut signal = stats::covariance_matrix(signal.view());
        let mut reference = stats::covariance_matrix(reference.view());
        let reg = config.regularization * signal.trace() / n as f64;
        for i in 0..n {
            signal[(i, i)] += reg;
            reference[(i, i)] += reg;
        }
        Ok(Self { signal, reference })
    }
    /// Solve `S v = λ R v` through the Cholesky reduction of `R`, falling back
    /// to the ordinary eigendecomposition of `S` when that fails.
    pub fn decompose(&self) -> Decomposition {
        match self.generalized() {
            Some(decomposition) => decomposition,
            None => {
                log::warn!("GEDAI: generalized eigenproblem failed, decomposing signal covariance only");
                let eig = SymmetricEigen::new(self.signal.clone());
                let (eigenvalues, eigenvectors) = sorted_descending(&eig.eigenvalues, &eig.eigenvectors);
                Decomposition {
                    eigenvalues,
                    mixing: eigenvectors.clone(),
                    eigenvectors,
                    path: DecompositionPath::SignalOnlyFallback,
                }
            }
        }
    }
    fn generalized(&self) -> Option<Decomposition> {
        let l = Cholesky::new(self.reference.clone())?.l();
        let l_inv = l.try_inverse()?;
        let reduced = &l_inv * &self.signal * l_inv.transpose();
        let reduced = (&reduced + reduced.transpose()) * 0.5;
        let eig = SymmetricEigen::new(reduced);
        if eig.eigenvalues.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let vectors = l_inv.transpose() * &eig.eigenvectors;
        let (eigenvalues, eigenvectors) = sorted_descending(&eig.eigenvalues, &vectors);
        let mixing = &self.reference * &eigenvectors;
        Some(Decomposition {
            eigenvalues,
            eigenvectors,
            mixing,
            path: DecompositionPath::Generalized,
        })
    }
}
fn sorted_descending(values: &nalgebra::DVector<f64>, vectors: &DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    let sorted = order.iter().map(|&i| values[i]).collect();
    let columns: Vec<_> = order.iter().map(|&i| vectors.column(i).into_owned()).collect();
    (sorted, DMatrix::from_columns(&columns))
}
/// Number of leading components kept.
///
/// The larger of the cumulative-variance count and the Kaiser count, capped at
/// `floor(max_fraction * n)` and then raised to at least `ceil(min_fraction * n)`.
pub fn select_component_count(eigenvalues: &[f64], config: &GedaiConfig) -> usize {
    let n = eigenvalues.len();
    if n == 0 {
        return 0;
    }
    let total: f64 = eigenvalues.iter().sum();
    let mut cumulative = 0.0;
    let by_variance = eigenvalues
        .iter()
        .position(|v| {
            cumulative += v;
            cumulative / total > config.variance_threshold
        })
        .map_or(n, |idx| idx + 1);
    let mean = total / n as f64;
    let kaiser = eigenvalues.iter().filter(|&&v| v > mean).count();
    let upper = (config.max_fraction * n as f64 + 1e-9).floor() as usize;
    let lower = (config.min_fraction * n as f64 - 1e-9).ceil() as usize;
    log::debug!("GEDAI: variance-based {by_variance}, Kaiser {kaiser}");
    by_variance.max(kaiser).min(upper).max(lower).clamp(1, n)
}
/// Run GEDAI on `buffer`, returning the cleaned buffer and power diagnostics.
pub fn apply(buffer: &SignalBuffer, config: &GedaiConfig) -> Result<(SignalBuffer, GedaiReport), SignalError> {
    let pair = CovariancePair::from_buffer(buffer, config)?;
    let decomposition = pair.decompose();
    let n = buffer.n_channels();
    let (n_components, auto_selected) = match config.n_components {
        Some(fixed) => (fixed.min(n), false),
        None => (select_component_count(&decomposition.eigenvalues, config), true),
    };
    let unmixing = Array2::from_shape_fn((n, n), |(i, j)| decomposition.eigenvectors[(j, i)]);
    let mixing = Array2::from_shape_fn((n, n), |(i, j)| decomposition.mixing[(i, j)]);
    let mut components = ComponentSet::new(
        unmixing,
        mixing,
        Array1::zeros(n),
        decomposition.eigenvalues.clone(),
    )?;
    for idx in n_components..n {
        components.exclude(idx);
    }
    let sources = components.sources(buffer.data());
    let power: Vec<f64> = sources
        .axis_iter(Axis(0))
        .map(|row| row.iter().map(|v| v * v).sum())
        .collect();
    let kept_power: f64 = power[..n_components].iter().sum();
    let removed_power: f64 = power[n_components..].iter().sum();
    let total_power: f64 = power.iter().sum();
    let cleaned = buffer.with_data(components.remove_excluded(buffer.data()))?;
    Ok((
        cleaned,
        GedaiReport {
            n_channels: n,
            n_components,
            auto_selected,
            eigenvalues: decomposition.eigenvalues,
            path: decomposition.path,
            removed_power,
            kept_power,
            total_power,
        },
    ))
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;
    fn recording(n_channels: usize, seconds: f64) -> SignalBuffer {
        let fs = 250.0;
        let n = (fs * seconds) as usize;
        let mut rng = StdRng::seed_from_u64(11);
        let rows = (0..n_channels)
            .map(|ch| {
                let gain = 1.0 + ch as f64 * 0.1;
                (0..n)
                    .map(|t| {
                        let x = t as f64 / fs;
                        gain * 20e-6 * (2.0 * PI * 10.0 * x).sin()
                            + 5e-6 * (2.0 * PI * (3.0 + ch as f64) * x).sin()
                            + 2e-6 * rng.gen_range(-1.0..1.0)
                    })
                    .collect()
            })
            .collect();
        let names = (0..n_channels).map(|i| format!("EEG{i}")).collect();
        SignalBuffer::from_rows(names, fs, rows).unwrap()
    }
    #[test]
    fn component_count_stays_within_bounds() {
        let config = GedaiConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for n in 2..=64 {
            for shape in 0..4 {
                let eigenvalues: Vec<f64> = (0..n)
                    .map(|i| match shape {
                        0 => 1.0,
                        1 => 1000.0 * 0.5f64.powi(i as i32),
                        2 => rng.gen_range(0.01..10.0),
                        _ => if i == 0 { 1e6 } else { 1e-3 },
                    })
                    .collect();
                let mut sorted = eigenvalues.clone();
                sorted.sort_by(|a, b| b.total_cmp(a));
                let k = select_component_count(&sorted, &config);
                assert!(2 * k >= n, "n={n} k={k}");
                assert!(5 * k <= 4 * n, "n={n} k={k}");
            }
        }
    }
    #[test]
    fn generalized_vectors_are_reference_orthonormal() {
        let buffer = recording(6, 8.0);
        let pair = CovariancePair::from_buffer(&buffer, &GedaiConfig::default()).unwrap();
        let decomposition = pair.decompose();
        assert_eq!(decomposition.path, DecompositionPath::Generalized);
        let v = &decomposition.eigenvectors;
        let gram = v.transpose() * &pair.reference * v;
        let identity = v.transpose() * &decomposition.mixing;
        for i in 0..6 {
            for j in 0..6 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[(i, j)] - expected).abs() < 1e-8);
                assert!((identity[(i, j)] - expected).abs() < 1e-8);
            }
        }
        assert!(decomposition.eigenvalues.windows(2).all(|w| w[0] >= w[1]));
    }
    #[test]
    fn power_accounting_balances() {
        let buffer = recording(8, 8.0);
        let (cleaned, report) = apply(&buffer, &GedaiConfig::default()).unwrap();
        assert_eq!(cleaned.n_channels(), 8);
        assert!((4..=6).contains(&report.n_components));
        let sum = report.removed_power + report.kept_power;
        assert!((sum - report.total_power).abs() <= 1e-9 * report.total_power);
        assert!(report.removed_percent() >= 0.0 && report.removed_percent() <= 100.0);
        // The input buffer is left untouched.
        assert_eq!(buffer, recording(8, 8.0));
    }
    #[test]
    fn keeping_every_component_reproduces_the_input() {
        let buffer = recording(5, 4.0);
        let config = GedaiConfig {
            n_components: Some(99),
            ..Default::default()
        };
        let (cleaned, report) = apply(&buffer, &config).unwrap();
        assert_eq!(report.n_components, 5);
        assert!(!report.auto_selected);
        assert_eq!(report.removed_power, 0.0);
        for (a, b) in cleaned.data().iter().zip(buffer.data().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    #[test]
    fn single_channel_is_rejected() {
        let buffer = recording(1, 2.0);
        assert!(apply(&buffer, &GedaiConfig::default()).is_err());
    }
}
