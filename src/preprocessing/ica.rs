//! Extended Infomax ICA.
//!
//! The data is PCA-whitened down to the requested number of components, then
//! the natural-gradient Infomax rule with sub/super-Gaussian sign switching is
//! run over randomly permuted sample blocks. The permutation comes from a
//! seeded generator, so a fit is reproducible bit for bit.
use std::f64::consts::PI;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use crate::preprocessing::ComponentSet;
use crate::signal::{stats, SignalError};
const W_CHANGE: f64 = 1e-12;
const ANNEAL_DEG: f64 = 60.0;
const ANNEAL_STEP: f64 = 0.9;
const BLOWUP: f64 = 1e4;
const BLOWUP_FAC: f64 = 0.5;
const N_SMALL_ANGLE: usize = 20;
const MAX_WEIGHT: f64 = 1e8;
const RESTART_FAC: f64 = 0.9;
const MIN_L_RATE: f64 = 1e-10;
const EXT_MOMENTUM: f64 = 0.5;
const SIGNS_BIAS: f64 = 0.02;
const SIGNCOUNT_THRESHOLD: usize = 25;
const SIGNCOUNT_STEP: usize = 2;
const KURT_SIZE: usize = 6000;
/// Relative eigenvalue floor below which a PCA direction is treated as empty.
const RANK_TOLERANCE: f64 = 1e-10;
#[derive(Clone, Debug)]
pub struct IcaFit {
    pub components: ComponentSet,
    /// Training epochs actually run.
    pub iterations: usize,
}
/// Fit `n_components` independent components to `data` (channels x samples).
pub fn fit_infomax(
    data: ArrayView2<'_, f64>,
    n_components: usize,
    max_iter: usize,
    seed: u64,
) -> Result<IcaFit, SignalError> {
    let (n_channels, n_samples) = data.dim();
    if n_components == 0 || n_components > n_channels {
        return Err(SignalError::TooFewChannels {
            needed: n_components.max(1),
            actual: n_channels,
        });
    }
    if n_samples < 3 * n_components.max(2) {
        return Err(SignalError::TooFewSamples {
            needed: 3 * n_components.max(2),
            actual: n_samples,
        });
    }
    let mean: Array1<f64> = data.axis_iter(Axis(0)).map(stats::mean).collect();
    let mut centered = data.to_owned();
    for mut column in centered.axis_iter_mut(Axis(1)) {
        column -= &mean;
    }
    // PCA whitening.
    let eig = SymmetricEigen::new(stats::covariance_matrix(data));
    let mut order: Vec<usize> = (0..n_channels).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
    let top = eig.eigenvalues[order[0]];
    let rank = order
        .iter()
        .filter(|&&i| eig.eigenvalues[i] > top * RANK_TOLERANCE && eig.eigenvalues[i] > 0.0)
        .count();
    let k = n_components.min(rank);
    if k == 0 {
        return Err(SignalError::Numerical(
            "covariance has no usable variance".into(),
        ));
    }
    if k < n_components {
        log::warn!("ICA: data rank {rank} limits decomposition to {k} of {n_components} components");
    }
    let mut whitening = Array2::zeros((k, n_channels));
    let mut dewhitening = Array2::zeros((n_channels, k));
    for (row, &idx) in order.iter().take(k).enumerate() {
        let lambda = eig.eigenvalues[idx];
        for ch in 0..n_channels {
            let v = eig.eigenvectors[(ch, idx)];
            whitening[[row, ch]] = v / lambda.sqrt();
            dewhitening[[ch, row]] = v * lambda.sqrt();
        }
    }
    let whitened = whitening.dot(&centered);
    let samples = whitened.t().as_standard_layout().into_owned();
    let mut rng = StdRng::seed_from_u64(seed);
    let (weights, iterations) = infomax(&samples, max_iter, &mut rng)?;
    // u = x . weights, so the unmixing in whitened space is weights^T.
    let ica_unmixing = weights.t().to_owned();
    let ica_mixing = invert(&ica_unmixing)?;
    let mut unmixing = ica_unmixing.dot(&whitening);
    let mut mixing = dewhitening.dot(&ica_mixing);
    // Unit-norm mixing columns: source variance then equals channel-space power.
    for j in 0..k {
        let norm = mixing.column(j).dot(&mixing.column(j)).sqrt();
        if norm > 0.0 {
            mixing.column_mut(j).mapv_inplace(|v| v / norm);
            unmixing.row_mut(j).mapv_inplace(|v| v * norm);
        }
    }
    let importance = stats::channel_variances(unmixing.dot(&centered).view());
    log::debug!("ICA: {k} components fitted in {iterations} epochs");
    Ok(IcaFit {
        components: ComponentSet::new(unmixing, mixing, mean, importance)?,
        iterations,
    })
}
fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>, SignalError> {
    let (rows, cols) = matrix.dim();
    let m = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);
    let inv = m
        .try_inverse()
        .ok_or_else(|| SignalError::Numerical("ICA unmixing matrix is singular".into()))?;
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| inv[(i, j)]))
}
/// Extended Infomax on whitened data (samples x features). Returns the weight
/// matrix `W` with sources `u = x . W`, and the number of epochs run.
fn infomax(x: &Array2<f64>, max_iter: usize, rng: &mut StdRng) -> Result<(Array2<f64>, usize), SignalError> {
    let (n_samples, n_features) = x.dim();
    let mut l_rate = if n_features > 1 {
        0.01 / ((n_features * n_features) as f64).ln()
    } else {
        0.01
    };
    let block = ((n_samples as f64 / 3.0).sqrt().floor() as usize).max(1);
    let n_blocks = n_samples / block;
    let last_t = (n_blocks - 1) * block + 1;
    let kurt_size = KURT_SIZE.min(n_samples);
    let degconst = 180.0 / PI;
    let start_weights = Array2::<f64>::eye(n_features);
    let block_identity = Array2::<f64>::eye(n_features) * block as f64;
    let mut initial_signs = Array1::<f64>::ones(n_features);
    initial_signs[0] = -1.0;
    let mut weights = start_weights.clone();
    let mut old_weights = start_weights.clone();
    let mut bias = Array1::<f64>::zeros(n_features);
    let mut signs = initial_signs.clone();
    let mut old_kurt = Array1::<f64>::zeros(n_features);
    let mut old_delta = Array1::<f64>::zeros(n_features * n_features);
    let mut old_change = 0.0;
    let mut max_iter = max_iter;
    let mut step = 0;
    let mut count_small_angle = 0;
    let mut blockno = 0usize;
    let mut signcount = 0;
    let mut ext_blocks = 1usize;
    let mut permute: Vec<usize> = (0..n_samples).collect();
    while step < max_iter {
        let mut blowup = false;
        permute.shuffle(rng);
        let mut t = 0;
        while t < last_t {
            let xb = x.select(Axis(0), &permute[t..t + block]);
            let mut u = xb.dot(&weights);
            u += &bias;
            let y = u.mapv(f64::tanh);
            let mut uy = u.t().dot(&y);
            uy *= &signs;
            let grad = &block_identity - &uy - &u.t().dot(&u);
            weights = &weights + &(weights.dot(&grad) * l_rate);
            bias = &bias + &(y.sum_axis(Axis(0)) * (-2.0 * l_rate));
            blockno += 1;
            if weights.iter().any(|w| !w.is_finite() || w.abs() > MAX_WEIGHT) {
                blowup = true;
                break;
            }
            if blockno % ext_blocks == 0 {
                let activations = if kurt_size < n_samples {
                    let picks: Vec<usize> = (0..kurt_size)
                        .map(|_| (rng.gen::<f64>() * (n_samples - 1) as f64).floor() as usize)
                        .collect();
                    x.select(Axis(0), &picks).dot(&weights)
                } else {
                    x.dot(&weights)
                };
                let kurt: Array1<f64> = activations
                    .axis_iter(Axis(1))
                    .map(stats::excess_kurtosis)
                    .collect();
                let kurt = &old_kurt * EXT_MOMENTUM + &kurt * (1.0 - EXT_MOMENTUM);
                old_kurt = kurt.clone();
                let new_signs = kurt.mapv(|k| {
                    let v = k + SIGNS_BIAS;
                    if v > 0.0 {
                        1.0
                    } else if v < 0.0 {
                        -1.0
                    } else {
                        0.0
                    }
                });
                if new_signs == signs {
                    signcount += 1;
                } else {
                    signcount = 0;
                }
                signs = new_signs;
                if signcount >= SIGNCOUNT_THRESHOLD {
                    ext_blocks *= SIGNCOUNT_STEP;
                    signcount = 0;
                }
            }
            t += block;
        }
        if blowup {
            l_rate *= RESTART_FAC;
            log::debug!("ICA: weights blew up, restarting with learning rate {l_rate:.3e}");
            if l_rate <= MIN_L_RATE {
                return Err(SignalError::Numerical(
                    "ICA learning rate collapsed; data may be rank deficient".into(),
                ));
            }
            step = 0;
            blockno = 1;
            weights = start_weights.clone();
            old_weights = start_weights.clone();
            old_delta.fill(0.0);
            bias.fill(0.0);
            old_kurt.fill(0.0);
            ext_blocks = 1;
            signs = initial_signs.clone();
            continue;
        }
        let delta: Array1<f64> = (&weights - &old_weights).iter().copied().collect();
        step += 1;
        let change = delta.dot(&delta);
        let mut angle_delta = 0.0;
        if step > 2 {
            let denom = (change * old_change).sqrt();
            if denom > 0.0 {
                angle_delta = (delta.dot(&old_delta) / denom).clamp(-1.0, 1.0).acos() * degconst;
            }
        }
        old_weights = weights.clone();
        if angle_delta > ANNEAL_DEG {
            l_rate *= ANNEAL_STEP;
            old_delta = delta;
            old_change = change;
            count_small_angle = 0;
        } else {
            if step == 1 {
                old_delta = delta;
                old_change = change;
            }
            count_small_angle += 1;
            if count_small_angle > N_SMALL_ANGLE {
                max_iter = step;
            }
        }
        if step > 2 && change < W_CHANGE {
            step = max_iter;
        } else if change > BLOWUP {
            l_rate *= BLOWUP_FAC;
        }
    }
    Ok((weights, step))
}
