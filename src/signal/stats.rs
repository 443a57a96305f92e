//! Small statistics helpers shared by the detectors and the quality metrics.
//!
//! Variances are population variances (divide by N), matching what the
//! channel-level detectors compare; `covariance_matrix` is the unbiased
//! estimator (divide by N - 1) used by the decompositions.
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
pub fn mean(values: ArrayView1<'_, f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sum() / values.len() as f64
}
pub fn variance(values: ArrayView1<'_, f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64
}
pub fn std_dev(values: ArrayView1<'_, f64>) -> f64 {
    variance(values).sqrt()
}
/// Median of a slice (average of the two middle values for even lengths).
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}
/// Population standard deviation of a slice.
pub fn slice_std(values: &[f64]) -> f64 {
    std_dev(ArrayView1::from(values))
}
/// Fisher (excess) kurtosis, biased estimator; 0 for a constant series.
pub fn excess_kurtosis(values: ArrayView1<'_, f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mu = mean(values);
    let (m2, m4) = values.iter().fold((0.0, 0.0), |(m2, m4), v| {
        let d = v - mu;
        let d2 = d * d;
        (m2 + d2, m4 + d2 * d2)
    });
    let m2 = m2 / n as f64;
    let m4 = m4 / n as f64;
    if m2 <= f64::MIN_POSITIVE {
        return 0.0;
    }
    m4 / (m2 * m2) - 3.0
}
/// Pearson correlation; 0 when either series has no variance.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    let denom = (va * vb).sqrt();
    if denom <= f64::MIN_POSITIVE {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}
/// Least-squares slope of `y` against `x`.
pub fn linear_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }
    if sxx <= 0.0 {
        return None;
    }
    Some(sxy / sxx)
}
/// Per-channel population variance.
pub fn channel_variances(data: ArrayView2<'_, f64>) -> Vec<f64> {
    data.axis_iter(Axis(0)).map(variance).collect()
}
/// Channel x channel covariance (rows are variables, N - 1 normalisation).
pub fn covariance_matrix(data: ArrayView2<'_, f64>) -> DMatrix<f64> {
    let (n_channels, n_samples) = data.dim();
    let means: Vec<f64> = data.axis_iter(Axis(0)).map(mean).collect();
    let mut centered = data.to_owned();
    for (mut row, mu) in centered.axis_iter_mut(Axis(0)).zip(&means) {
        row.mapv_inplace(|v| v - mu);
    }
    let gram = centered.dot(&centered.t());
    let denom = (n_samples.max(2) - 1) as f64;
    DMatrix::from_fn(n_channels, n_channels, |i, j| gram[[i, j]] / denom)
}
/// Z-score each row in place: subtract the mean, divide by (std + 1e-10).
pub fn zscore_rows(data: &mut Array2<f64>) {
    for mut row in data.axis_iter_mut(Axis(0)) {
        let mu = mean(row.view());
        let sd = std_dev(row.view());
        row.mapv_inplace(|v| (v - mu) / (sd + 1e-10));
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }
    #[test]
    fn kurtosis_of_sine_is_minus_one_and_a_half() {
        let n = 10_000;
        let sine: Array1<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 100.0).sin())
            .collect();
        assert!((excess_kurtosis(sine.view()) + 1.5).abs() < 1e-3);
        assert_eq!(excess_kurtosis(Array1::<f64>::zeros(8).view()), 0.0);
    }
    #[test]
    fn pearson_is_zero_for_flat_series() {
        let a = array![1.0, 2.0, 3.0, 4.0];
        let b = array![2.0, 4.0, 6.0, 8.0];
        let flat = array![5.0, 5.0, 5.0, 5.0];
        assert!((pearson(a.view(), b.view()) - 1.0).abs() < 1e-12);
        assert!((pearson(a.view(), b.mapv(|v| -v).view()) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(a.view(), flat.view()), 0.0);
    }
    #[test]
    fn slope_of_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        assert!((linear_slope(&x, &y).unwrap() - 2.0).abs() < 1e-12);
        assert!(linear_slope(&[1.0], &[1.0]).is_none());
    }
    #[test]
    fn covariance_is_unbiased() {
        let data = array![[1.0, 2.0, 3.0, 4.0], [2.0, 4.0, 6.0, 8.0]];
        let cov = covariance_matrix(data.view());
        assert!((cov[(0, 0)] - 5.0 / 3.0).abs() < 1e-12);
        assert!((cov[(0, 1)] - 10.0 / 3.0).abs() < 1e-12);
        assert!((cov[(1, 0)] - cov[(0, 1)]).abs() < 1e-12);
    }
    #[test]
    fn zscore_rows_normalises() {
        let mut data = array![[1.0, 2.0, 3.0, 4.0, 5.0]];
        zscore_rows(&mut data);
        assert!(mean(data.row(0)).abs() < 1e-12);
        assert!((std_dev(data.row(0)) - 1.0).abs() < 1e-6);
    }
}
