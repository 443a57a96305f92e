use std::f64::consts::PI;
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::signal::{SignalBuffer, SignalError};
/// One-sided power spectral density per channel (V^2/Hz).
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    pub frequencies_hz: Vec<f64>,
    pub psd: Vec<Vec<f64>>, // channel -> bins
}
impl PowerSpectrum {
    /// Indices of the bins whose frequency lies in `[low_hz, high_hz]`.
    pub fn bins_between(&self, low_hz: f64, high_hz: f64) -> Vec<usize> {
        self.frequencies_hz
            .iter()
            .enumerate()
            .filter(|(_, f)| **f >= low_hz && **f <= high_hz)
            .map(|(idx, _)| idx)
            .collect()
    }
}
/// Welch estimator: Hann-windowed segments with 50 % overlap, mean removed per segment.
pub struct SpectrumBuilder {
    fft_size: usize,
}
impl SpectrumBuilder {
    pub fn with_size(fft_size: usize) -> Self {
        Self { fft_size }
    }
    /// Welch PSD of every channel, restricted to `[fmin_hz, fmax_hz]`.
    pub fn welch(
        &self,
        buffer: &SignalBuffer,
        fmin_hz: f64,
        fmax_hz: f64,
    ) -> Result<PowerSpectrum, SignalError> {
        let n_samples = buffer.n_samples();
        if n_samples < 2 {
            return Err(SignalError::TooFewSamples {
                needed: 2,
                actual: n_samples,
            });
        }
        let nperseg = self.fft_size.clamp(2, n_samples);
        let step = (nperseg / 2).max(1);
        let sample_rate_hz = buffer.sample_rate_hz();
        let window = hann_window(nperseg);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (sample_rate_hz * window_power);
        let n_bins = nperseg / 2 + 1;
        let keep: Vec<usize> = (0..n_bins)
            .filter(|&k| {
                let f = k as f64 * sample_rate_hz / nperseg as f64;
                f >= fmin_hz && f <= fmax_hz
            })
            .collect();
        if keep.is_empty() {
            return Err(SignalError::CutoffOutOfRange {
                cutoff_hz: fmin_hz,
                nyquist_hz: sample_rate_hz * 0.5,
            });
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nperseg);
        let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut segment = vec![Complex64::new(0.0, 0.0); nperseg];
        let starts: Vec<usize> = (0..=n_samples - nperseg).step_by(step).collect();
        let mut psd = Vec::with_capacity(buffer.n_channels());
        for channel in buffer.data().rows() {
            let mut accum = vec![0.0; n_bins];
            for &start in &starts {
                let mean = (start..start + nperseg).map(|i| channel[i]).sum::<f64>()
                    / nperseg as f64;
                for (i, slot) in segment.iter_mut().enumerate() {
                    *slot = Complex64::new((channel[start + i] - mean) * window[i], 0.0);
                }
                fft.process_with_scratch(&mut segment, &mut scratch);
                for (k, value) in accum.iter_mut().enumerate() {
                    let mut power = segment[k].norm_sqr() * scale;
                    let is_nyquist = nperseg % 2 == 0 && k == nperseg / 2;
                    if k != 0 && !is_nyquist {
                        power *= 2.0;
                    }
                    *value += power;
                }
            }
            let count = starts.len() as f64;
            psd.push(keep.iter().map(|&k| accum[k] / count).collect());
        }
        Ok(PowerSpectrum {
            frequencies_hz: keep
                .iter()
                .map(|&k| k as f64 * sample_rate_hz / nperseg as f64)
                .collect(),
            psd,
        })
    }
}
/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    fn tone(freq_hz: f64, amplitude: f64, n: usize) -> SignalBuffer {
        let fs = 250.0;
        let row: Vec<f64> = (0..n)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect();
        SignalBuffer::from_rows(vec!["Cz".into()], fs, vec![row]).unwrap()
    }
    #[test]
    fn peak_lands_on_tone_frequency() {
        let spectrum = SpectrumBuilder::with_size(256)
            .welch(&tone(10.0, 1.0, 5000), 0.5, 80.0)
            .unwrap();
        let (peak_bin, _) = spectrum.psd[0]
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert!((spectrum.frequencies_hz[peak_bin] - 10.0).abs() < 1.0);
        assert!(spectrum.frequencies_hz.first().copied().unwrap() >= 0.5);
        assert!(spectrum.frequencies_hz.last().copied().unwrap() <= 80.0);
    }
    #[test]
    fn density_integrates_to_variance() {
        // Parseval: sum(psd) * df ~ signal variance (A^2 / 2).
        let spectrum = SpectrumBuilder::with_size(256)
            .welch(&tone(10.0, 2.0, 10_000), 0.0, 125.0)
            .unwrap();
        let df = spectrum.frequencies_hz[1] - spectrum.frequencies_hz[0];
        let total: f64 = spectrum.psd[0].iter().sum::<f64>() * df;
        assert!((total - 2.0).abs() < 0.1);
    }
    #[test]
    fn short_recordings_shrink_the_segment() {
        let spectrum = SpectrumBuilder::with_size(2048)
            .welch(&tone(10.0, 1.0, 300), 1.0, 80.0)
            .unwrap();
        assert_eq!(spectrum.psd[0].len(), spectrum.frequencies_hz.len());
        assert!(spectrum.frequencies_hz.len() > 10);
    }
}
