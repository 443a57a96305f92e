use std::f64::consts::PI;
use ndarray::{Array2, Axis};
use crate::signal::{ChannelKind, SignalBuffer, SignalError};
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterKind {
    Notch { freq_hz: f64, q: f64 },
    Highpass { cutoff_hz: f64, order: usize },
    Lowpass { cutoff_hz: f64, order: usize },
    Bandpass { low_hz: f64, high_hz: f64, order: usize },
}
#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
impl BiquadCoeffs {
    fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a1 + self.a2;
        if den.abs() < 1e-300 {
            0.0
        } else {
            (self.b0 + self.b1 + self.b2) / den
        }
    }
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    /// Put the section in the state it would settle into under a constant input.
    fn settle(&mut self, input: f64) -> f64 {
        let c = self.coeffs;
        let y = c.dc_gain() * input;
        self.state.z1 = (c.b1 + c.b2) * input - (c.a1 + c.a2) * y;
        self.state.z2 = c.b2 * input - c.a2 * y;
        y
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Cascade of second-order sections designed for one sample rate.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    sections: Vec<BiquadCoeffs>,
}
impl FilterChain {
    pub fn from_kinds(sample_rate_hz: f64, kinds: &[FilterKind]) -> Result<Self, SignalError> {
        let mut sections = Vec::new();
        for kind in kinds {
            sections.extend(design_sections(sample_rate_hz, *kind)?);
        }
        Ok(Self { sections })
    }
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let mut filters: Vec<BiquadFilter> =
            self.sections.iter().map(|c| BiquadFilter::new(*c)).collect();
        let Some(&first) = input.first() else {
            return Vec::new();
        };
        let mut settled = first;
        for filter in &mut filters {
            settled = filter.settle(settled);
        }
        input
            .iter()
            .map(|&x| {
                let mut value = x;
                for filter in &mut filters {
                    value = filter.process(value);
                }
                value
            })
            .collect()
    }
    /// Zero-phase (forward-backward) filtering with odd-reflection edge padding.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if self.is_empty() || n < 2 {
            return signal.to_vec();
        }
        let padlen = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));
        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();
        backward[padlen..padlen + n].to_vec()
    }
    /// Filter every channel of a matrix (channels x samples).
    pub fn filtfilt_rows(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let filtered = self.filtfilt(&row.to_vec());
            for (dst, src) in row.iter_mut().zip(filtered) {
                *dst = src;
            }
        }
        out
    }
}
fn design_sections(sample_rate_hz: f64, kind: FilterKind) -> Result<Vec<BiquadCoeffs>, SignalError> {
    let nyquist = sample_rate_hz * 0.5;
    match kind {
        FilterKind::Notch { freq_hz, q } => {
            check_cutoff(freq_hz, nyquist)?;
            Ok(vec![notch(freq_hz, sample_rate_hz, q.max(0.1))])
        }
        FilterKind::Highpass { cutoff_hz, order } => {
            check_cutoff(cutoff_hz, nyquist)?;
            Ok(butterworth_qs(order)
                .into_iter()
                .map(|q| highpass(cutoff_hz, sample_rate_hz, q))
                .collect())
        }
        FilterKind::Lowpass { cutoff_hz, order } => {
            check_cutoff(cutoff_hz, nyquist)?;
            Ok(butterworth_qs(order)
                .into_iter()
                .map(|q| lowpass(cutoff_hz, sample_rate_hz, q))
                .collect())
        }
        FilterKind::Bandpass {
            low_hz,
            high_hz,
            order,
        } => {
            let (low, high) = (low_hz.min(high_hz), low_hz.max(high_hz));
            let mut sections = design_sections(
                sample_rate_hz,
                FilterKind::Highpass {
                    cutoff_hz: low,
                    order,
                },
            )?;
            sections.extend(design_sections(
                sample_rate_hz,
                FilterKind::Lowpass {
                    cutoff_hz: high,
                    order,
                },
            )?);
            Ok(sections)
        }
    }
}
fn check_cutoff(freq_hz: f64, nyquist: f64) -> Result<(), SignalError> {
    if freq_hz > 0.0 && freq_hz < nyquist {
        Ok(())
    } else {
        Err(SignalError::CutoffOutOfRange {
            cutoff_hz: freq_hz,
            nyquist_hz: nyquist,
        })
    }
}
/// Section Q values of an even-order Butterworth prototype (odd orders round up).
fn butterworth_qs(order: usize) -> Vec<f64> {
    let order = order.max(2);
    let order = order + order % 2;
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}
fn lowpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 - cos_w0) * 0.5;
    let b1 = 1.0 - cos_w0;
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}
fn highpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 + cos_w0) * 0.5;
    let b1 = -(1.0 + cos_w0);
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}
fn notch(center_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * center_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = 1.0;
    let b1 = -2.0 * cos_w0;
    let b2 = 1.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}
fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}
// Buffer-level filter stages. Each returns a new buffer and leaves the input untouched.
pub fn apply(buffer: &SignalBuffer, kind: FilterKind) -> Result<SignalBuffer, SignalError> {
    let chain = FilterChain::from_kinds(buffer.sample_rate_hz(), &[kind])?;
    buffer.with_data(chain.filtfilt_rows(&buffer.data().to_owned()))
}
pub fn bandpass(
    buffer: &SignalBuffer,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Result<SignalBuffer, SignalError> {
    apply(
        buffer,
        FilterKind::Bandpass {
            low_hz,
            high_hz,
            order,
        },
    )
}
pub fn highpass_buffer(
    buffer: &SignalBuffer,
    cutoff_hz: f64,
    order: usize,
) -> Result<SignalBuffer, SignalError> {
    apply(buffer, FilterKind::Highpass { cutoff_hz, order })
}
pub fn notch_buffer(buffer: &SignalBuffer, freq_hz: f64, q: f64) -> Result<SignalBuffer, SignalError> {
    apply(buffer, FilterKind::Notch { freq_hz, q })
}
/// Subtract the per-sample mean of the good channels from every channel.
pub fn average_reference(buffer: &SignalBuffer) -> Result<SignalBuffer, SignalError> {
    let good = buffer.good_channel_indices();
    if good.is_empty() {
        return Err(SignalError::NoChannels);
    }
    let data = buffer.data();
    let reference = data
        .select(Axis(0), &good)
        .mean_axis(Axis(0))
        .ok_or(SignalError::NoChannels)?;
    let mut referenced = data.to_owned();
    for mut row in referenced.axis_iter_mut(Axis(0)) {
        row -= &reference;
    }
    buffer.with_data(referenced)
}
/// Keep only EEG channels.
pub fn pick_eeg(buffer: &SignalBuffer) -> Result<SignalBuffer, SignalError> {
    let eeg: Vec<usize> = buffer
        .channel_kinds()
        .iter()
        .enumerate()
        .filter(|(_, kind)| **kind == ChannelKind::Eeg)
        .map(|(idx, _)| idx)
        .collect();
    if eeg.is_empty() {
        return Err(SignalError::NoEegChannels);
    }
    buffer.select_channels(&eeg)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::stats;
    use ndarray::ArrayView1;
    fn sine(freq_hz: f64, sample_rate_hz: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect()
    }
    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }
    #[test]
    fn butterworth_fourth_order_qs() {
        let qs = butterworth_qs(4);
        assert_eq!(qs.len(), 2);
        assert!((qs[0] - 0.5412).abs() < 1e-3);
        assert!((qs[1] - 1.3066).abs() < 1e-3);
        assert_eq!(butterworth_qs(3).len(), 2);
    }
    #[test]
    fn bandpass_keeps_passband_and_rejects_stopband() {
        let fs = 250.0;
        let chain = FilterChain::from_kinds(
            fs,
            &[FilterKind::Bandpass {
                low_hz: 5.0,
                high_hz: 20.0,
                order: 4,
            }],
        )
        .unwrap();
        let pass = chain.filtfilt(&sine(10.0, fs, 5000));
        let stop = chain.filtfilt(&sine(60.0, fs, 5000));
        assert!((rms(&pass[500..4500]) - rms(&sine(10.0, fs, 4000))).abs() < 0.05);
        assert!(rms(&stop[500..4500]) < 0.01);
    }
    #[test]
    fn notch_removes_line_noise() {
        let fs = 250.0;
        let chain =
            FilterChain::from_kinds(fs, &[FilterKind::Notch { freq_hz: 60.0, q: 30.0 }]).unwrap();
        let out = chain.filtfilt(&sine(60.0, fs, 5000));
        assert!(rms(&out[1000..4000]) < 0.05);
    }
    #[test]
    fn highpass_removes_dc_offset() {
        let fs = 250.0;
        let signal: Vec<f64> = sine(10.0, fs, 2500).iter().map(|v| v + 5.0).collect();
        let chain = FilterChain::from_kinds(
            fs,
            &[FilterKind::Highpass {
                cutoff_hz: 1.0,
                order: 4,
            }],
        )
        .unwrap();
        let out = chain.filtfilt(&signal);
        assert!(stats::mean(ArrayView1::from(&out[500..2000])).abs() < 0.05);
    }
    #[test]
    fn cutoff_above_nyquist_is_rejected() {
        let err = FilterChain::from_kinds(100.0, &[FilterKind::Notch { freq_hz: 60.0, q: 30.0 }]);
        assert!(matches!(err, Err(SignalError::CutoffOutOfRange { .. })));
    }
    #[test]
    fn average_reference_zeroes_channel_mean() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0], vec![2.0, 2.0, 2.0]];
        let names = vec!["A".into(), "B".into(), "C".into()];
        let buffer = SignalBuffer::from_rows(names, 10.0, rows).unwrap();
        let referenced = average_reference(&buffer).unwrap();
        for t in 0..3 {
            let column_sum: f64 = referenced.data().column(t).sum();
            assert!(column_sum.abs() < 1e-12);
        }
        assert_eq!(buffer.channel(0)[0], 1.0);
    }
    #[test]
    fn pick_eeg_drops_auxiliary_channels() {
        let names = vec!["Fz".into(), "EOG1".into(), "Cz".into()];
        let buffer = SignalBuffer::from_rows(names, 10.0, vec![vec![0.0; 4]; 3]).unwrap();
        let picked = pick_eeg(&buffer).unwrap();
        assert_eq!(picked.channel_names(), &["Fz".to_string(), "Cz".to_string()]);
    }
}
