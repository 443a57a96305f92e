use std::collections::{BTreeSet, HashSet};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use crate::signal::SignalError;
/// Sensor type of a channel; only `Eeg` survives channel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Eeg,
    Eog,
    Ecg,
    Emg,
    Stim,
    Misc,
}
impl ChannelKind {
    /// Guess the channel type from its label, defaulting to EEG.
    pub fn from_label(label: &str) -> Self {
        let upper = label.trim().to_ascii_uppercase();
        if upper.starts_with("EOG") || upper.starts_with("VEOG") || upper.starts_with("HEOG") {
            ChannelKind::Eog
        } else if upper.starts_with("ECG") || upper.starts_with("EKG") {
            ChannelKind::Ecg
        } else if upper.starts_with("EMG") {
            ChannelKind::Emg
        } else if upper.starts_with("STI") || upper.starts_with("TRIG") {
            ChannelKind::Stim
        } else if upper.starts_with("MISC") || upper == "TIMESTAMP" {
            ChannelKind::Misc
        } else {
            ChannelKind::Eeg
        }
    }
}
/// Complete multichannel recording held in memory (channels x samples, volts).
///
/// Every processing stage takes a buffer by reference and hands back a new one,
/// so an original recording can always be compared with its cleaned versions.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalBuffer {
    data: Array2<f64>,
    channel_names: Vec<String>,
    channel_kinds: Vec<ChannelKind>,
    sample_rate_hz: f64,
    bad_channels: BTreeSet<String>,
}
impl SignalBuffer {
    pub fn new(
        channel_names: Vec<String>,
        sample_rate_hz: f64,
        data: Array2<f64>,
    ) -> Result<Self, SignalError> {
        let kinds = channel_names
            .iter()
            .map(|name| ChannelKind::from_label(name))
            .collect();
        Self::with_channel_kinds(channel_names, kinds, sample_rate_hz, data)
    }
    pub fn with_channel_kinds(
        channel_names: Vec<String>,
        channel_kinds: Vec<ChannelKind>,
        sample_rate_hz: f64,
        data: Array2<f64>,
    ) -> Result<Self, SignalError> {
        if sample_rate_hz <= 0.0 || !sample_rate_hz.is_finite() {
            return Err(SignalError::InvalidSampleRate);
        }
        if channel_names.is_empty() {
            return Err(SignalError::NoChannels);
        }
        if channel_names.len() != data.nrows() {
            return Err(SignalError::ChannelMismatch {
                expected: channel_names.len(),
                actual: data.nrows(),
            });
        }
        if channel_kinds.len() != channel_names.len() {
            return Err(SignalError::ChannelMismatch {
                expected: channel_names.len(),
                actual: channel_kinds.len(),
            });
        }
        let mut seen = HashSet::with_capacity(channel_names.len());
        for name in &channel_names {
            if !seen.insert(name.as_str()) {
                return Err(SignalError::DuplicateChannel(name.clone()));
            }
        }
        if data.ncols() == 0 {
            return Err(SignalError::TooFewSamples {
                needed: 1,
                actual: 0,
            });
        }
        Ok(Self {
            data,
            channel_names,
            channel_kinds,
            sample_rate_hz,
            bad_channels: BTreeSet::new(),
        })
    }
    /// Build a buffer from per-channel sample vectors (all of equal length).
    pub fn from_rows(
        channel_names: Vec<String>,
        sample_rate_hz: f64,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SignalError> {
        let n_samples = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_samples) {
            return Err(SignalError::TooFewSamples {
                needed: n_samples,
                actual: bad.len(),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let n_channels = if n_samples == 0 { 0 } else { flat.len() / n_samples };
        let data = Array2::from_shape_vec((n_channels, n_samples), flat)
            .map_err(|e| SignalError::Numerical(e.to_string()))?;
        Self::new(channel_names, sample_rate_hz, data)
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }
    pub fn channel_kinds(&self) -> &[ChannelKind] {
        &self.channel_kinds
    }
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }
    pub fn duration_seconds(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate_hz
    }
    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|n| n == name)
    }
    pub fn bad_channels(&self) -> &BTreeSet<String> {
        &self.bad_channels
    }
    pub fn is_bad(&self, name: &str) -> bool {
        self.bad_channels.contains(name)
    }
    /// Indices of channels not flagged as bad, in channel order.
    pub fn good_channel_indices(&self) -> Vec<usize> {
        self.channel_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.bad_channels.contains(*name))
            .map(|(idx, _)| idx)
            .collect()
    }
    pub fn mark_bad(&mut self, name: &str) -> Result<(), SignalError> {
        if self.channel_index(name).is_none() {
            return Err(SignalError::UnknownChannel(name.to_owned()));
        }
        self.bad_channels.insert(name.to_owned());
        Ok(())
    }
    pub fn clear_bad_channels(&mut self) {
        self.bad_channels.clear();
    }
    /// Same metadata, new samples. The shape must match.
    pub fn with_data(&self, data: Array2<f64>) -> Result<Self, SignalError> {
        if data.nrows() != self.n_channels() {
            return Err(SignalError::ChannelMismatch {
                expected: self.n_channels(),
                actual: data.nrows(),
            });
        }
        if data.ncols() != self.n_samples() {
            return Err(SignalError::TooFewSamples {
                needed: self.n_samples(),
                actual: data.ncols(),
            });
        }
        Ok(Self {
            data,
            channel_names: self.channel_names.clone(),
            channel_kinds: self.channel_kinds.clone(),
            sample_rate_hz: self.sample_rate_hz,
            bad_channels: self.bad_channels.clone(),
        })
    }
    /// Keep the listed channels, in the order given.
    pub fn select_channels(&self, indices: &[usize]) -> Result<Self, SignalError> {
        if indices.is_empty() {
            return Err(SignalError::NoChannels);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_channels()) {
            return Err(SignalError::ChannelMismatch {
                expected: self.n_channels(),
                actual: bad + 1,
            });
        }
        let data = self.data.select(Axis(0), indices);
        let names: Vec<String> = indices.iter().map(|&i| self.channel_names[i].clone()).collect();
        let kinds = indices.iter().map(|&i| self.channel_kinds[i]).collect();
        let bad_channels = self
            .bad_channels
            .iter()
            .filter(|b| names.contains(b))
            .cloned()
            .collect();
        let mut selected = Self::with_channel_kinds(names, kinds, self.sample_rate_hz, data)?;
        selected.bad_channels = bad_channels;
        Ok(selected)
    }
    /// Leading `seconds` of the recording (the whole thing if it is shorter).
    pub fn head_seconds(&self, seconds: f64) -> Self {
        let take = ((seconds.max(0.0) * self.sample_rate_hz).floor() as usize)
            .clamp(1, self.n_samples());
        Self {
            data: self.data.slice(s![.., ..take]).to_owned(),
            channel_names: self.channel_names.clone(),
            channel_kinds: self.channel_kinds.clone(),
            sample_rate_hz: self.sample_rate_hz,
            bad_channels: self.bad_channels.clone(),
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("C{i}")).collect()
    }
    #[test]
    fn rejects_invalid_metadata() {
        let data = Array2::<f64>::zeros((2, 10));
        assert!(matches!(
            SignalBuffer::new(names(2), 0.0, data.clone()),
            Err(SignalError::InvalidSampleRate)
        ));
        assert!(matches!(
            SignalBuffer::new(names(3), 250.0, data.clone()),
            Err(SignalError::ChannelMismatch { .. })
        ));
        assert!(matches!(
            SignalBuffer::new(vec!["A".into(), "A".into()], 250.0, data),
            Err(SignalError::DuplicateChannel(_))
        ));
    }
    #[test]
    fn channel_kinds_are_inferred_from_labels() {
        assert_eq!(ChannelKind::from_label("Fp1"), ChannelKind::Eeg);
        assert_eq!(ChannelKind::from_label("EOG-L"), ChannelKind::Eog);
        assert_eq!(ChannelKind::from_label("ecg"), ChannelKind::Ecg);
        assert_eq!(ChannelKind::from_label("STI 014"), ChannelKind::Stim);
    }
    #[test]
    fn selection_keeps_order_and_bad_flags() {
        let rows = vec![vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]];
        let mut buffer = SignalBuffer::from_rows(names(3), 100.0, rows).unwrap();
        buffer.mark_bad("C2").unwrap();
        let picked = buffer.select_channels(&[2, 0]).unwrap();
        assert_eq!(picked.channel_names(), &["C2".to_string(), "C0".to_string()]);
        assert_eq!(picked.channel(0)[0], 3.0);
        assert!(picked.is_bad("C2"));
        assert_eq!(picked.good_channel_indices(), vec![1]);
    }
    #[test]
    fn with_data_is_copy_on_write() {
        let buffer = SignalBuffer::from_rows(names(1), 10.0, vec![vec![1.0, 2.0]]).unwrap();
        let doubled = buffer.with_data(buffer.data().mapv(|v| v * 2.0)).unwrap();
        assert_eq!(buffer.channel(0)[1], 2.0);
        assert_eq!(doubled.channel(0)[1], 4.0);
        assert!(buffer.with_data(Array2::zeros((2, 2))).is_err());
    }
    #[test]
    fn head_seconds_clamps_to_length() {
        let buffer = SignalBuffer::from_rows(names(1), 10.0, vec![vec![0.0; 25]]).unwrap();
        assert_eq!(buffer.head_seconds(1.0).n_samples(), 10);
        assert_eq!(buffer.head_seconds(30.0).n_samples(), 25);
    }
}
