use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::signal::{stats, SignalBuffer, SignalError};
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadChannelReason {
    #[serde(rename = "Low variance (flat)")]
    Flat,
    #[serde(rename = "High variance (noisy)")]
    Noisy,
}
impl fmt::Display for BadChannelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadChannelReason::Flat => f.write_str("Low variance (flat)"),
            BadChannelReason::Noisy => f.write_str("High variance (noisy)"),
        }
    }
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BadChannelFindings {
    /// Flagged channel names in channel order.
    pub channels: Vec<String>,
    pub reasons: BTreeMap<String, BadChannelReason>,
    pub total_channels: usize,
}
impl BadChannelFindings {
    pub fn fraction(&self) -> f64 {
        if self.total_channels == 0 {
            0.0
        } else {
            self.channels.len() as f64 / self.total_channels as f64
        }
    }
}
/// Flags channels whose variance is far from the median channel variance.
#[derive(Clone, Copy, Debug)]
pub struct BadChannelDetector {
    pub flat_ratio: f64,
    pub noisy_ratio: f64,
}
impl Default for BadChannelDetector {
    fn default() -> Self {
        Self {
            flat_ratio: 0.1,
            noisy_ratio: 10.0,
        }
    }
}
impl BadChannelDetector {
    pub fn detect(&self, buffer: &SignalBuffer) -> BadChannelFindings {
        let variances = stats::channel_variances(buffer.data());
        let median = stats::median(&variances);
        let mut findings = BadChannelFindings {
            total_channels: buffer.n_channels(),
            ..Default::default()
        };
        for (name, var) in buffer.channel_names().iter().zip(&variances) {
            let reason = if *var < self.flat_ratio * median {
                BadChannelReason::Flat
            } else if *var > self.noisy_ratio * median {
                BadChannelReason::Noisy
            } else {
                continue;
            };
            findings.channels.push(name.clone());
            findings.reasons.insert(name.clone(), reason);
        }
        findings
    }
}
/// Replace each bad channel with the average of the nearest good channel on
/// either side (in channel order) and clear its bad flag.
pub fn interpolate_bad_channels(buffer: &SignalBuffer) -> Result<SignalBuffer, SignalError> {
    let good = buffer.good_channel_indices();
    if good.is_empty() {
        return Err(SignalError::TooFewChannels {
            needed: 1,
            actual: 0,
        });
    }
    let mut data = buffer.data().to_owned();
    for name in buffer.bad_channels() {
        let Some(idx) = buffer.channel_index(name) else {
            continue;
        };
        let left = good.iter().rev().find(|&&g| g < idx).copied();
        let right = good.iter().find(|&&g| g > idx).copied();
        let neighbours: Vec<usize> = left.into_iter().chain(right).collect();
        let mut estimate = buffer.channel(neighbours[0]).to_owned();
        for &n in &neighbours[1..] {
            estimate += &buffer.channel(n);
        }
        estimate /= neighbours.len() as f64;
        data.row_mut(idx).assign(&estimate);
    }
    let mut repaired = buffer.with_data(data)?;
    repaired.clear_bad_channels();
    Ok(repaired)
}
