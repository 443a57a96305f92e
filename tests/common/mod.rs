#![allow(dead_code)]
use std::f64::consts::PI;
use neuroclean::signal::SignalBuffer;
use neuroclean::PipelineConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
pub const FS: f64 = 250.0;
fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("EEG{i:02}")).collect()
}
/// 10 Hz sine on every channel with a small per-channel phase lag and
/// picovolt-level noise.
pub fn alpha_recording(n_channels: usize, seconds: f64) -> SignalBuffer {
    let n = (seconds * FS) as usize;
    let mut rng = StdRng::seed_from_u64(7);
    let rows = (0..n_channels)
        .map(|ch| {
            (0..n)
                .map(|t| {
                    let x = t as f64 / FS;
                    20e-6 * (2.0 * PI * 10.0 * x + 0.05 * ch as f64).sin()
                        + 1e-12 * rng.gen_range(-1.0..1.0)
                })
                .collect()
        })
        .collect();
    SignalBuffer::from_rows(names(n_channels), FS, rows).unwrap()
}
/// Same recording with one channel replaced by zeros.
pub fn with_flat_channel(buffer: &SignalBuffer, channel: usize) -> SignalBuffer {
    let mut data = buffer.data().to_owned();
    data.row_mut(channel).fill(0.0);
    buffer.with_data(data).unwrap()
}
/// Random mixture of an alpha rhythm, a slow blink-like square wave, a
/// 20 Hz beta rhythm and per-channel noise.
pub fn mixed_recording(n_channels: usize, seconds: f64, seed: u64) -> SignalBuffer {
    let n = (seconds * FS) as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let mixing: Vec<[f64; 3]> = (0..n_channels)
        .map(|_| {
            [
                rng.gen_range(0.5..1.5),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-0.5..0.5),
            ]
        })
        .collect();
    let rows = mixing
        .iter()
        .map(|weights| {
            (0..n)
                .map(|t| {
                    let x = t as f64 / FS;
                    let alpha = 20e-6 * (2.0 * PI * 10.0 * x).sin();
                    let blink = if (x * 0.5).fract() < 0.1 { 60e-6 } else { 0.0 };
                    let beta = 5e-6 * (2.0 * PI * 20.0 * x).sin();
                    weights[0] * alpha + weights[1] * blink + weights[2] * beta
                        + 3e-6 * rng.gen_range(-1.0..1.0)
                })
                .collect()
        })
        .collect();
    SignalBuffer::from_rows(names(n_channels), FS, rows).unwrap()
}
pub fn quick_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.ica.max_iter = 50;
    config
}
