use std::fmt::Write;
use crate::quality::QualityMetrics;
/// Fixed-layout plain-text quality report.
pub fn render(metrics: &QualityMetrics, title: &str) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, metrics, title, &rule);
    out
}
fn write_report(out: &mut String, m: &QualityMetrics, title: &str, rule: &str) -> std::fmt::Result {
    writeln!(out, "{rule}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;
    writeln!(out, "Overall Quality Score: {:.1}/100", m.data_quality_score)?;
    writeln!(out, "Quality Grade: {}", m.quality_grade)?;
    writeln!(out)?;
    writeln!(out, "Signal-to-Noise Ratio: {:.2} dB", m.snr)?;
    writeln!(out)?;
    let psd = &m.psd_slope;
    writeln!(out, "PSD Slope: {:.4} ± {:.4}", psd.mean_slope, psd.std_slope)?;
    writeln!(out, "PSD Quality Classification: {}", psd.quality)?;
    writeln!(out)?;
    let art = &m.artifact_percentage;
    writeln!(out, "Estimated Artifact Content: {:.2}%", art.estimated_total)?;
    writeln!(out, "  - Amplitude-based: {:.2}%", art.amplitude_based)?;
    writeln!(out, "  - Gradient-based: {:.2}%", art.gradient_based)?;
    writeln!(out)?;
    let bad = &m.bad_channels;
    writeln!(out, "Bad Channels: {} ({:.1}%)", bad.count, bad.percentage)?;
    if !bad.bad_channels.is_empty() {
        let shown: Vec<&str> = bad.bad_channels.iter().take(5).map(String::as_str).collect();
        writeln!(out, "  Channels: {}", shown.join(", "))?;
        if bad.bad_channels.len() > 5 {
            writeln!(out, "  ... and {} more", bad.bad_channels.len() - 5)?;
        }
    }
    writeln!(out)?;
    let kurt = &m.kurtosis;
    writeln!(out, "Kurtosis (artifact indicator): {:.2} ± {:.2}", kurt.mean, kurt.std)?;
    writeln!(out, "Channels with high kurtosis: {}", kurt.channels_with_high_kurtosis)?;
    writeln!(out)?;
    let bands = &m.frequency_bands;
    writeln!(out, "Frequency Band Powers:")?;
    writeln!(out, "  Delta (1-4 Hz):   {:.2e}", bands.delta)?;
    writeln!(out, "  Theta (4-8 Hz):   {:.2e}", bands.theta)?;
    writeln!(out, "  Alpha (8-13 Hz):  {:.2e}", bands.alpha)?;
    writeln!(out, "  Beta (13-30 Hz):  {:.2e}", bands.beta)?;
    writeln!(out, "  Gamma (30-80 Hz): {:.2e}", bands.gamma)?;
    writeln!(out, "  Alpha/Delta Ratio: {:.2}", bands.alpha_delta_ratio)?;
    writeln!(out)?;
    let corr = &m.channel_correlation;
    writeln!(out, "Channel Correlation: {:.3} ± {:.3}", corr.mean, corr.std)?;
    writeln!(out, "  Range: [{:.3}, {:.3}]", corr.min, corr.max)?;
    writeln!(out)?;
    write!(out, "{rule}")
}
