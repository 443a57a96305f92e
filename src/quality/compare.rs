use std::fmt::Write;
use serde::Serialize;
use thiserror::Error;
use crate::quality::QualityMetrics;
#[derive(Debug, Error, PartialEq)]
pub enum ComparisonError {
    #[error("need at least 2 methods to compare, got {0}")]
    TooFewEntries(usize),
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparedEntry {
    pub name: String,
    pub metrics: QualityMetrics,
}
/// GEDAI score minus Traditional score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreDelta {
    pub points: f64,
    /// Relative to the Traditional score; 0 when that score is not positive.
    pub percent: f64,
}
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    pub entries: Vec<ComparedEntry>,
    pub winner: String,
    pub winner_score: f64,
    pub delta: Option<ScoreDelta>,
}
/// Side-by-side reduction of two or more named quality batteries.
///
/// The winner is the entry with the highest score; on a tie the earliest entry
/// in iteration order wins, so callers control tie-breaking through ordering.
pub struct ComparisonReducer;
impl ComparisonReducer {
    pub fn compare<'a, N>(
        batteries: impl IntoIterator<Item = (N, &'a QualityMetrics)>,
    ) -> Result<Comparison, ComparisonError>
    where
        N: AsRef<str>,
    {
        let entries: Vec<ComparedEntry> = batteries
            .into_iter()
            .map(|(name, metrics)| ComparedEntry {
                name: name.as_ref().to_owned(),
                metrics: metrics.clone(),
            })
            .collect();
        if entries.len() < 2 {
            return Err(ComparisonError::TooFewEntries(entries.len()));
        }
        let mut best = &entries[0];
        for entry in &entries[1..] {
            if entry.metrics.data_quality_score > best.metrics.data_quality_score {
                best = entry;
            }
        }
        let (winner, winner_score) = (best.name.clone(), best.metrics.data_quality_score);
        let score_of = |key: &str| {
            entries
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(key))
                .map(|e| e.metrics.data_quality_score)
        };
        let delta = match (score_of("traditional"), score_of("gedai")) {
            (Some(traditional), Some(gedai)) => {
                let points = gedai - traditional;
                let percent = if traditional > 0.0 {
                    points / traditional * 100.0
                } else {
                    0.0
                };
                Some(ScoreDelta { points, percent })
            }
            _ => None,
        };
        Ok(Comparison {
            entries,
            winner,
            winner_score,
            delta,
        })
    }
}
impl Comparison {
    /// Fixed-layout method comparison report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_report(&mut out);
        out
    }
    fn write_report(&self, out: &mut String) -> std::fmt::Result {
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);
        writeln!(out, "{rule}")?;
        writeln!(out, "METHOD COMPARISON REPORT")?;
        writeln!(out, "{rule}")?;
        writeln!(out)?;
        writeln!(out, "OVERALL QUALITY SCORES:")?;
        writeln!(out, "{thin}")?;
        for e in &self.entries {
            writeln!(
                out,
                "{:<15} : {:6.2}/100  ({})",
                e.name.to_uppercase(),
                e.metrics.data_quality_score,
                e.metrics.quality_grade
            )?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "BEST METHOD: {} (Score: {:.2})",
            self.winner.to_uppercase(),
            self.winner_score
        )?;
        writeln!(out)?;
        writeln!(out, "DETAILED METRIC COMPARISON:")?;
        writeln!(out, "{thin}")?;
        writeln!(out, "\n1. Signal-to-Noise Ratio (SNR):")?;
        for e in &self.entries {
            writeln!(out, "   {:<15}: {:8.2} dB", e.name, e.metrics.snr)?;
        }
        writeln!(out, "\n2. PSD Slope (Quality Indicator):")?;
        for e in &self.entries {
            let psd = &e.metrics.psd_slope;
            writeln!(out, "   {:<15}: {:8.4} ({})", e.name, psd.mean_slope, psd.quality)?;
        }
        writeln!(out, "\n3. Artifact Percentage:")?;
        for e in &self.entries {
            let pct = e.metrics.artifact_percentage.estimated_total;
            writeln!(out, "   {:<15}: {:7.2}%", e.name, pct)?;
        }
        writeln!(out, "\n4. Bad Channels:")?;
        for e in &self.entries {
            let bad = &e.metrics.bad_channels;
            writeln!(
                out,
                "   {:<15}: {:3} channels ({:.1}%)",
                e.name, bad.count, bad.percentage
            )?;
        }
        writeln!(out, "\n5. Kurtosis (Artifact Indicator):")?;
        for e in &self.entries {
            writeln!(out, "   {:<15}: {:8.2}", e.name, e.metrics.kurtosis.mean)?;
        }
        writeln!(out, "\n6. Alpha/Delta Ratio:")?;
        for e in &self.entries {
            let ratio = e.metrics.frequency_bands.alpha_delta_ratio;
            writeln!(out, "   {:<15}: {:8.2}", e.name, ratio)?;
        }
        writeln!(out, "\n7. Channel Correlation:")?;
        for e in &self.entries {
            let corr = e.metrics.channel_correlation.mean;
            writeln!(out, "   {:<15}: {:8.3}", e.name, corr)?;
        }
        writeln!(out)?;
        writeln!(out, "{rule}")?;
        writeln!(out, "\nIMPROVEMENT SUMMARY:")?;
        writeln!(out, "{thin}")?;
        if let Some(delta) = self.delta {
            if delta.points > 0.0 {
                writeln!(
                    out,
                    "GEDAI outperformed Traditional by {:.2} points ({:.1}%)",
                    delta.points, delta.percent
                )?;
            } else if delta.points < 0.0 {
                writeln!(
                    out,
                    "Traditional outperformed GEDAI by {:.2} points ({:.1}%)",
                    delta.points.abs(),
                    delta.percent.abs()
                )?;
            } else {
                writeln!(out, "Both methods achieved similar quality scores")?;
            }
        }
        writeln!(out)?;
        write!(out, "{rule}")
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::QualityGrade;
    fn scored(score: f64) -> QualityMetrics {
        QualityMetrics {
            data_quality_score: score,
            quality_grade: QualityGrade::from_score(score),
            ..Default::default()
        }
    }
    #[test]
    fn gedai_wins_with_reported_improvement() {
        let traditional = scored(62.0);
        let gedai = scored(78.5);
        let comparison =
            ComparisonReducer::compare([("traditional", &traditional), ("gedai", &gedai)]).unwrap();
        assert_eq!(comparison.winner, "gedai");
        let delta = comparison.delta.unwrap();
        assert!((delta.points - 16.5).abs() < 1e-9);
        assert!((delta.percent - 26.6).abs() < 0.05);
        let text = comparison.render();
        assert!(text.contains("BEST METHOD: GEDAI (Score: 78.50)"));
        assert!(text.contains("GEDAI outperformed Traditional by 16.50 points (26.6%)"));
    }
    #[test]
    fn ties_go_to_the_first_entry() {
        let a = scored(70.0);
        let b = scored(70.0);
        let comparison = ComparisonReducer::compare([("gedai", &a), ("traditional", &b)]).unwrap();
        assert_eq!(comparison.winner, "gedai");
        assert_eq!(comparison.delta.unwrap().points, 0.0);
        assert!(comparison.render().contains("Both methods achieved similar quality scores"));
    }
    #[test]
    fn other_pairs_have_no_delta() {
        let a = scored(10.0);
        let b = scored(20.0);
        let comparison = ComparisonReducer::compare([("raw", &a), ("gedai", &b)]).unwrap();
        assert_eq!(comparison.winner, "gedai");
        assert!(comparison.delta.is_none());
    }
    #[test]
    fn single_battery_is_rejected() {
        let a = scored(10.0);
        assert_eq!(
            ComparisonReducer::compare([("gedai", &a)]).unwrap_err(),
            ComparisonError::TooFewEntries(1)
        );
    }
}
