use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::signal::{stats, SignalBuffer, SignalError};
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("sample rate unknown: no timestamp column and none configured")]
    MissingSampleRate,
    #[error("no recording queued")]
    Exhausted,
    #[error(transparent)]
    Signal(#[from] SignalError),
}
/// Anything that can hand over one complete, pre-loaded recording.
pub trait RecordingSource {
    fn load(&mut self) -> Result<SignalBuffer, IngestError>;
}
/// In-memory source useful for tests and deterministic playback.
pub struct InMemorySource {
    queue: VecDeque<SignalBuffer>,
}
impl InMemorySource {
    pub fn new(recordings: impl IntoIterator<Item = SignalBuffer>) -> Self {
        Self {
            queue: recordings.into_iter().collect(),
        }
    }
}
impl RecordingSource for InMemorySource {
    fn load(&mut self) -> Result<SignalBuffer, IngestError> {
        self.queue.pop_front().ok_or(IngestError::Exhausted)
    }
}
/// Reads the recorder's CSV layout: a header of channel names, optionally led by
/// a `Timestamp` column in seconds, then one row per sample.
pub struct CsvSource {
    path: PathBuf,
    sample_rate_hz: Option<f64>,
    scale: f64,
}
impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sample_rate_hz: None,
            scale: 1.0,
        }
    }
    pub fn with_sample_rate(mut self, sample_rate_hz: f64) -> Self {
        self.sample_rate_hz = Some(sample_rate_hz);
        self
    }
    /// Multiplier from file units to volts (`1e-6` for microvolt files).
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}
impl CsvSource {
    fn csv_error(&self, err: csv::Error) -> IngestError {
        let line = err.position().map_or(0, |p| p.line() as usize);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => IngestError::Io {
                path: self.path.clone(),
                source,
            },
            csv::ErrorKind::UnequalLengths {
                expected_len, len, ..
            } => IngestError::Malformed {
                line,
                message: format!("expected {expected_len} fields, found {len}"),
            },
            _ => IngestError::Malformed { line, message },
        }
    }
}
impl RecordingSource for CsvSource {
    fn load(&mut self) -> Result<SignalBuffer, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;
        let header = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        if header.is_empty() {
            return Err(IngestError::Empty {
                path: self.path.clone(),
            });
        }
        // Spreadsheet exports often lead with a byte-order mark.
        let columns: Vec<String> = header
            .iter()
            .map(|c| c.trim_start_matches('\u{feff}').trim().to_owned())
            .collect();
        let has_timestamp = columns
            .first()
            .map(|c| c.eq_ignore_ascii_case("timestamp"))
            .unwrap_or(false);
        let channel_names: Vec<String> = columns
            .iter()
            .skip(usize::from(has_timestamp))
            .cloned()
            .collect();
        let mut timestamps = Vec::new();
        let mut rows: Vec<Vec<f64>> = vec![Vec::new(); channel_names.len()];
        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let mut fields = record.iter().map(|v| {
                v.parse::<f64>().map_err(|e| IngestError::Malformed {
                    line,
                    message: format!("`{v}`: {e}"),
                })
            });
            if has_timestamp {
                if let Some(stamp) = fields.next() {
                    timestamps.push(stamp?);
                }
            }
            for (row, value) in rows.iter_mut().zip(fields) {
                row.push(value? * self.scale);
            }
        }
        let sample_rate_hz = match self.sample_rate_hz {
            Some(rate) => rate,
            None => infer_sample_rate(&timestamps).ok_or(IngestError::MissingSampleRate)?,
        };
        log::info!(
            "Loaded {} channels x {} samples at {:.1} Hz from {}",
            channel_names.len(),
            rows.first().map(|r| r.len()).unwrap_or(0),
            sample_rate_hz,
            self.path.display()
        );
        Ok(SignalBuffer::from_rows(channel_names, sample_rate_hz, rows)?)
    }
}
/// Sample rate from the median timestamp step.
fn infer_sample_rate(timestamps: &[f64]) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let steps: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    let step = stats::median(&steps);
    (step > 0.0).then(|| 1.0 / step)
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn in_memory_source_drains_in_order() {
        let a = SignalBuffer::from_rows(vec!["A".into()], 10.0, vec![vec![1.0]]).unwrap();
        let b = SignalBuffer::from_rows(vec!["B".into()], 10.0, vec![vec![2.0]]).unwrap();
        let mut source = InMemorySource::new(vec![a, b]);
        assert_eq!(source.load().unwrap().channel_names()[0], "A");
        assert_eq!(source.load().unwrap().channel_names()[0], "B");
        assert!(matches!(source.load(), Err(IngestError::Exhausted)));
    }
    fn load_text(text: &str) -> Result<SignalBuffer, IngestError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.csv");
        std::fs::write(&path, text).unwrap();
        CsvSource::new(&path).load()
    }
    #[test]
    fn quoted_header_keeps_timestamp_column() {
        let buffer =
            load_text("\"Timestamp\",\"Fz\",\"Cz\"\n0.000,1.0,2.0\n0.004,1.5,2.5\n0.008,2.0,3.0\n").unwrap();
        assert_eq!(buffer.channel_names(), &["Fz".to_string(), "Cz".to_string()]);
        assert!((buffer.sample_rate_hz() - 250.0).abs() < 1e-6);
        assert_eq!(buffer.channel(1)[2], 3.0);
    }
    #[test]
    fn byte_order_mark_is_ignored() {
        let buffer = load_text("\u{feff}Timestamp,Fz,Cz\n0.000,1.0,2.0\n0.004,1.5,2.5\n").unwrap();
        assert_eq!(buffer.channel_names()[0], "Fz");
        assert!((buffer.sample_rate_hz() - 250.0).abs() < 1e-6);
    }
    #[test]
    fn bad_rows_report_their_line() {
        let err = load_text("Timestamp,Fz\n0.000,1.0\n0.004,x\n").unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 3, .. }), "{err}");
        let err = load_text("Timestamp,Fz,Cz\n0.000,1.0,2.0\n0.004,1.5\n").unwrap_err();
        assert!(matches!(err, IngestError::Malformed { line: 3, .. }), "{err}");
        assert!(matches!(load_text(""), Err(IngestError::Empty { .. })));
    }
    #[test]
    fn sample_rate_comes_from_median_step() {
        let ts = [0.0, 0.004, 0.008, 0.012, 0.5];
        assert!((infer_sample_rate(&ts).unwrap() - 250.0).abs() < 1e-6);
        assert!(infer_sample_rate(&[1.0]).is_none());
    }
}
