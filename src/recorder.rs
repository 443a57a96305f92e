use std::path::Path;
use crate::signal::SignalBuffer;
/// Write a buffer in the layout `CsvSource` reads back: `Timestamp,<channels...>`,
/// one row per sample. `scale` converts volts to file units (`1e6` for microvolts).
pub fn write_csv(buffer: &SignalBuffer, path: &Path, scale: f64) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(
        std::iter::once("Timestamp").chain(buffer.channel_names().iter().map(String::as_str)),
    )?;
    let dt = 1.0 / buffer.sample_rate_hz();
    let mut record = Vec::with_capacity(buffer.n_channels() + 1);
    for (i, column) in buffer.data().columns().into_iter().enumerate() {
        record.clear();
        record.push(format!("{:.6}", i as f64 * dt));
        record.extend(column.iter().map(|value| (value * scale).to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::info!(
        "Saved {} channels x {} samples to {}",
        buffer.n_channels(),
        buffer.n_samples(),
        path.display()
    );
    Ok(())
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{CsvSource, RecordingSource};
    #[test]
    fn written_csv_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.csv");
        let rows = vec![
            (0..50).map(|i| i as f64 * 1e-6).collect::<Vec<_>>(),
            (0..50).map(|i| -(i as f64) * 2e-6).collect::<Vec<_>>(),
        ];
        let buffer =
            SignalBuffer::from_rows(vec!["Fz".into(), "Cz".into()], 250.0, rows).unwrap();
        write_csv(&buffer, &path, 1e6).unwrap();
        let loaded = CsvSource::new(&path).with_scale(1e-6).load().unwrap();
        assert_eq!(loaded.channel_names(), buffer.channel_names());
        assert!((loaded.sample_rate_hz() - 250.0).abs() < 0.5);
        for (a, b) in loaded.data().iter().zip(buffer.data().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    #[test]
    fn channel_names_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let rows = vec![vec![1e-6, 2e-6, 3e-6], vec![0.0, -1e-6, 0.0]];
        let buffer =
            SignalBuffer::from_rows(vec!["Fz, frontal".into(), "Cz".into()], 100.0, rows).unwrap();
        write_csv(&buffer, &path, 1e6).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Timestamp,\"Fz, frontal\",Cz\n"));
        let loaded = CsvSource::new(&path).with_scale(1e-6).load().unwrap();
        assert_eq!(loaded.channel_names()[0], "Fz, frontal");
    }
}
