use std::fmt;
use serde::Serialize;
/// Pipeline states, in the order every run walks through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PipelineStage {
    Init,
    ChannelSelect,
    Reference,
    Bandpass,
    Notch,
    ArtifactStage,
    Reconstruction,
    Done,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Completed,
    /// The stage failed; the buffer passed through unchanged.
    Degraded,
    /// The stage had nothing to do (missing capability, nothing excluded).
    Skipped,
}
/// One numbered stage of a run with its human-readable detail lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepLog {
    pub index: usize,
    pub total: usize,
    pub stage: PipelineStage,
    pub title: String,
    pub outcome: StepOutcome,
    pub details: Vec<String>,
}
impl StepLog {
    pub fn new(index: usize, total: usize, stage: PipelineStage, title: impl Into<String>) -> Self {
        Self {
            index,
            total,
            stage,
            title: title.into(),
            outcome: StepOutcome::Completed,
            details: Vec::new(),
        }
    }
    pub fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::debug!("[{}/{}] {}", self.index, self.total, line);
        self.details.push(line);
    }
    /// Record a stage failure; the caller keeps the previous buffer.
    pub fn degrade(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::warn!("[{}/{}] {}: {}", self.index, self.total, self.title, line);
        self.outcome = StepOutcome::Degraded;
        self.details.push(line);
    }
    pub fn skip(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!("[{}/{}] {}: {}", self.index, self.total, self.title, line);
        self.outcome = StepOutcome::Skipped;
        self.details.push(line);
    }
}
/// Ordered record of one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessingLog {
    pub heading: String,
    pub steps: Vec<StepLog>,
}
impl ProcessingLog {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            steps: Vec::new(),
        }
    }
    pub fn push(&mut self, step: StepLog) {
        self.steps.push(step);
    }
    pub fn degraded_steps(&self) -> impl Iterator<Item = &StepLog> {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Degraded)
    }
}
impl fmt::Display for ProcessingLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{}", self.heading)?;
        writeln!(f, "{rule}")?;
        for step in &self.steps {
            writeln!(f)?;
            writeln!(f, "[{}/{}] {}...", step.index, step.total, step.title)?;
            for line in &step.details {
                writeln!(f, "  {line}")?;
            }
        }
        write!(f, "{rule}")
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn renders_numbered_steps() {
        let mut log = ProcessingLog::new("GEDAI PREPROCESSING");
        let mut step = StepLog::new(1, 2, PipelineStage::ChannelSelect, "Selecting EEG channels");
        step.note("Selected 8 EEG channels");
        log.push(step);
        let mut step = StepLog::new(2, 2, PipelineStage::Reference, "Setting average reference");
        step.degrade("no channels");
        log.push(step);
        let text = log.to_string();
        assert!(text.contains("[1/2] Selecting EEG channels...\n  Selected 8 EEG channels"));
        assert_eq!(log.degraded_steps().count(), 1);
    }
}
