// src/types.rs
use std::fmt;
use crate::engine::AnalysisOutput;
use crate::preprocessing::{ProcessingLog, Strategy};
/// Which preprocessing strategies an analysis runs.
#[derive(PartialEq, Eq, Clone, Copy, Debug, clap::ValueEnum)]
pub enum Method {
    Traditional,
    Gedai,
    Both,
}
impl Method {
    pub fn strategies(&self) -> Vec<Strategy> {
        match self {
            Method::Traditional => vec![Strategy::Traditional],
            Method::Gedai => vec![Strategy::Gedai],
            Method::Both => Strategy::ALL.to_vec(),
        }
    }
}
impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Traditional => f.write_str("Traditional"),
            Method::Gedai => f.write_str("GEDAI"),
            Method::Both => f.write_str("Both"),
        }
    }
}
// Messages the analysis worker sends back to its caller
#[derive(Debug)]
pub enum AnalysisMessage {
    /// Percentages never decrease within one analysis.
    Progress { percent: u8, message: String },
    Finished(Box<AnalysisOutput>),
    Failed(String),
    /// Logs of whatever stages ran before cancellation.
    Cancelled(Vec<ProcessingLog>),
}
impl AnalysisMessage {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisMessage::Progress { .. })
    }
}
