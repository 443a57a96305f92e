// src/signal/mod.rs
pub mod buffer;
pub mod error;
pub mod filter;
pub mod source;
pub mod spectrum;
pub mod stats;
pub use buffer::{ChannelKind, SignalBuffer};
pub use error::SignalError;
pub use filter::{FilterChain, FilterKind};
pub use source::{CsvSource, InMemorySource, IngestError, RecordingSource};
pub use spectrum::{PowerSpectrum, SpectrumBuilder};
