use thiserror::Error;
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("channel name `{0}` appears more than once")]
    DuplicateChannel(String),
    #[error("unknown channel `{0}`")]
    UnknownChannel(String),
    #[error("recording has no channels")]
    NoChannels,
    #[error("need at least {needed} samples, got {actual}")]
    TooFewSamples { needed: usize, actual: usize },
    #[error("need at least {needed} channels, got {actual}")]
    TooFewChannels { needed: usize, actual: usize },
    #[error("cutoff {cutoff_hz} Hz must lie strictly between 0 and Nyquist ({nyquist_hz} Hz)")]
    CutoffOutOfRange { cutoff_hz: f64, nyquist_hz: f64 },
    #[error("no EEG channels left after channel selection")]
    NoEegChannels,
    #[error("numerical failure: {0}")]
    Numerical(String),
}
