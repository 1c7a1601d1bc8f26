//! Crate-level error type.

use thiserror::Error;

/// Errors surfaced by the parsers, the voice controllers and the CLI plumbing.
#[derive(Debug, Error)]
pub enum LensError {
    /// Input text exceeded the configured parse limit.
    #[error("input is {len} bytes, limit is {max}")]
    InputTooLarge { len: usize, max: usize },

    /// The speech endpoint replied with a non-2xx status.
    #[error("speech synthesis failed with HTTP {status}: {detail}")]
    Synthesis { status: u16, detail: String },

    /// Nothing left to speak once markdown was stripped.
    #[error("no speakable text")]
    NothingToSpeak,

    /// The recognizer reported an error event.
    #[error("speech recognition error: {0}")]
    Recognition(String),

    /// Microphone access was refused.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// A required capability (recognizer, audio output) is missing.
    #[error("{0} is not supported in this environment")]
    Unsupported(String),

    /// The audio sink failed to load or play a clip.
    #[error("playback error: {0}")]
    Playback(String),

    /// Config file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, LensError>;
