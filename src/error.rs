//! Synchronization error types.
//!
//! Provides unified error handling with actionable context for debugging.
//! Only [`Error::EmptyInput`] and [`Error::Cancelled`] escape a synchronization
//! call; every other condition degrades output confidence instead.

use thiserror::Error;

/// Library result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types with specific context for actionable debugging
#[derive(Debug, Error)]
pub enum Error {
    /// IO error with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// The underlying IO error.
        source: std::io::Error,
        /// File path where the error occurred, if known.
        path: Option<std::path::PathBuf>,
    },

    /// Network error (connection, timeout, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Transcription service error with status context
    #[error("Transcription service error: {message}")]
    Transcription {
        /// Human-readable error description.
        message: String,
        /// HTTP status code, if from an HTTP response.
        status: Option<u16>,
        /// Actionable suggestion for resolving the error.
        hint: Option<&'static str>,
    },

    /// Configuration error with guidance
    #[error("Configuration error: {message}. {hint}")]
    Config {
        /// Description of the configuration problem.
        message: String,
        /// Actionable guidance for fixing the issue.
        hint: &'static str,
    },

    /// File parsing error
    #[error("Parse error in {file:?}: {message}")]
    Parse {
        /// File that failed to parse, if known.
        file: Option<std::path::PathBuf>,
        /// Description of the parse failure.
        message: String,
    },

    /// Audio could not be decoded
    #[error("Audio decode error: {0}")]
    Audio(String),

    /// The signal-processing capability is missing or failed
    #[error("Feature extraction unavailable: {0}")]
    FeatureExtractionUnavailable(String),

    /// The transcript could not be obtained (service error, timeout, auth)
    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    /// No non-empty lyric lines were supplied
    #[error("No non-empty lyric lines to synchronize")]
    EmptyInput,

    /// Audio duration could not be determined
    #[error("Audio duration could not be determined")]
    DurationUnknown,

    /// The calling job was cancelled
    #[error("Synchronization cancelled")]
    Cancelled,

    /// Generic message error (escape hatch)
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an IO error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<std::path::PathBuf>>) -> Self {
        Self::Io { source, path: path.into() }
    }

    /// Create a transcription error without HTTP status
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription {
            message: message.into(),
            status: None,
            hint: None,
        }
    }

    /// Create a transcription error with HTTP status
    pub fn transcription_status(message: impl Into<String>, status: u16) -> Self {
        let hint = match status {
            401 => Some("Check the LYRICSYNC_TRANSCRIBE_KEY environment variable"),
            403 => Some("Your API key may lack access to word-level timestamps"),
            404 => Some("Check LYRICSYNC_TRANSCRIBE_URL points at the transcription endpoint"),
            413 => Some("Audio payload too large - trim or re-encode the file"),
            429 => Some("Rate limited - wait a moment and try again"),
            500..=599 => Some("Transcription server error - try again later"),
            _ => None,
        };
        Self::Transcription {
            message: message.into(),
            status: Some(status),
            hint,
        }
    }

    /// Create a config error with actionable hint
    pub fn config(message: impl Into<String>, hint: &'static str) -> Self {
        Self::Config { message: message.into(), hint }
    }

    /// Create a parse error with file context
    pub fn parse(message: impl Into<String>, file: impl Into<Option<std::path::PathBuf>>) -> Self {
        Self::Parse { file: file.into(), message: message.into() }
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io { source: e, path: None }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Msg(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Msg(s.to_string())
    }
}
