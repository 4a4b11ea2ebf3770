//! Error taxonomy shared by the pipeline, the job child and the runner.
//!
//! [`ErrorKind`] is the stable, serialisable name of a failure.  It crosses
//! the process boundary twice: as the child's exit code (see
//! [`ErrorKind::exit_code`]) and as the `error` field of the JSON response.
//!
//! "No audio track" and "empty audio" are deliberately absent: both end in a
//! successful job with an empty transcript.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Terminal failure classes of a transcription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input video is missing or zero bytes.
    InvalidInput,
    /// Neither ffmpeg nor the demux fallback can be used.
    ConfigurationError,
    /// An extractor was available but could not produce audio.
    ExtractionFailed,
    /// The speech-to-text engine raised a fault.
    TranscriptionFailed,
    /// The transcript could not be written.
    OutputWriteFailed,
    /// The job exceeded its wall-clock budget and was killed.
    Timeout,
    /// The job reported success but its transcript is not on disk.
    OutputMissing,
    /// The job process died with an exit code outside the taxonomy
    /// (signal, panic, usage error).
    JobCrashed,
    /// The runner itself failed (spawn error, scratch file I/O).
    Internal,
}

impl ErrorKind {
    /// Exit code used by the `job` child process for this kind.
    ///
    /// Only kinds the child can produce have a code; runner-side kinds
    /// return `None`.
    pub fn exit_code(self) -> Option<i32> {
        match self {
            ErrorKind::InvalidInput => Some(2),
            ErrorKind::ConfigurationError => Some(3),
            ErrorKind::ExtractionFailed => Some(4),
            ErrorKind::TranscriptionFailed => Some(5),
            ErrorKind::OutputWriteFailed => Some(6),
            ErrorKind::Timeout
            | ErrorKind::OutputMissing
            | ErrorKind::JobCrashed
            | ErrorKind::Internal => None,
        }
    }

    /// Inverse of [`exit_code`](Self::exit_code).
    ///
    /// ```
    /// use video_transcriber::error::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::from_exit_code(5), Some(ErrorKind::TranscriptionFailed));
    /// assert_eq!(ErrorKind::from_exit_code(101), None);
    /// ```
    pub fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(ErrorKind::InvalidInput),
            3 => Some(ErrorKind::ConfigurationError),
            4 => Some(ErrorKind::ExtractionFailed),
            5 => Some(ErrorKind::TranscriptionFailed),
            6 => Some(ErrorKind::OutputWriteFailed),
            _ => None,
        }
    }

    /// Stable name, used verbatim in the JSON `error` field.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::TranscriptionFailed => "TranscriptionFailed",
            ErrorKind::OutputWriteFailed => "OutputWriteFailed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::OutputMissing => "OutputMissing",
            ErrorKind::JobCrashed => "JobCrashed",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobError
// ---------------------------------------------------------------------------

/// A failed job: the taxonomy kind plus a human-readable reason.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExtractionFailed, message)
    }

    pub fn transcription(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TranscriptionFailed, message)
    }

    pub fn output_write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutputWriteFailed, message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
