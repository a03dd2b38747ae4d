//! Structured error types for clocklab.
//!
//! All fallible public APIs return `Result<T, SyncError>`. Every failure
//! of the synchronization algorithms themselves is an invalid-input
//! condition; the only other kind is I/O when loading a config file.

use thiserror::Error;

use crate::time::ClockReading;

/// Broad classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied values the computation cannot accept.
    InvalidInput,
    /// Reading configuration from disk failed.
    Io,
}

/// The top-level error type for clocklab.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Berkeley ──────────────────────────────────────────

    /// Berkeley averaging needs at least one participant clock.
    #[error("invalid input: participant set is empty")]
    EmptyParticipants,

    /// An offset or corrected reading does not fit a clock reading.
    #[error("invalid input: {what} is out of range for a clock reading")]
    ReadingOutOfRange { what: &'static str },

    // ── Cristian ──────────────────────────────────────────

    /// The response was received before the request was sent.
    #[error("invalid input: negative round trip (request at {request}, response at {response})")]
    NegativeRoundTrip {
        request: ClockReading,
        response: ClockReading,
    },

    /// No completed round-trip samples to estimate from.
    #[error("invalid input: no round-trip samples")]
    NoSamples,

    // ── Config ────────────────────────────────────────────

    /// A configuration file or value was rejected.
    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::InvalidInput,
        }
    }

    /// Shorthand for `kind() == ErrorKind::InvalidInput`.
    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

/// Convenience alias for `Result<T, SyncError>`.
pub type SyncResult<T> = Result<T, SyncError>;
