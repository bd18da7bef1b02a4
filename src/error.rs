//! Error types for score playback
//!
//! Two families: `PlaybackError` for scheduling and session control, and
//! `ScoreError` for turning MusicXML into note events. Failures raised by the
//! external synthesizer or cursor are carried as `CollaboratorError` and never
//! leave a playback session (they are logged and skipped).

use thiserror::Error;

/// Errors surfaced by the playback synchronizer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Tempo must be a finite, strictly positive BPM
    #[error("Invalid tempo: {0} BPM (must be > 0)")]
    InvalidTempo(f64),

    /// Synthesizer voices are not loaded yet; playback did not start
    #[error("Synthesizer is not ready yet, try again in a moment")]
    NotReady,

    /// A note event with an out-of-range start or duration
    #[error("Invalid note '{pitch}': {reason}")]
    InvalidNote { pitch: String, reason: String },

    /// Playback configuration failed validation or could not be read
    #[error("Invalid playback config: {0}")]
    InvalidConfig(String),
}

/// Errors produced while reading a score
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// XML is malformed or not a MusicXML document we can read
    #[error("Score parse error: {0}")]
    ParseError(String),

    /// Document declares entities; rejected before parsing
    #[error("Unsafe XML: entity declarations are not allowed")]
    UnsafeXml,

    /// An element holds a value we cannot interpret
    #[error("Invalid value '{value}' for element '{element}'")]
    InvalidValue { element: String, value: String },
}

/// Failure reported by a synthesizer or cursor call
///
/// Sessions log these as playback callback errors and carry on with the
/// remaining schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl From<&str> for CollaboratorError {
    fn from(msg: &str) -> Self {
        CollaboratorError(msg.to_string())
    }
}

impl From<String> for CollaboratorError {
    fn from(msg: String) -> Self {
        CollaboratorError(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PlaybackError::InvalidTempo(0.0).to_string(),
            "Invalid tempo: 0 BPM (must be > 0)"
        );
        assert_eq!(
            ScoreError::UnsafeXml.to_string(),
            "Unsafe XML: entity declarations are not allowed"
        );
        assert_eq!(CollaboratorError::from("boom").to_string(), "boom");
    }
}
