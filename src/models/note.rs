//! Note events, tempo, and the derived playback schedule entries

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// A single note as read from a score
///
/// Immutable once constructed. Construction validates the timing so every
/// `NoteEvent` in the crate has `start_beat >= 0` and `duration_beats > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNoteEvent", rename_all = "camelCase")]
pub struct NoteEvent {
    pitch: String,
    start_beat: f64,
    duration_beats: f64,
}

/// Unvalidated wire form of a note event (JS objects, JSON)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNoteEvent {
    pitch: String,
    start_beat: f64,
    duration_beats: f64,
}

impl TryFrom<RawNoteEvent> for NoteEvent {
    type Error = PlaybackError;

    fn try_from(raw: RawNoteEvent) -> Result<Self, Self::Error> {
        NoteEvent::new(raw.pitch, raw.start_beat, raw.duration_beats)
    }
}

impl NoteEvent {
    pub fn new(
        pitch: impl Into<String>,
        start_beat: f64,
        duration_beats: f64,
    ) -> Result<Self, PlaybackError> {
        let pitch = pitch.into();

        if pitch.trim().is_empty() {
            return Err(PlaybackError::InvalidNote {
                pitch,
                reason: "pitch is empty".to_string(),
            });
        }
        if !start_beat.is_finite() || start_beat < 0.0 {
            return Err(PlaybackError::InvalidNote {
                pitch,
                reason: format!("start beat {} must be >= 0", start_beat),
            });
        }
        if !duration_beats.is_finite() || duration_beats <= 0.0 {
            return Err(PlaybackError::InvalidNote {
                pitch,
                reason: format!("duration {} beats must be > 0", duration_beats),
            });
        }

        Ok(Self {
            pitch,
            start_beat,
            duration_beats,
        })
    }

    pub fn pitch(&self) -> &str {
        &self.pitch
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn duration_beats(&self) -> f64 {
        self.duration_beats
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }
}

/// Tempo for a whole piece (no mid-piece changes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tempo {
    pub beats_per_minute: f64,
}

impl Tempo {
    pub fn new(beats_per_minute: f64) -> Self {
        Self { beats_per_minute }
    }

    /// Reject zero, negative, and non-finite BPM values, and values so small
    /// a beat would last forever
    pub fn validate(&self) -> Result<(), PlaybackError> {
        let bpm = self.beats_per_minute;
        if bpm.is_finite() && bpm > 0.0 && (60.0 / bpm).is_finite() {
            Ok(())
        } else {
            Err(PlaybackError::InvalidTempo(self.beats_per_minute))
        }
    }

    /// Length of `beats` in seconds at this tempo
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * 60.0 / self.beats_per_minute
    }
}

/// A note placed on the session timeline
///
/// `start_time_seconds` is relative to session start and already includes
/// the lead-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub pitch: String,
    pub start_time_seconds: f64,
    pub duration_seconds: f64,
}

impl ScheduledEvent {
    pub fn from_note(note: &NoteEvent, tempo: Tempo, lead_in_seconds: f64) -> Self {
        Self {
            pitch: note.pitch().to_string(),
            start_time_seconds: tempo.beats_to_seconds(note.start_beat()) + lead_in_seconds,
            duration_seconds: tempo.beats_to_seconds(note.duration_beats()),
        }
    }

    pub fn end_time_seconds(&self) -> f64 {
        self.start_time_seconds + self.duration_seconds
    }
}
