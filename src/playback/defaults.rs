//! Default values for playback
//!
//! Timing constants the synchronizer falls back to when no
//! [`PlaybackConfig`](super::PlaybackConfig) overrides them.

/// Default tempo in beats per minute, used when a score carries none
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Delay before the first note so the audio and visual engines can arm
pub const DEFAULT_LEAD_IN_SECONDS: f64 = 0.2;

/// Extra time after the last note ends before the session finalizes
pub const DEFAULT_TRAILING_MARGIN_SECONDS: f64 = 0.5;

/// Measures processed by note extraction before giving up on the rest
pub const DEFAULT_MAX_MEASURES: usize = 1000;

/// Per-note duration used by fixed-duration extraction (0.5s at 120 BPM)
pub const DEFAULT_FIXED_NOTE_DURATION_BEATS: f64 = 1.0;

/// Offset from a rendered tickable's half-tone value to its MIDI number
pub const HALF_TONE_MIDI_OFFSET: i32 = 12;
