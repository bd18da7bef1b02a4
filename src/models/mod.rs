//! Models for score playback
//!
//! Note events in beats, tempo, the seconds-based schedule entries derived
//! from them, and pitch-name helpers.

pub mod note;
pub mod pitch;

pub use note::{NoteEvent, ScheduledEvent, Tempo};
