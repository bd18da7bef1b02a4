//! Beat → seconds conversion for a whole piece

use crate::error::PlaybackError;
use crate::models::{NoteEvent, ScheduledEvent, Tempo};

/// Place every note on the session timeline
///
/// Output is ordered by start time; notes sharing a start beat keep their
/// input order so chords fire together in the order they were written.
pub fn build_schedule(
    notes: &[NoteEvent],
    tempo: Tempo,
    lead_in_seconds: f64,
) -> Result<Vec<ScheduledEvent>, PlaybackError> {
    tempo.validate()?;

    let mut ordered: Vec<&NoteEvent> = notes.iter().collect();
    ordered.sort_by(|a, b| a.start_beat().total_cmp(&b.start_beat()));

    Ok(ordered
        .into_iter()
        .map(|note| ScheduledEvent::from_note(note, tempo, lead_in_seconds))
        .collect())
}

/// End time of the last event in playback order (lead-in included), or 0
/// when empty
pub fn schedule_end_seconds(schedule: &[ScheduledEvent]) -> f64 {
    schedule
        .last()
        .map_or(0.0, ScheduledEvent::end_time_seconds)
}
