//! Keeps one playback session at a time over a shared synthesizer and cursor

use std::rc::Rc;

use super::collaborators::{SharedCursor, SharedSynthesizer};
use super::config::PlaybackConfig;
use super::schedule::build_schedule;
use super::session::{PlaybackSession, SessionState};
use super::timers::TimerHost;
use crate::error::PlaybackError;
use crate::models::{NoteEvent, Tempo};

/// Owner of the synthesizer, cursor and timer host for one score view
///
/// Scheduling a new session cancels the previous one first, so two sessions
/// never drive the cursor together. Dropping the synchronizer cancels
/// whatever is still playing.
pub struct PlaybackSynchronizer {
    config: PlaybackConfig,
    synth: SharedSynthesizer,
    cursor: SharedCursor,
    host: Rc<dyn TimerHost>,
    active: Option<PlaybackSession>,
    next_session_id: u64,
}

impl PlaybackSynchronizer {
    pub fn new(synth: SharedSynthesizer, cursor: SharedCursor, host: Rc<dyn TimerHost>) -> Self {
        Self::with_config(PlaybackConfig::default(), synth, cursor, host)
    }

    pub fn with_config(
        config: PlaybackConfig,
        synth: SharedSynthesizer,
        cursor: SharedCursor,
        host: Rc<dyn TimerHost>,
    ) -> Self {
        Self {
            config,
            synth,
            cursor,
            host,
            active: None,
            next_session_id: 1,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Build a session for `notes` at `tempo`
    ///
    /// An invalid tempo is rejected before anything else happens, leaving a
    /// running session untouched. Otherwise the previous session is
    /// cancelled and the new one becomes active (in `Created` state).
    pub fn schedule(
        &mut self,
        notes: &[NoteEvent],
        tempo: Tempo,
    ) -> Result<PlaybackSession, PlaybackError> {
        tempo.validate()?;
        self.cancel_active();

        let schedule = build_schedule(notes, tempo, self.config.lead_in_seconds)?;
        let id = self.next_session_id;
        self.next_session_id += 1;

        log::debug!(
            "Scheduled session {}: {} notes at {} BPM",
            id,
            schedule.len(),
            tempo.beats_per_minute
        );

        let session = PlaybackSession::new(
            id,
            schedule,
            self.config.trailing_margin_seconds,
            self.synth.clone(),
            self.cursor.clone(),
            self.host.clone(),
        );
        self.active = Some(session.clone());
        Ok(session)
    }

    /// Schedule and start in one step
    pub fn play(
        &mut self,
        notes: &[NoteEvent],
        tempo: Tempo,
    ) -> Result<PlaybackSession, PlaybackError> {
        let session = self.schedule(notes, tempo)?;
        session.start()?;
        Ok(session)
    }

    /// Cancel the active session, if any
    pub fn cancel_active(&mut self) {
        if let Some(session) = self.active.take() {
            session.cancel();
        }
    }

    pub fn active_session(&self) -> Option<&PlaybackSession> {
        self.active.as_ref()
    }

    /// State of the most recent session, if any
    pub fn state(&self) -> Option<SessionState> {
        self.active.as_ref().map(PlaybackSession::state)
    }

    /// Whether a session is currently sounding
    pub fn is_playing(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |s| s.state() == SessionState::Running)
    }

    pub fn synthesizer_ready(&self) -> bool {
        self.synth.try_borrow().map(|s| s.is_ready()).unwrap_or(false)
    }
}

impl Drop for PlaybackSynchronizer {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::CollaboratorError;
    use crate::playback::collaborators::{Cursor, Synthesizer};
    use crate::playback::timers::ManualClock;

    struct Silent;

    impl Synthesizer for Silent {
        fn is_ready(&self) -> bool {
            true
        }

        fn trigger_note(&mut self, _: &str, _: f64, _: f64) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    impl Cursor for Silent {
        fn show(&mut self) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn hide(&mut self) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn reset(&mut self) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn advance(&mut self) -> Result<(), CollaboratorError> {
            Ok(())
        }
        fn has_reached_end(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_tracks_latest_session() {
        let clock = ManualClock::new();
        let mut sync = PlaybackSynchronizer::new(
            Rc::new(RefCell::new(Silent)),
            Rc::new(RefCell::new(Silent)),
            Rc::new(clock.clone()),
        );
        assert_eq!(sync.state(), None);
        assert!(sync.synthesizer_ready());

        let notes = vec![NoteEvent::new("C4", 0.0, 1.0).unwrap()];
        let first = sync.play(&notes, Tempo::new(120.0)).unwrap();
        let second = sync.play(&notes, Tempo::new(90.0)).unwrap();

        assert_eq!(first.id() + 1, second.id());
        assert_eq!(sync.state(), Some(SessionState::Running));

        clock.run_until_idle();
        assert_eq!(sync.state(), Some(SessionState::Terminal));
        assert!(!sync.is_playing());
    }
}
