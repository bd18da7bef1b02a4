// Recording fakes for the synthesizer and cursor
//
// Both append to one shared call log tagged with the virtual time, so tests
// can check ordering across the two collaborators.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use score_playback::playback::{Cursor, ManualClock, PlaybackSynchronizer, Synthesizer};
use score_playback::CollaboratorError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Trigger {
        pitch: String,
        duration: f64,
        at_time: f64,
    },
    Show,
    Hide,
    Reset,
    Advance,
}

pub type CallLog = Rc<RefCell<Vec<(f64, Call)>>>;

pub struct RecordingSynth {
    pub ready: bool,
    pub fail_on: Option<String>,
    clock: ManualClock,
    log: CallLog,
}

impl Synthesizer for RecordingSynth {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn trigger_note(
        &mut self,
        pitch: &str,
        duration_seconds: f64,
        at_time: f64,
    ) -> Result<(), CollaboratorError> {
        self.log.borrow_mut().push((
            self.clock.now(),
            Call::Trigger {
                pitch: pitch.to_string(),
                duration: duration_seconds,
                at_time,
            },
        ));
        if self.fail_on.as_deref() == Some(pitch) {
            return Err(CollaboratorError::from("sample missing"));
        }
        Ok(())
    }
}

pub struct RecordingCursor {
    /// Reports the end once this many advances have happened
    pub end_after: Option<usize>,
    /// Makes `show` and `advance` fail after recording the call
    pub fail_steps: bool,
    pub advances: usize,
    clock: ManualClock,
    log: CallLog,
}

impl RecordingCursor {
    fn record(&self, call: Call) -> Result<(), CollaboratorError> {
        self.log.borrow_mut().push((self.clock.now(), call));
        Ok(())
    }

    fn step_result(&self) -> Result<(), CollaboratorError> {
        if self.fail_steps {
            return Err(CollaboratorError::from("cursor detached"));
        }
        Ok(())
    }
}

impl Cursor for RecordingCursor {
    fn show(&mut self) -> Result<(), CollaboratorError> {
        self.record(Call::Show)?;
        self.step_result()
    }

    fn hide(&mut self) -> Result<(), CollaboratorError> {
        self.record(Call::Hide)
    }

    fn reset(&mut self) -> Result<(), CollaboratorError> {
        self.advances = 0;
        self.record(Call::Reset)
    }

    fn advance(&mut self) -> Result<(), CollaboratorError> {
        self.advances += 1;
        self.record(Call::Advance)?;
        self.step_result()
    }

    fn has_reached_end(&self) -> bool {
        self.end_after.map_or(false, |end| self.advances >= end)
    }
}

pub struct Rig {
    pub clock: ManualClock,
    pub log: CallLog,
    pub synth: Rc<RefCell<RecordingSynth>>,
    pub cursor: Rc<RefCell<RecordingCursor>>,
    pub sync: PlaybackSynchronizer,
}

impl Rig {
    pub fn new() -> Self {
        let clock = ManualClock::new();
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let synth = Rc::new(RefCell::new(RecordingSynth {
            ready: true,
            fail_on: None,
            clock: clock.clone(),
            log: log.clone(),
        }));
        let cursor = Rc::new(RefCell::new(RecordingCursor {
            end_after: None,
            fail_steps: false,
            advances: 0,
            clock: clock.clone(),
            log: log.clone(),
        }));
        let sync = PlaybackSynchronizer::new(synth.clone(), cursor.clone(), Rc::new(clock.clone()));
        Rig {
            clock,
            log,
            synth,
            cursor,
            sync,
        }
    }

    pub fn calls(&self) -> Vec<(f64, Call)> {
        self.log.borrow().clone()
    }

    pub fn triggered_pitches(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|(_, call)| match call {
                Call::Trigger { pitch, .. } => Some(pitch.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

pub fn trigger(pitch: &str, duration: f64, at_time: f64) -> Call {
    Call::Trigger {
        pitch: pitch.to_string(),
        duration,
        at_time,
    }
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Compare call logs allowing float noise in times
pub fn assert_calls(actual: &[(f64, Call)], expected: &[(f64, Call)]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "call count differs:\nactual: {:?}\nexpected: {:?}",
        actual,
        expected
    );
    for ((at, call), (want_at, want_call)) in actual.iter().zip(expected) {
        assert!(approx_eq(*at, *want_at), "{:?} at {} (wanted {})", call, at, want_at);
        match (call, want_call) {
            (
                Call::Trigger {
                    pitch,
                    duration,
                    at_time,
                },
                Call::Trigger {
                    pitch: want_pitch,
                    duration: want_duration,
                    at_time: want_at_time,
                },
            ) => {
                assert_eq!(pitch, want_pitch);
                assert!(approx_eq(*duration, *want_duration), "duration {}", duration);
                assert!(approx_eq(*at_time, *want_at_time), "atTime {}", at_time);
            }
            _ => assert_eq!(call, want_call),
        }
    }
}
