//! # Playback
//!
//! Turns note events and a tempo into synthesizer triggers and cursor steps
//! that fire in lock-step, with safe start/cancel at any point.
//!
//! ## Sub-modules
//! - `collaborators` - [`Synthesizer`] and [`Cursor`] traits (the external systems)
//! - `timers` - [`TimerHost`] trait and the [`ManualClock`] virtual clock
//! - `schedule` - beat → seconds conversion
//! - `session` - [`PlaybackSession`] state machine
//! - `synchronizer` - [`PlaybackSynchronizer`], one active session at a time
//! - `config` / `defaults` - timing knobs
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use score_playback::playback::*;
//! use score_playback::{CollaboratorError, NoteEvent, Tempo};
//!
//! struct Piano;
//! impl Synthesizer for Piano {
//!     fn is_ready(&self) -> bool { true }
//!     fn trigger_note(&mut self, _: &str, _: f64, _: f64) -> Result<(), CollaboratorError> { Ok(()) }
//! }
//!
//! struct NoCursor;
//! impl Cursor for NoCursor {
//!     fn show(&mut self) -> Result<(), CollaboratorError> { Ok(()) }
//!     fn hide(&mut self) -> Result<(), CollaboratorError> { Ok(()) }
//!     fn reset(&mut self) -> Result<(), CollaboratorError> { Ok(()) }
//!     fn advance(&mut self) -> Result<(), CollaboratorError> { Ok(()) }
//!     fn has_reached_end(&self) -> bool { false }
//! }
//!
//! let clock = ManualClock::new();
//! let mut sync = PlaybackSynchronizer::new(
//!     Rc::new(RefCell::new(Piano)),
//!     Rc::new(RefCell::new(NoCursor)),
//!     Rc::new(clock.clone()),
//! );
//!
//! let notes = vec![NoteEvent::new("C4", 0.0, 1.0).unwrap()];
//! let session = sync.play(&notes, Tempo::new(120.0)).unwrap();
//! clock.run_until_idle();
//! assert_eq!(session.state(), SessionState::Terminal);
//! ```

pub mod collaborators;
pub mod config;
pub mod defaults;
pub mod schedule;
pub mod session;
pub mod synchronizer;
pub mod timers;

pub use collaborators::{Cursor, SharedCursor, SharedSynthesizer, Synthesizer};
pub use config::PlaybackConfig;
pub use schedule::{build_schedule, schedule_end_seconds};
pub use session::{PlaybackSession, SessionState, StateObserver};
pub use synchronizer::PlaybackSynchronizer;
pub use timers::{ManualClock, TimerCallback, TimerHost, TimerId};
