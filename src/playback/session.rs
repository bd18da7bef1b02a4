//! One playback run
//!
//! A session owns its schedule, the timers it registered, and (while it is
//! running) the cursor. States:
//!
//! ```text
//! Created ──start──▶ Running ──last note + margin──▶ Finalizing ──▶ Terminal
//!    │                  │
//!    └──────cancel──────┴──▶ Cancelled
//! ```
//!
//! Nothing leaves `Terminal` or `Cancelled`. Every timer callback re-checks
//! that the session is still `Running` before touching the synthesizer or
//! cursor, so nothing from a cancelled session can fire even if its host
//! could not withdraw a timer in time.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde_repr::{Deserialize_repr, Serialize_repr};
use wasm_bindgen::prelude::*;

use super::collaborators::{cursor_at_end, cursor_call, SharedCursor, SharedSynthesizer};
use super::schedule::schedule_end_seconds;
use super::timers::{TimerHost, TimerId};
use crate::error::{CollaboratorError, PlaybackError};
use crate::models::ScheduledEvent;

/// Lifecycle of a playback session
#[wasm_bindgen]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
pub enum SessionState {
    Created = 0,
    Running = 1,
    Finalizing = 2,
    Terminal = 3,
    Cancelled = 4,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Terminal | SessionState::Cancelled)
    }
}

pub type StateObserver = Box<dyn FnMut(SessionState)>;

struct SessionInner {
    id: u64,
    state: SessionState,
    schedule: Vec<ScheduledEvent>,
    trailing_margin_seconds: f64,
    cursor_shown: bool,
    timers: Vec<TimerId>,
    synth: SharedSynthesizer,
    cursor: SharedCursor,
    host: Rc<dyn TimerHost>,
    observers: Vec<StateObserver>,
    // States raised while observers run, delivered in order afterwards
    notices: VecDeque<SessionState>,
    notifying: bool,
}

/// Handle to a playback session
///
/// Cheap to clone; all clones control the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Rc<RefCell<SessionInner>>,
}

impl PlaybackSession {
    pub(crate) fn new(
        id: u64,
        schedule: Vec<ScheduledEvent>,
        trailing_margin_seconds: f64,
        synth: SharedSynthesizer,
        cursor: SharedCursor,
        host: Rc<dyn TimerHost>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SessionInner {
                id,
                state: SessionState::Created,
                schedule,
                trailing_margin_seconds,
                cursor_shown: false,
                timers: Vec::new(),
                synth,
                cursor,
                host,
                observers: Vec::new(),
                notices: VecDeque::new(),
                notifying: false,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    pub fn state(&self) -> SessionState {
        self.inner.borrow().state
    }

    /// Created or Running: the session still has work to do or to cancel
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Created | SessionState::Running
        )
    }

    pub fn schedule(&self) -> Vec<ScheduledEvent> {
        self.inner.borrow().schedule.clone()
    }

    /// When the finalize step runs, relative to session start
    pub fn total_duration_seconds(&self) -> f64 {
        let inner = self.inner.borrow();
        if inner.schedule.is_empty() {
            return 0.0;
        }
        schedule_end_seconds(&inner.schedule) + inner.trailing_margin_seconds
    }

    /// Timers currently registered by this session
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Register a callback for every state change
    pub fn on_state_change(&self, observer: impl FnMut(SessionState) + 'static) {
        self.inner.borrow_mut().observers.push(Box::new(observer));
    }

    /// Begin playback
    ///
    /// A second call is a no-op. An empty schedule goes straight to
    /// `Terminal` with no synthesizer or cursor calls. When the synthesizer
    /// is not ready this returns [`PlaybackError::NotReady`] and the session
    /// stays `Created`, so the caller can retry later.
    pub fn start(&self) -> Result<(), PlaybackError> {
        let (id, schedule, margin, synth, cursor, host) = {
            let inner = self.inner.borrow();
            if inner.state != SessionState::Created {
                log::debug!("Session {}: start ignored in state {:?}", inner.id, inner.state);
                return Ok(());
            }
            (
                inner.id,
                inner.schedule.clone(),
                inner.trailing_margin_seconds,
                inner.synth.clone(),
                inner.cursor.clone(),
                inner.host.clone(),
            )
        };

        if schedule.is_empty() {
            log::info!("Session {}: nothing to play", id);
            self.transition(SessionState::Terminal);
            return Ok(());
        }

        let ready = synth.try_borrow().map(|s| s.is_ready()).unwrap_or(false);
        if !ready {
            log::warn!("Session {}: synthesizer not ready, playback not started", id);
            return Err(PlaybackError::NotReady);
        }

        // Arm the cursor: it becomes visible with the first note
        cursor_call(&cursor, "reset", |c| c.reset());
        cursor_call(&cursor, "hide", |c| c.hide());

        self.transition(SessionState::Running);
        if self.state() != SessionState::Running {
            // An observer cancelled us
            return Ok(());
        }

        let finalize_at = schedule_end_seconds(&schedule) + margin;
        let mut timers = Vec::with_capacity(schedule.len() * 2 + 1);

        for event in schedule {
            let at = event.start_time_seconds;

            let weak = Rc::downgrade(&self.inner);
            timers.push(host.schedule(at, Box::new(move || Self::fire_note(&weak, &event))));

            // Visual step: same instant, independent callback
            let weak = Rc::downgrade(&self.inner);
            timers.push(host.schedule(at, Box::new(move || Self::fire_visual_step(&weak))));
        }

        let weak = Rc::downgrade(&self.inner);
        timers.push(host.schedule(finalize_at, Box::new(move || Self::finalize(&weak))));

        log::info!(
            "Session {}: playing {} timers, finalize at {:.3}s",
            id,
            timers.len(),
            finalize_at
        );
        self.inner.borrow_mut().timers = timers;
        Ok(())
    }

    /// Stop immediately
    ///
    /// Withdraws every pending callback, resets and hides the cursor, and
    /// leaves the session `Cancelled`. No-op once the session has finished.
    pub fn cancel(&self) {
        let (id, timers, host, cursor) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, SessionState::Created | SessionState::Running) {
                return;
            }
            inner.state = SessionState::Cancelled;
            (
                inner.id,
                std::mem::take(&mut inner.timers),
                inner.host.clone(),
                inner.cursor.clone(),
            )
        };

        for timer in &timers {
            host.cancel(*timer);
        }
        cursor_call(&cursor, "reset", |c| c.reset());
        cursor_call(&cursor, "hide", |c| c.hide());

        log::info!("Session {}: cancelled ({} timers withdrawn)", id, timers.len());
        Self::notify(&self.inner, SessionState::Cancelled);
    }

    fn fire_note(weak: &Weak<RefCell<SessionInner>>, event: &ScheduledEvent) {
        let Some(inner) = weak.upgrade() else { return };
        let (id, synth) = {
            let inner = inner.borrow();
            if inner.state != SessionState::Running {
                return;
            }
            (inner.id, inner.synth.clone())
        };

        let result = match synth.try_borrow_mut() {
            Ok(mut synth) => synth.trigger_note(
                &event.pitch,
                event.duration_seconds,
                event.start_time_seconds,
            ),
            Err(_) => Err(CollaboratorError::from("synthesizer is busy")),
        };
        if let Err(e) = result {
            log::warn!(
                "Playback callback error: session {} note {} at {:.3}s: {}",
                id,
                event.pitch,
                event.start_time_seconds,
                e
            );
        }
    }

    fn fire_visual_step(weak: &Weak<RefCell<SessionInner>>) {
        let Some(inner) = weak.upgrade() else { return };
        let (first, cursor) = {
            let mut inner = inner.borrow_mut();
            if inner.state != SessionState::Running {
                return;
            }
            let first = !inner.cursor_shown;
            inner.cursor_shown = true;
            (first, inner.cursor.clone())
        };

        if first {
            cursor_call(&cursor, "show", |c| c.show());
        } else if !cursor_at_end(&cursor) {
            cursor_call(&cursor, "advance", |c| c.advance());
        }
    }

    fn finalize(weak: &Weak<RefCell<SessionInner>>) {
        let Some(inner) = weak.upgrade() else { return };
        if inner.borrow().state != SessionState::Running {
            return;
        }

        Self::set_state(&inner, SessionState::Finalizing);
        let (id, timers, host, cursor) = {
            let mut inner = inner.borrow_mut();
            (
                inner.id,
                std::mem::take(&mut inner.timers),
                inner.host.clone(),
                inner.cursor.clone(),
            )
        };

        // Everything else has fired by now; this only clears stragglers
        for timer in timers {
            host.cancel(timer);
        }
        cursor_call(&cursor, "reset", |c| c.reset());
        cursor_call(&cursor, "hide", |c| c.hide());

        log::info!("Session {}: finished", id);
        Self::set_state(&inner, SessionState::Terminal);
    }

    fn transition(&self, to: SessionState) {
        Self::set_state(&self.inner, to);
    }

    fn set_state(inner: &Rc<RefCell<SessionInner>>, to: SessionState) {
        inner.borrow_mut().state = to;
        Self::notify(inner, to);
    }

    fn notify(inner: &Rc<RefCell<SessionInner>>, state: SessionState) {
        {
            let mut guard = inner.borrow_mut();
            guard.notices.push_back(state);
            if guard.notifying {
                return;
            }
            guard.notifying = true;
        }

        // Observers run unborrowed so they may query or cancel the session
        loop {
            let (state, mut observers) = {
                let mut guard = inner.borrow_mut();
                let Some(state) = guard.notices.pop_front() else {
                    guard.notifying = false;
                    return;
                };
                (state, std::mem::take(&mut guard.observers))
            };
            for observer in observers.iter_mut() {
                observer(state);
            }
            let mut guard = inner.borrow_mut();
            observers.append(&mut guard.observers);
            guard.observers = observers;
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PlaybackSession")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("events", &inner.schedule.len())
            .field("timers", &inner.timers.len())
            .finish()
    }
}
