//! Delayed-callback scheduling
//!
//! Sessions never touch a global timer API. They register callbacks on an
//! injected [`TimerHost`] and keep the returned ids so they can cancel them
//! all at once. In the browser the host wraps `window.setTimeout`; tests and
//! offline rendering use [`ManualClock`], a virtual clock advanced by hand.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle for one scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

pub type TimerCallback = Box<dyn FnOnce()>;

pub trait TimerHost {
    /// Run `callback` once, `delay_seconds` from now
    fn schedule(&self, delay_seconds: f64, callback: TimerCallback) -> TimerId;

    /// Drop a pending callback. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

struct PendingTimer {
    id: TimerId,
    due: f64,
    callback: TimerCallback,
}

#[derive(Default)]
struct ClockState {
    now: f64,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

/// Virtual clock: callbacks fire only when the clock is advanced
///
/// Callbacks fire in due-time order; callbacks due at the same instant fire
/// in the order they were scheduled. A callback may schedule or cancel other
/// timers while it runs.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Rc<RefCell<ClockState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in seconds
    pub fn now(&self) -> f64 {
        self.state.borrow().now
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Move time forward by `seconds`, firing everything that comes due.
    /// Returns the number of callbacks fired.
    pub fn advance(&self, seconds: f64) -> usize {
        let target = self.now() + seconds.max(0.0);
        self.advance_to(target)
    }

    /// Move time forward to `target`, firing everything due at or before it
    pub fn advance_to(&self, target: f64) -> usize {
        let mut fired = 0;

        while let Some(callback) = self.pop_due(target) {
            // Borrow released: the callback may reschedule or cancel
            callback();
            fired += 1;
        }

        let mut state = self.state.borrow_mut();
        if target > state.now {
            state.now = target;
        }
        fired
    }

    /// Fire callbacks until none are pending
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        loop {
            let next_due = self
                .state
                .borrow()
                .pending
                .iter()
                .map(|timer| timer.due)
                .fold(None, |min: Option<f64>, due| Some(min.map_or(due, |m| m.min(due))));

            match next_due {
                Some(due) => fired += self.advance_to(due),
                None => return fired,
            }
        }
    }

    fn pop_due(&self, target: f64) -> Option<TimerCallback> {
        let mut state = self.state.borrow_mut();

        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(index, _)| index)?;

        let timer = state.pending.remove(index);
        if timer.due > state.now {
            state.now = timer.due;
        }
        Some(timer.callback)
    }
}

impl TimerHost for ManualClock {
    fn schedule(&self, delay_seconds: f64, callback: TimerCallback) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let due = state.now + delay_seconds.max(0.0);
        state.pending.push(PendingTimer { id, due, callback });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.state.borrow_mut().pending.retain(|timer| timer.id != id);
    }
}
