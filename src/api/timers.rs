//! `window.setTimeout` as a [`TimerHost`]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::playback::{TimerCallback, TimerHost, TimerId};

struct TimerSlot {
    handle: i32,
    // Keeps the JS function alive until the timeout fires or is cleared
    _closure: Closure<dyn FnMut()>,
}

#[derive(Default)]
struct TimerState {
    next_id: u64,
    slots: HashMap<TimerId, TimerSlot>,
    // Fired timers whose closures can be dropped once nothing is running
    fired: Vec<TimerId>,
    running: Option<TimerId>,
}

/// Browser timer host
///
/// A closure must not be dropped while it is executing, so slots for fired
/// timers are released lazily on the next `schedule`, and cancelling the
/// timer that is currently running only clears its timeout.
pub struct BrowserTimers {
    window: web_sys::Window,
    state: Rc<RefCell<TimerState>>,
}

impl BrowserTimers {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No global window"))?;
        Ok(Self {
            window,
            state: Rc::new(RefCell::new(TimerState::default())),
        })
    }

    fn release_fired(&self) {
        let mut state = self.state.borrow_mut();
        let fired = std::mem::take(&mut state.fired);
        for id in fired {
            state.slots.remove(&id);
        }
    }

    fn on_fire(state: &Weak<RefCell<TimerState>>, id: TimerId, callback: &mut Option<TimerCallback>) {
        if let Some(state) = state.upgrade() {
            state.borrow_mut().running = Some(id);
        }
        if let Some(callback) = callback.take() {
            callback();
        }
        if let Some(state) = state.upgrade() {
            let mut state = state.borrow_mut();
            state.running = None;
            state.fired.push(id);
        }
    }
}

impl TimerHost for BrowserTimers {
    fn schedule(&self, delay_seconds: f64, callback: TimerCallback) -> TimerId {
        self.release_fired();

        let id = {
            let mut state = self.state.borrow_mut();
            let id = TimerId(state.next_id);
            state.next_id += 1;
            id
        };

        let weak = Rc::downgrade(&self.state);
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move || {
            BrowserTimers::on_fire(&weak, id, &mut callback);
        }) as Box<dyn FnMut()>);

        let delay_ms = (delay_seconds.max(0.0) * 1000.0).round() as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay_ms,
            ) {
            Ok(handle) => {
                self.state.borrow_mut().slots.insert(
                    id,
                    TimerSlot {
                        handle,
                        _closure: closure,
                    },
                );
            }
            Err(e) => {
                crate::wasm_error!("setTimeout failed for timer {:?}: {:?}", id, e);
            }
        }
        id
    }

    fn cancel(&self, id: TimerId) {
        let mut state = self.state.borrow_mut();
        if state.running == Some(id) {
            if let Some(slot) = state.slots.get(&id) {
                self.window.clear_timeout_with_handle(slot.handle);
            }
            return;
        }
        if let Some(slot) = state.slots.remove(&id) {
            self.window.clear_timeout_with_handle(slot.handle);
        }
    }
}

impl Drop for BrowserTimers {
    fn drop(&mut self) {
        let state = self.state.borrow();
        for slot in state.slots.values() {
            self.window.clear_timeout_with_handle(slot.handle);
        }
    }
}
