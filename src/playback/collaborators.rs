//! The external systems playback drives
//!
//! Both are injected into the synchronizer at construction. Calls return a
//! `Result` so a failing note or cursor step can be logged and skipped
//! without stopping the rest of the schedule.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::CollaboratorError;

/// Sample-based synthesizer
pub trait Synthesizer {
    /// Whether the voices are loaded; playback refuses to start otherwise
    fn is_ready(&self) -> bool;

    /// Sound `pitch` for `duration_seconds`, targeted at `at_time` on the
    /// session timeline
    fn trigger_note(
        &mut self,
        pitch: &str,
        duration_seconds: f64,
        at_time: f64,
    ) -> Result<(), CollaboratorError>;
}

/// Visual pointer over the rendered score
pub trait Cursor {
    fn show(&mut self) -> Result<(), CollaboratorError>;
    fn hide(&mut self) -> Result<(), CollaboratorError>;
    fn reset(&mut self) -> Result<(), CollaboratorError>;
    /// Move to the next note
    fn advance(&mut self) -> Result<(), CollaboratorError>;
    fn has_reached_end(&self) -> bool;
}

pub type SharedSynthesizer = Rc<RefCell<dyn Synthesizer>>;
pub type SharedCursor = Rc<RefCell<dyn Cursor>>;

/// Run one cursor call, logging instead of propagating failure
pub(crate) fn cursor_call(
    cursor: &SharedCursor,
    action: &str,
    call: impl FnOnce(&mut dyn Cursor) -> Result<(), CollaboratorError>,
) {
    let result = match cursor.try_borrow_mut() {
        Ok(mut cursor) => call(&mut *cursor),
        Err(_) => Err(CollaboratorError::from("cursor is busy")),
    };
    if let Err(e) = result {
        log::warn!("Playback callback error: cursor {} failed: {}", action, e);
    }
}

/// Whether the cursor has run out of notes; a busy cursor counts as not at the end
pub(crate) fn cursor_at_end(cursor: &SharedCursor) -> bool {
    cursor
        .try_borrow()
        .map(|cursor| cursor.has_reached_end())
        .unwrap_or(false)
}
