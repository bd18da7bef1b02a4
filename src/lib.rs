//! Score Playback WASM Module
//!
//! Plays a musical score through an external synthesizer while moving the
//! score renderer's cursor in step with the sound.
//!
//! - [`models`]: note events, tempo and pitch names
//! - [`converters`]: MusicXML → note events
//! - [`extraction`]: notes from the rendered score or from MusicXML
//! - [`playback`]: scheduling and the cancellable playback session
//! - [`api`]: the JavaScript bindings

pub mod api;
pub mod converters;
pub mod error;
pub mod extraction;
pub mod models;
pub mod playback;

// Re-export commonly used types
pub use error::{CollaboratorError, PlaybackError, ScoreError};
pub use models::{NoteEvent, ScheduledEvent, Tempo};
pub use playback::{
    Cursor, ManualClock, PlaybackConfig, PlaybackSession, PlaybackSynchronizer, SessionState,
    Synthesizer, TimerHost,
};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    init_logging();

    log::info!("Score playback WASM module initialized");
}

#[cfg(feature = "console_log")]
fn init_logging() {
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        wasm_warn!("Logger already initialized: {}", e);
    }
}

#[cfg(not(feature = "console_log"))]
fn init_logging() {}
