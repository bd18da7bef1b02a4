//! Score playback WASM API
//!
//! The JavaScript-facing surface of the crate.
//!
//! # Module Structure
//!
//! - `helpers`: Serialization, error conversion and console logging
//! - `timers`: `window.setTimeout` behind the playback `TimerHost` seam
//! - `player`: `ScorePlayer`, playback against a JS synthesizer and cursor
//! - `score`: Score parsing and note extraction

pub mod helpers;
pub mod player;
pub mod score;
pub mod timers;

pub use player::{JsCursor, JsSynthesizer, ScorePlayer};
pub use score::{
    ensure_safe_xml_js, extract_notes_js, parse_score_js, sample_file_for_js, JsNoteExtractor,
};
pub use timers::BrowserTimers;
