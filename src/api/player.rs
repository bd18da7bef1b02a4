//! WASM API for score playback
//!
//! `ScorePlayer` wraps a [`PlaybackSynchronizer`] around JavaScript objects:
//! a synthesizer (e.g. a sampler with a `ready` flag) and the score
//! renderer's cursor. Freeing the player cancels whatever is playing.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use super::helpers::{collaborator_error, deserialize, deserialize_or_default, to_js_error};
use super::timers::BrowserTimers;
use crate::converters::musicxml::musicxml_to_notes::parse_score;
use crate::error::CollaboratorError;
use crate::models::{NoteEvent, Tempo};
use crate::playback::{Cursor, PlaybackConfig, PlaybackSynchronizer, SessionState, Synthesizer};
use crate::{wasm_info, wasm_warn};

#[wasm_bindgen]
extern "C" {
    /// Any object with a `ready` flag and `triggerNote(pitch, durationSeconds, atTime)`
    pub type JsSynthesizer;

    #[wasm_bindgen(method, getter)]
    fn ready(this: &JsSynthesizer) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = triggerNote)]
    fn trigger_note(
        this: &JsSynthesizer,
        pitch: &str,
        duration_seconds: f64,
        at_time: f64,
    ) -> Result<(), JsValue>;

    /// Score cursor: `show`, `hide`, `reset`, `next`, `hasReachedEnd`
    pub type JsCursor;

    #[wasm_bindgen(method, catch)]
    fn show(this: &JsCursor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn hide(this: &JsCursor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn reset(this: &JsCursor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn next(this: &JsCursor) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = hasReachedEnd)]
    fn has_reached_end(this: &JsCursor) -> JsValue;
}

struct JsSynthAdapter(JsSynthesizer);

impl Synthesizer for JsSynthAdapter {
    fn is_ready(&self) -> bool {
        self.0.ready().as_bool().unwrap_or(false)
    }

    fn trigger_note(
        &mut self,
        pitch: &str,
        duration_seconds: f64,
        at_time: f64,
    ) -> Result<(), CollaboratorError> {
        self.0
            .trigger_note(pitch, duration_seconds, at_time)
            .map_err(collaborator_error)
    }
}

struct JsCursorAdapter(JsCursor);

impl Cursor for JsCursorAdapter {
    fn show(&mut self) -> Result<(), CollaboratorError> {
        self.0.show().map_err(collaborator_error)
    }

    fn hide(&mut self) -> Result<(), CollaboratorError> {
        self.0.hide().map_err(collaborator_error)
    }

    fn reset(&mut self) -> Result<(), CollaboratorError> {
        self.0.reset().map_err(collaborator_error)
    }

    fn advance(&mut self) -> Result<(), CollaboratorError> {
        self.0.next().map_err(collaborator_error)
    }

    fn has_reached_end(&self) -> bool {
        self.0.has_reached_end().as_bool().unwrap_or(false)
    }
}

/// Plays scores against a JS synthesizer and cursor
#[wasm_bindgen]
pub struct ScorePlayer {
    synchronizer: PlaybackSynchronizer,
    on_state_change: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl ScorePlayer {
    /// `config` is optional; missing fields take their defaults
    #[wasm_bindgen(constructor)]
    pub fn new(
        synth: JsSynthesizer,
        cursor: JsCursor,
        config: JsValue,
    ) -> Result<ScorePlayer, JsValue> {
        let config: PlaybackConfig = deserialize_or_default(config, "Invalid playback config")?;
        config.validate().map_err(to_js_error)?;

        let timers = BrowserTimers::new()?;
        let synchronizer = PlaybackSynchronizer::with_config(
            config,
            Rc::new(RefCell::new(JsSynthAdapter(synth))),
            Rc::new(RefCell::new(JsCursorAdapter(cursor))),
            Rc::new(timers),
        );

        wasm_info!("ScorePlayer created");
        Ok(ScorePlayer {
            synchronizer,
            on_state_change: None,
        })
    }

    /// Called with the numeric `SessionState` on every transition
    #[wasm_bindgen(js_name = onStateChange)]
    pub fn set_on_state_change(&mut self, callback: Option<js_sys::Function>) {
        self.on_state_change = callback;
    }

    /// Play `notes` (`[{pitch, startBeat, durationBeats}]`); `bpm` defaults
    /// to the configured tempo
    pub fn play(&mut self, notes: JsValue, bpm: Option<f64>) -> Result<(), JsValue> {
        let notes: Vec<NoteEvent> = deserialize(notes, "Invalid notes")?;
        let tempo = bpm
            .map(Tempo::new)
            .unwrap_or_else(|| self.synchronizer.config().default_tempo());
        self.start(&notes, tempo)
    }

    /// Parse MusicXML and play it at the score's own tempo
    #[wasm_bindgen(js_name = playScore)]
    pub fn play_score(&mut self, xml: &str) -> Result<(), JsValue> {
        let score = parse_score(xml).map_err(to_js_error)?;
        let tempo = score
            .tempo
            .map(Tempo::new)
            .unwrap_or_else(|| self.synchronizer.config().default_tempo());
        self.start(&score.notes, tempo)
    }

    /// Cancel playback and park the cursor
    pub fn stop(&mut self) {
        self.synchronizer.cancel_active();
    }

    #[wasm_bindgen(getter, js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.synchronizer.is_playing()
    }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.synchronizer.synthesizer_ready()
    }

    /// State of the most recent session, if any
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> Option<SessionState> {
        self.synchronizer.state()
    }

    fn start(&mut self, notes: &[NoteEvent], tempo: Tempo) -> Result<(), JsValue> {
        let session = self
            .synchronizer
            .schedule(notes, tempo)
            .map_err(to_js_error)?;

        if let Some(callback) = self.on_state_change.clone() {
            session.on_state_change(move |state| {
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from(state as u32)) {
                    wasm_warn!("onStateChange callback threw: {:?}", e);
                }
            });
        }

        session.start().map_err(to_js_error)
    }
}
