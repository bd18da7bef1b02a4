//! WASM API for reading notes out of scores

use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, deserialize_or_default, serialize, to_js_error};
use crate::converters::musicxml::musicxml_to_notes::{ensure_safe_xml, parse_score};
use crate::extraction::{try_extract_fixed_duration, NoteExtractor, RenderedMeasure};
use crate::models::pitch::sample_file_for;
use crate::playback::PlaybackConfig;
use crate::{wasm_log, wasm_warn};

/// Parse MusicXML into `{ notes, tempo }` (tempo is `undefined` when absent)
#[wasm_bindgen(js_name = parseScore)]
pub fn parse_score_js(xml: &str) -> Result<JsValue, JsValue> {
    let score = parse_score(xml).map_err(to_js_error)?;
    wasm_log!("parseScore: {} notes, tempo {:?}", score.notes.len(), score.tempo);
    serialize(&score, "Serialization error")
}

/// Throws when the document declares XML entities
#[wasm_bindgen(js_name = ensureSafeXml)]
pub fn ensure_safe_xml_js(xml: &str) -> Result<(), JsValue> {
    ensure_safe_xml(xml).map_err(to_js_error)
}

/// Fixed-duration notes from the renderer's measure/voice/tickable tree
#[wasm_bindgen(js_name = extractNotes)]
pub fn extract_notes_js(measures: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let measures: Vec<RenderedMeasure> = deserialize(measures, "Invalid measures")?;
    let config: PlaybackConfig = deserialize_or_default(config, "Invalid playback config")?;
    let notes = try_extract_fixed_duration(&measures, &config).map_err(to_js_error)?;
    serialize(&notes, "Serialization error")
}

/// Sample file name for a pitch ("A#3" → "As3.mp3"), or `undefined` if out of range
#[wasm_bindgen(js_name = sampleFileFor)]
pub fn sample_file_for_js(pitch: &str) -> Option<String> {
    sample_file_for(pitch)
}

/// Note extraction with a `notesExtracted` hook for the UI
#[wasm_bindgen(js_name = NoteExtractor)]
pub struct JsNoteExtractor {
    extractor: NoteExtractor,
}

#[wasm_bindgen(js_class = NoteExtractor)]
impl JsNoteExtractor {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsNoteExtractor, JsValue> {
        let config: PlaybackConfig = deserialize_or_default(config, "Invalid playback config")?;
        config.validate().map_err(to_js_error)?;
        Ok(JsNoteExtractor {
            extractor: NoteExtractor::new(config),
        })
    }

    /// Register `callback({ notes, tempo, strategy })`, run after each extraction
    #[wasm_bindgen(js_name = onNotesExtracted)]
    pub fn on_notes_extracted(&mut self, callback: js_sys::Function) {
        self.extractor.on_notes_extracted(move |extracted| {
            let payload = match serde_wasm_bindgen::to_value(extracted) {
                Ok(payload) => payload,
                Err(e) => {
                    wasm_warn!("notesExtracted payload failed to serialize: {}", e);
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                wasm_warn!("notesExtracted callback threw: {:?}", e);
            }
        });
    }

    #[wasm_bindgen(js_name = extractRendered)]
    pub fn extract_rendered(&mut self, measures: JsValue) -> Result<JsValue, JsValue> {
        let measures: Vec<RenderedMeasure> = deserialize(measures, "Invalid measures")?;
        let extracted = self.extractor.extract_rendered(&measures);
        serialize(extracted, "Serialization error")
    }

    #[wasm_bindgen(js_name = extractMusicXml)]
    pub fn extract_musicxml(&mut self, xml: &str) -> Result<JsValue, JsValue> {
        let extracted = self.extractor.extract_musicxml(xml).map_err(to_js_error)?;
        serialize(extracted, "Serialization error")
    }

    #[wasm_bindgen(getter, js_name = hasNotes)]
    pub fn has_notes(&self) -> bool {
        self.extractor.has_notes()
    }
}
