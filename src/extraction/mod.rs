//! Note extraction
//!
//! Two ways to get playable notes out of a score, kept apart on purpose:
//!
//! - **Fixed duration**: walk the renderer's measure → voice → tickable tree
//!   and give every sounding tickable the same length, laid end to end. Used
//!   when only the rendered score is at hand.
//! - **Parsed duration**: read the MusicXML itself and keep every note's real
//!   onset and length (see [`crate::converters::musicxml::musicxml_to_notes`]).
//!
//! [`NoteExtractor`] runs either one and tells its listeners when notes are
//! ready, which is what the UI uses to enable its play control.

use serde::{Deserialize, Serialize};

use crate::converters::musicxml::musicxml_to_notes::parse_score;
use crate::error::{PlaybackError, ScoreError};
use crate::models::pitch::midi_to_pitch_name;
use crate::models::{NoteEvent, Tempo};
use crate::playback::defaults::HALF_TONE_MIDI_OFFSET;
use crate::playback::PlaybackConfig;

/// One measure as laid out by the score renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMeasure {
    #[serde(default)]
    pub voices: Vec<RenderedVoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedVoice {
    #[serde(default)]
    pub tickables: Vec<RenderedTickable>,
}

/// A note or rest glyph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTickable {
    #[serde(default)]
    pub is_rest: bool,
    /// Renderer half-tone index; MIDI number is this + 12
    #[serde(default)]
    pub half_tone: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionStrategy {
    FixedDuration,
    ParsedDuration,
}

/// Result of one extraction run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedScore {
    pub notes: Vec<NoteEvent>,
    pub tempo: Tempo,
    pub strategy: ExtractionStrategy,
}

/// Fixed-duration extraction over the rendered structure
///
/// Rests are skipped and only the first `config.max_measures` measures are
/// read. Each note lasts `config.fixed_note_duration_beats` and starts where
/// the previous one ended.
pub fn extract_fixed_duration(
    measures: &[RenderedMeasure],
    config: &PlaybackConfig,
) -> Vec<NoteEvent> {
    if measures.len() > config.max_measures {
        log::warn!(
            "Score has {} measures; extracting only the first {}",
            measures.len(),
            config.max_measures
        );
    }

    let duration = config.fixed_note_duration_beats;
    let mut notes = Vec::new();

    let tickables = measures
        .iter()
        .take(config.max_measures)
        .flat_map(|measure| &measure.voices)
        .flat_map(|voice| &voice.tickables)
        .filter(|tickable| !tickable.is_rest);

    for tickable in tickables {
        let Some(midi) = tickable.half_tone.unwrap_or(0).checked_add(HALF_TONE_MIDI_OFFSET) else {
            log::warn!("Skipping tickable with half tone {:?}", tickable.half_tone);
            continue;
        };
        let start = notes.len() as f64 * duration;
        match NoteEvent::new(midi_to_pitch_name(midi), start, duration) {
            Ok(note) => notes.push(note),
            Err(e) => log::warn!("Skipping tickable: {}", e),
        }
    }

    notes
}

/// [`extract_fixed_duration`] behind a config check, for configs that come
/// from outside the crate
pub fn try_extract_fixed_duration(
    measures: &[RenderedMeasure],
    config: &PlaybackConfig,
) -> Result<Vec<NoteEvent>, PlaybackError> {
    config.validate()?;
    Ok(extract_fixed_duration(measures, config))
}

pub type NotesExtractedListener = Box<dyn FnMut(&ExtractedScore)>;

/// Runs extraction and announces the result
pub struct NoteExtractor {
    config: PlaybackConfig,
    latest: Option<ExtractedScore>,
    listeners: Vec<NotesExtractedListener>,
}

impl NoteExtractor {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            latest: None,
            listeners: Vec::new(),
        }
    }

    /// Called once per completed extraction
    pub fn on_notes_extracted(&mut self, listener: impl FnMut(&ExtractedScore) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Fixed-duration extraction from the rendered score, at the default tempo
    pub fn extract_rendered(&mut self, measures: &[RenderedMeasure]) -> &ExtractedScore {
        let notes = extract_fixed_duration(measures, &self.config);
        self.publish(ExtractedScore {
            notes,
            tempo: self.config.default_tempo(),
            strategy: ExtractionStrategy::FixedDuration,
        })
    }

    /// Parsed-duration extraction straight from MusicXML text
    ///
    /// A failed parse leaves the previous result in place and notifies no one.
    pub fn extract_musicxml(&mut self, xml: &str) -> Result<&ExtractedScore, ScoreError> {
        let parsed = parse_score(xml)?;
        let tempo = parsed
            .tempo
            .map(Tempo::new)
            .unwrap_or_else(|| self.config.default_tempo());
        Ok(self.publish(ExtractedScore {
            notes: parsed.notes,
            tempo,
            strategy: ExtractionStrategy::ParsedDuration,
        }))
    }

    pub fn latest(&self) -> Option<&ExtractedScore> {
        self.latest.as_ref()
    }

    /// Whether the last extraction produced anything to play
    pub fn has_notes(&self) -> bool {
        self.latest.as_ref().map_or(false, |s| !s.notes.is_empty())
    }

    fn publish(&mut self, extracted: ExtractedScore) -> &ExtractedScore {
        log::info!(
            "Extracted {} notes ({:?})",
            extracted.notes.len(),
            extracted.strategy
        );
        for listener in self.listeners.iter_mut() {
            listener(&extracted);
        }
        self.latest.insert(extracted)
    }
}

impl Default for NoteExtractor {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}
